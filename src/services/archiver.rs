//! Archiver subprocess supervision.
//!
//! The archiver is an external browser-driven scraper that writes one
//! directory per post. Only its exit status and the session-loss marker on
//! stderr are interpreted here.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::models::{ArchiverConfig, AuthConfig};

/// Stderr text python prints when the archiver module is missing.
const MISSING_MODULE_MARKER: &str = "No module named";

/// How an archiver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Completed,
    /// Non-zero exit for a reason other than session loss
    Failed { code: Option<i32>, stderr: String },
    /// Still running when the timeout expired; the process was killed
    TimedOut,
    /// The archiver program or module is not installed
    NotInstalled,
    /// Browser session kept dying, retries exhausted
    SessionLost { attempts: u32 },
}

impl ArchiveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ArchiveOutcome::Completed)
    }
}

/// Runs the archiver against one target URL.
#[async_trait]
pub trait PostArchiver: Send + Sync {
    async fn archive(&self, url: &str, max_posts: Option<usize>) -> ArchiveOutcome;
}

/// Result of a single process launch.
enum Attempt {
    Success,
    Failed { code: Option<i32>, stderr: String },
    TimedOut,
    NotInstalled,
}

/// Launches the archiver as a child process.
pub struct ArchiverRunner {
    config: ArchiverConfig,
    auth: AuthConfig,
    output_dir: PathBuf,
}

impl ArchiverRunner {
    pub fn new(config: ArchiverConfig, auth: AuthConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            auth,
            output_dir: output_dir.into(),
        }
    }

    /// Arguments passed after the program name.
    pub fn build_args(&self, url: &str, max_posts: Option<usize>) -> Vec<String> {
        let mut args = self.config.base_args.clone();
        args.push(url.to_string());
        args.push("-o".into());
        args.push(self.output_dir.display().to_string());
        args.push("-d".into());
        args.push(self.config.driver.as_str().into());

        if let Some(max) = max_posts {
            args.push("-m".into());
            args.push(max.to_string());
        }

        if let Some(profile) = &self.auth.browser_profile {
            args.push("-p".into());
            args.push(profile.display().to_string());
            if let Some(name) = &self.auth.profile_name {
                args.push("-n".into());
                args.push(name.clone());
            }
        } else if let Some(cookies) = &self.auth.cookies_file {
            args.push("-c".into());
            args.push(cookies.display().to_string());
        }

        if !self.config.headless {
            args.push("--not-headless".into());
        }
        args
    }

    fn is_session_lost(&self, stderr: &str) -> bool {
        let marker = self.config.session_lost_marker.as_str();
        !marker.is_empty() && stderr.contains(marker)
    }

    async fn run_once(&self, args: &[String]) -> Attempt {
        let child = Command::new(&self.config.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => return Attempt::NotInstalled,
            Err(e) => {
                return Attempt::Failed {
                    code: None,
                    stderr: e.to_string(),
                };
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        // Dropping the child on timeout kills it
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => Attempt::TimedOut,
            Ok(Err(e)) => Attempt::Failed {
                code: None,
                stderr: e.to_string(),
            },
            Ok(Ok(output)) if output.status.success() => Attempt::Success,
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                if stderr.contains(MISSING_MODULE_MARKER) {
                    Attempt::NotInstalled
                } else {
                    Attempt::Failed {
                        code: output.status.code(),
                        stderr,
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PostArchiver for ArchiverRunner {
    async fn archive(&self, url: &str, max_posts: Option<usize>) -> ArchiveOutcome {
        let args = self.build_args(url, max_posts);
        let attempts = self.config.max_retries.saturating_add(1);
        log::info!("Running archiver for {}", url);
        log::debug!("{} {}", self.config.program, args.join(" "));

        for attempt in 1..=attempts {
            match self.run_once(&args).await {
                Attempt::Success => {
                    log::info!("Archiver finished for {}", url);
                    return ArchiveOutcome::Completed;
                }
                Attempt::Failed { stderr, .. } if self.is_session_lost(&stderr) => {
                    if attempt < attempts {
                        log::warn!(
                            "Browser session lost (attempt {}/{}), retrying in {}s",
                            attempt,
                            attempts,
                            self.config.retry_cooldown_secs
                        );
                        tokio::time::sleep(Duration::from_secs(self.config.retry_cooldown_secs))
                            .await;
                        continue;
                    }
                    log::error!("Browser session lost after {} attempts", attempt);
                    return ArchiveOutcome::SessionLost { attempts: attempt };
                }
                Attempt::Failed { code, stderr } => {
                    log::warn!("Archiver exited with {:?}: {}", code, stderr.trim());
                    return ArchiveOutcome::Failed { code, stderr };
                }
                Attempt::TimedOut => {
                    log::warn!(
                        "Archiver timed out after {}s for {}",
                        self.config.timeout_secs,
                        url
                    );
                    return ArchiveOutcome::TimedOut;
                }
                Attempt::NotInstalled => {
                    log::error!(
                        "Archiver not installed (program '{}'). Install yt-community-post-archiver",
                        self.config.program
                    );
                    return ArchiveOutcome::NotInstalled;
                }
            }
        }

        ArchiveOutcome::SessionLost { attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Driver;
    use tempfile::TempDir;

    fn runner(config: ArchiverConfig, auth: AuthConfig) -> ArchiverRunner {
        ArchiverRunner::new(config, auth, "/tmp/out")
    }

    #[test]
    fn test_build_args_minimal() {
        let r = runner(ArchiverConfig::default(), AuthConfig::default());
        let args = r.build_args("https://www.youtube.com/@x/posts", None);
        assert_eq!(
            args,
            vec![
                "-m",
                "yt_community_post_archiver",
                "https://www.youtube.com/@x/posts",
                "-o",
                "/tmp/out",
                "-d",
                "chrome",
            ]
        );
    }

    #[test]
    fn test_build_args_profile_wins_over_cookies() {
        let config = ArchiverConfig {
            base_args: Vec::new(),
            driver: Driver::Firefox,
            headless: false,
            ..ArchiverConfig::default()
        };
        let auth = AuthConfig {
            browser_profile: Some("/home/u/.mozilla/p".into()),
            profile_name: Some("default".into()),
            cookies_file: Some("cookies.txt".into()),
        };
        let args = runner(config, auth).build_args("u", Some(25));
        assert_eq!(
            args,
            vec![
                "u",
                "-o",
                "/tmp/out",
                "-d",
                "firefox",
                "-m",
                "25",
                "-p",
                "/home/u/.mozilla/p",
                "-n",
                "default",
                "--not-headless",
            ]
        );
    }

    #[test]
    fn test_build_args_cookies() {
        let auth = AuthConfig {
            cookies_file: Some("cookies.txt".into()),
            ..AuthConfig::default()
        };
        let args = runner(ArchiverConfig::default(), auth).build_args("u", None);
        assert!(args.ends_with(&["-c".to_string(), "cookies.txt".to_string()]));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_installed() {
        let config = ArchiverConfig {
            program: "definitely-not-an-archiver-binary".into(),
            ..ArchiverConfig::default()
        };
        let outcome = runner(config, AuthConfig::default()).archive("u", None).await;
        assert_eq!(outcome, ArchiveOutcome::NotInstalled);
    }

    #[cfg(unix)]
    fn shell(script: &str) -> ArchiverConfig {
        ArchiverConfig {
            program: "sh".into(),
            base_args: vec!["-c".into(), script.into(), "archiver".into()],
            retry_cooldown_secs: 0,
            ..ArchiverConfig::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_loss_retried_until_success() {
        let temp = TempDir::new().unwrap();
        let counter = temp.path().join("count");
        // Fails with the marker on the first run, succeeds on the second
        let script = format!(
            "if [ -f {c} ]; then exit 0; fi; touch {c}; echo 'InvalidSessionIdException' >&2; exit 1",
            c = counter.display()
        );
        let outcome = runner(shell(&script), AuthConfig::default())
            .archive("u", None)
            .await;
        assert_eq!(outcome, ArchiveOutcome::Completed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_loss_gives_up() {
        let mut config = shell("echo 'InvalidSessionIdException' >&2; exit 1");
        config.max_retries = 1;
        let outcome = runner(config, AuthConfig::default()).archive("u", None).await;
        assert_eq!(outcome, ArchiveOutcome::SessionLost { attempts: 2 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_plain_failure_not_retried() {
        let outcome = runner(shell("echo boom >&2; exit 3"), AuthConfig::default())
            .archive("u", None)
            .await;
        match outcome {
            ArchiveOutcome::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut config = shell("sleep 5");
        config.timeout_secs = 1;
        let outcome = runner(config, AuthConfig::default()).archive("u", None).await;
        assert_eq!(outcome, ArchiveOutcome::TimedOut);
    }
}
