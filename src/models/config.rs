//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive layout on disk
    #[serde(default)]
    pub paths: PathsConfig,

    /// Archiver subprocess settings
    #[serde(default)]
    pub archiver: ArchiverConfig,

    /// HTTP settings for channel metadata and page fetches
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Login context handed to the archiver
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.output_dir is empty"));
        }
        if self.paths.record_file.trim().is_empty() {
            return Err(AppError::validation("paths.record_file is empty"));
        }
        if self.archiver.program.trim().is_empty() {
            return Err(AppError::validation("archiver.program is empty"));
        }
        if self.archiver.timeout_secs == 0 {
            return Err(AppError::validation("archiver.timeout_secs must be > 0"));
        }
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Archive layout. All file names are relative to `output_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the archive
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Name of the per-post record file
    #[serde(default = "defaults::record_file")]
    pub record_file: String,

    /// Persisted order table
    #[serde(default = "defaults::order_file")]
    pub order_file: String,

    /// Saved channel metadata
    #[serde(default = "defaults::channel_file")]
    pub channel_file: String,

    /// Directory the viewer export is written to
    #[serde(default = "defaults::viewer_dir")]
    pub viewer_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            record_file: defaults::record_file(),
            order_file: defaults::order_file(),
            channel_file: defaults::channel_file(),
            viewer_dir: defaults::viewer_dir(),
        }
    }
}

/// Browser driver used by the archiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Chrome,
    Firefox,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Chrome => "chrome",
            Driver::Firefox => "firefox",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Driver {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Ok(Driver::Chrome),
            "firefox" => Ok(Driver::Firefox),
            other => Err(AppError::validation(format!(
                "unknown driver '{other}' (expected chrome or firefox)"
            ))),
        }
    }
}

/// Archiver subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Executable to launch
    #[serde(default = "defaults::program")]
    pub program: String,

    /// Arguments placed before the target URL
    #[serde(default = "defaults::base_args")]
    pub base_args: Vec<String>,

    #[serde(default)]
    pub driver: Driver,

    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Wall-clock limit for a single archiver run
    #[serde(default = "defaults::archiver_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a lost browser session
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Pause between retries
    #[serde(default = "defaults::retry_cooldown")]
    pub retry_cooldown_secs: u64,

    /// Stderr marker identifying a recoverable session loss
    #[serde(default = "defaults::session_lost_marker")]
    pub session_lost_marker: String,

    /// Pause after a fresh-order prefetch so its browser can exit
    #[serde(default = "defaults::settle_delay")]
    pub settle_delay_ms: u64,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            program: defaults::program(),
            base_args: defaults::base_args(),
            driver: Driver::default(),
            headless: defaults::headless(),
            timeout_secs: defaults::archiver_timeout(),
            max_retries: defaults::max_retries(),
            retry_cooldown_secs: defaults::retry_cooldown(),
            session_lost_marker: defaults::session_lost_marker(),
            settle_delay_ms: defaults::settle_delay(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::fetch_timeout(),
        }
    }
}

/// Login context for member-only posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Browser profile directory
    #[serde(default)]
    pub browser_profile: Option<PathBuf>,

    /// Profile name inside the profile directory
    #[serde(default)]
    pub profile_name: Option<String>,

    /// Netscape-format cookies file
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
}

impl AuthConfig {
    /// Whether any login context is configured.
    pub fn is_authenticated(&self) -> bool {
        self.browser_profile.is_some() || self.cookies_file.is_some()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Path defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("archive-output")
    }
    pub fn record_file() -> String {
        "post.json".into()
    }
    pub fn order_file() -> String {
        "post_order.json".into()
    }
    pub fn channel_file() -> String {
        "channel_info.json".into()
    }
    pub fn viewer_dir() -> String {
        "viewer".into()
    }

    // Archiver defaults
    pub fn program() -> String {
        "python3".into()
    }
    pub fn base_args() -> Vec<String> {
        vec!["-m".into(), "yt_community_post_archiver".into()]
    }
    pub fn headless() -> bool {
        true
    }
    pub fn archiver_timeout() -> u64 {
        3600
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_cooldown() -> u64 {
        5
    }
    pub fn session_lost_marker() -> String {
        "InvalidSessionIdException".into()
    }
    pub fn settle_delay() -> u64 {
        2000
    }

    // Fetcher defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn fetch_timeout() -> u64 {
        30
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_program() {
        let mut config = Config::default();
        config.archiver.program = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.archiver.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            output_dir = "my-archive"

            [archiver]
            driver = "firefox"
            max_retries = 4

            [auth]
            cookies_file = "cookies.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.output_dir, PathBuf::from("my-archive"));
        assert_eq!(config.paths.order_file, "post_order.json");
        assert_eq!(config.archiver.driver, Driver::Firefox);
        assert_eq!(config.archiver.max_retries, 4);
        assert_eq!(config.archiver.timeout_secs, 3600);
        assert!(config.auth.is_authenticated());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(Config::load("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn driver_from_str() {
        assert_eq!("Chrome".parse::<Driver>().unwrap(), Driver::Chrome);
        assert_eq!("firefox".parse::<Driver>().unwrap(), Driver::Firefox);
        assert!("safari".parse::<Driver>().is_err());
    }
}
