//! Community post archiver CLI
//!
//! Local execution entry point.

use std::ops::Bound;
use std::path::PathBuf;

use chrono::{NaiveDate, TimeDelta};
use clap::{Args, Parser, Subcommand};
use community_archiver::{
    error::Result,
    models::{Config, Driver, Post},
    pipeline::{self, ArchiveRequest, Collaborators, query},
    services::{
        ArchiverRunner, ChannelFetcher, FileOrderSource, JsonViewerExporter, NoOrderSource,
        OrderSource, PageOrderSource,
    },
    storage::{LocalStorage, PostStore},
    utils::{cookies, http},
};

/// Archive a channel's community posts and keep them in order across runs
#[derive(Parser, Debug)]
#[command(name = "community-archiver", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "archive.toml")]
    config: PathBuf,

    /// Archive directory (overrides paths.output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a channel, reconcile the archive and export viewer data
    Archive(ArchiveArgs),

    /// Re-export viewer data from an existing archive without scraping
    Generate,

    /// Rebuild the order table from the archive on disk
    Reorder {
        /// File of post ids or URLs, newest first
        #[arg(long)]
        order_file: Option<PathBuf>,
    },

    /// Query the archive and print statistics
    Stats(StatsArgs),

    /// Validate configuration
    Validate,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    /// Channel URL (any tab)
    url: String,

    /// Maximum number of posts to archive
    #[arg(short, long)]
    max_posts: Option<usize>,

    /// Browser profile directory for member-only posts
    #[arg(short = 'p', long)]
    profile: Option<PathBuf>,

    /// Profile name inside the profile directory
    #[arg(short = 'n', long)]
    profile_name: Option<String>,

    /// Netscape-format cookies file
    #[arg(short, long)]
    cookies: Option<PathBuf>,

    /// Browser driver (chrome or firefox)
    #[arg(short, long)]
    driver: Option<Driver>,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Skip the membership tab
    #[arg(long)]
    no_members: bool,

    /// Do not fetch channel metadata
    #[arg(long)]
    skip_channel_info: bool,

    /// Read the current post order from a file instead of the posts page
    #[arg(long)]
    order_file: Option<PathBuf>,

    /// Do not prefetch the current post order
    #[arg(long, conflicts_with = "order_file")]
    no_order_prefetch: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,

    /// Only member-only posts
    #[arg(long, conflicts_with = "public_only")]
    members_only: bool,

    /// Only public posts
    #[arg(long)]
    public_only: bool,

    /// Only posts with a poll
    #[arg(long)]
    with_polls: bool,

    /// Only posts with images
    #[arg(long)]
    with_images: bool,

    /// Earliest estimated date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Latest estimated date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    until: Option<NaiveDate>,
}

/// Initialize logging. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load the configuration file, falling back to defaults.
fn load_config(cli: &Cli) -> Config {
    let loaded = Config::load(&cli.config);

    let level = if cli.verbose {
        "debug"
    } else {
        loaded
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
    };
    init_logging(level);

    let mut config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) if cli.config.exists() => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
        Err(_) => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.paths.output_dir = output.clone();
    }
    config
}

fn apply_archive_overrides(config: &mut Config, args: &ArchiveArgs) {
    if let Some(driver) = args.driver {
        config.archiver.driver = driver;
    }
    if args.no_headless {
        config.archiver.headless = false;
    }
    if args.profile.is_some() {
        config.auth.browser_profile = args.profile.clone();
    }
    if args.profile_name.is_some() {
        config.auth.profile_name = args.profile_name.clone();
    }
    if args.cookies.is_some() {
        config.auth.cookies_file = args.cookies.clone();
    }
}

/// Login cookies for the order prefetch, when a cookie file is configured.
async fn page_cookies(config: &Config) -> Option<reqwest::header::HeaderValue> {
    let path = config.auth.cookies_file.as_ref()?;
    match cookies::load_cookie_header(path, cookies::COOKIE_DOMAIN).await {
        Ok(Some(header)) => Some(header),
        Ok(None) => {
            log::warn!(
                "No {} cookies in {}, member-only posts will be missing from the fresh order",
                cookies::COOKIE_DOMAIN,
                path.display()
            );
            None
        }
        Err(e) => {
            log::warn!("Could not read cookies from {}: {}", path.display(), e);
            None
        }
    }
}

async fn archive(config: &Config, store: &LocalStorage, args: &ArchiveArgs) -> Result<()> {
    let output_dir = &config.paths.output_dir;
    let client = http::create_client(&config.fetcher)?;

    let archiver = ArchiverRunner::new(config.archiver.clone(), config.auth.clone(), output_dir);
    let channel_source = ChannelFetcher::new(client.clone(), output_dir);
    let renderer = JsonViewerExporter::new(output_dir, &config.paths.viewer_dir);
    let order_source: Box<dyn OrderSource> = match (&args.order_file, args.no_order_prefetch) {
        (Some(path), _) => Box::new(FileOrderSource::new(path)),
        (None, true) => Box::new(NoOrderSource),
        (None, false) => {
            let cookies = page_cookies(config).await;
            Box::new(PageOrderSource::new(client).with_cookies(cookies))
        }
    };

    let collaborators = Collaborators {
        archiver: &archiver,
        order_source: order_source.as_ref(),
        channel_source: &channel_source,
        renderer: &renderer,
    };
    let request = ArchiveRequest {
        max_posts: args.max_posts,
        include_members: !args.no_members,
        fetch_channel_info: !args.skip_channel_info,
        ..ArchiveRequest::new(&args.url)
    };

    let report = pipeline::run_archive(config, store, &collaborators, &request).await?;
    if let Some(path) = report.export_path {
        log::info!("Viewer data written to {}", path.display());
    }
    Ok(())
}

fn select_posts(posts: Vec<Post>, args: &StatsArgs) -> Vec<Post> {
    let (include_members, include_public) = match (args.members_only, args.public_only) {
        (true, _) => (true, false),
        (_, true) => (false, true),
        _ => (true, true),
    };
    let mut selected: Vec<Post> = query::filter_members(&posts, include_members, include_public)
        .into_iter()
        .cloned()
        .collect();

    if let Some(q) = &args.search {
        selected = query::search(&selected, q).into_iter().cloned().collect();
    }
    if args.with_polls {
        selected = query::with_polls(&selected).into_iter().cloned().collect();
    }
    if args.with_images {
        selected = query::with_images(&selected).into_iter().cloned().collect();
    }

    let range = query::DateRange {
        start: args
            .since
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Bound::Unbounded, |dt| Bound::Included(dt.and_utc())),
        // Whole `until` day is included
        end: args
            .until
            .and_then(|d| d.checked_add_signed(TimeDelta::days(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Bound::Unbounded, |dt| Bound::Excluded(dt.and_utc())),
    };
    query::filter_by_date_range(&selected, &range)
        .into_iter()
        .cloned()
        .collect()
}

async fn stats(store: &LocalStorage, args: &StatsArgs) -> Result<()> {
    let loaded = store.load_posts(chrono::Utc::now()).await;
    if !loaded.skipped.is_empty() {
        log::warn!("{} records could not be read", loaded.skipped.len());
    }

    let selected = select_posts(loaded.posts, args);
    let statistics = query::statistics(&selected);

    println!("{}", serde_json::to_string_pretty(&statistics)?);
    for post in &selected {
        println!("{}", post.post_id);
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli);

    if let Command::Archive(args) = &cli.command {
        apply_archive_overrides(&mut config, args);
    }
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let store = LocalStorage::from_config(&config.paths);
    log::debug!("Archive directory: {}", config.paths.output_dir.display());

    match &cli.command {
        Command::Archive(args) => archive(&config, &store, args).await?,

        Command::Generate => {
            let renderer = JsonViewerExporter::new(&config.paths.output_dir, &config.paths.viewer_dir);
            pipeline::run_generate(&store, &renderer).await?;
        }

        Command::Reorder { order_file } => {
            let fresh = match order_file {
                Some(path) => FileOrderSource::new(path).fetch_order("", None).await,
                None => Vec::new(),
            };
            pipeline::run_reorder(&store, &fresh).await?;
        }

        Command::Stats(args) => stats(&store, args).await?,

        Command::Validate => {
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
