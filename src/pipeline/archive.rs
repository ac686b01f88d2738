// src/pipeline/archive.rs

//! Pipeline runs over an archive directory.
//!
//! - `run_archive`: scrape, restore membership, reconcile order, export
//! - `run_generate`: re-export an existing archive as-is
//! - `run_reorder`: reconcile the order table from disk only
//!
//! Collaborator failures are logged and the run continues with whatever is
//! on disk.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ChannelInfo, Config, OrderTable, Post};
use crate::pipeline::membership::{MembershipReport, restore_member_status};
use crate::pipeline::query::PostStatistics;
use crate::pipeline::reconcile::{OrderMode, reconcile_order};
use crate::pipeline::snapshot::ProcessedSnapshot;
use crate::services::{ArchiveOutcome, ChannelSource, OrderSource, PostArchiver, ViewerRenderer};
use crate::storage::{PostStore, SkippedRecord};
use crate::utils::progress;
use crate::utils::url::{membership_url, posts_url};

/// What to archive.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub channel_url: String,
    pub max_posts: Option<usize>,
    /// Also archive the membership tab when a login context is configured
    pub include_members: bool,
    pub fetch_channel_info: bool,
}

impl ArchiveRequest {
    pub fn new(channel_url: impl Into<String>) -> Self {
        Self {
            channel_url: channel_url.into(),
            max_posts: None,
            include_members: true,
            fetch_channel_info: true,
        }
    }
}

/// External collaborators used by a full archive run.
pub struct Collaborators<'a> {
    pub archiver: &'a dyn PostArchiver,
    pub order_source: &'a dyn OrderSource,
    pub channel_source: &'a dyn ChannelSource,
    pub renderer: &'a dyn ViewerRenderer,
}

/// What a run did.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Archiver outcome per target URL
    pub archive_outcomes: Vec<(String, ArchiveOutcome)>,
    pub posts_loaded: usize,
    pub skipped: Vec<SkippedRecord>,
    pub membership: MembershipReport,
    /// Set once the order table was reconciled
    pub order_mode: Option<OrderMode>,
    pub order_table: Option<OrderTable>,
    pub statistics: Option<PostStatistics>,
    pub export_path: Option<PathBuf>,
}

impl RunReport {
    fn log_summary(&self, title: &str) {
        let mut items = vec![
            ("Posts", self.posts_loaded.to_string()),
            ("Skipped records", self.skipped.len().to_string()),
        ];
        if !self.archive_outcomes.is_empty() {
            let failed = self
                .archive_outcomes
                .iter()
                .filter(|(_, outcome)| !outcome.is_success())
                .count();
            items.push(("Archiver failures", failed.to_string()));
        }
        if !self.membership.restored.is_empty() || !self.membership.is_clean() {
            items.push((
                "Member status restored",
                self.membership.restored.len().to_string(),
            ));
        }
        if let Some(mode) = self.order_mode {
            items.push(("Order", format!("{mode:?}")));
        }
        if let Some(stats) = &self.statistics {
            items.push((
                "Member-only / public",
                format!("{} / {}", stats.members_only, stats.public),
            ));
        }
        if let Some(path) = &self.export_path {
            items.push(("Export", path.display().to_string()));
        }
        progress::summary(title, &items);
    }
}

/// Run a full archive pass for one channel.
pub async fn run_archive(
    config: &Config,
    store: &dyn PostStore,
    collaborators: &Collaborators<'_>,
    request: &ArchiveRequest,
) -> Result<RunReport> {
    let now = Utc::now();
    tokio::fs::create_dir_all(store.root()).await?;

    progress::header(&format!("Archiving {}", request.channel_url));
    let total_steps = 5;

    progress::step(1, total_steps, "Channel info");
    let channel = if request.fetch_channel_info {
        fetch_channel(store, collaborators.channel_source, &request.channel_url).await
    } else {
        store.load_channel_info().await
    };

    progress::step(2, total_steps, "Capturing member ids and current order");
    // Taken before the archiver rewrites records
    let member_ids = store.load_member_ids().await;
    log::info!("{} posts previously marked member-only", member_ids.len());

    let fresh_order = collaborators
        .order_source
        .fetch_order(&request.channel_url, request.max_posts)
        .await;
    if !fresh_order.is_empty() && config.archiver.settle_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.archiver.settle_delay_ms)).await;
    }

    progress::step(3, total_steps, "Running archiver");
    let mut report = RunReport::default();
    let mut targets = vec![posts_url(&request.channel_url)];
    if request.include_members {
        if config.auth.is_authenticated() {
            targets.push(membership_url(&request.channel_url));
        } else {
            log::info!("No browser profile or cookies configured, skipping member-only posts");
        }
    }
    for target in targets {
        let outcome = collaborators
            .archiver
            .archive(&target, request.max_posts)
            .await;
        report.archive_outcomes.push((target, outcome));
    }

    progress::step(4, total_steps, "Reconciling posts");
    let Some(mut posts) = load_posts(store, now, &mut report).await else {
        report.log_summary("Archive");
        return Ok(report);
    };
    report.membership = restore_member_status(store, &mut posts, &member_ids).await;
    let table = reconcile_and_save(store, &posts, &fresh_order, now, &mut report).await;

    progress::step(5, total_steps, "Exporting viewer data");
    export(collaborators.renderer, posts, Some(&table), channel, now, &mut report).await;

    report.log_summary("Archive");
    Ok(report)
}

/// Re-export an existing archive without scraping, using the persisted order.
pub async fn run_generate(store: &dyn PostStore, renderer: &dyn ViewerRenderer) -> Result<RunReport> {
    let now = Utc::now();
    let mut report = RunReport::default();

    let Some(posts) = load_posts(store, now, &mut report).await else {
        return Ok(report);
    };
    let table = store.load_order_table().await;
    if table.is_none() {
        log::info!("No order table found, ordering by estimated date");
    }
    let channel = store.load_channel_info().await;

    export(renderer, posts, table.as_ref(), channel, now, &mut report).await;
    report.order_table = table;

    report.log_summary("Generate");
    Ok(report)
}

/// Reconcile the order table from the posts on disk.
///
/// An empty `fresh_order` selects the fallback ranking.
pub async fn run_reorder(store: &dyn PostStore, fresh_order: &[String]) -> Result<RunReport> {
    let now = Utc::now();
    let mut report = RunReport::default();

    let Some(posts) = load_posts(store, now, &mut report).await else {
        return Ok(report);
    };
    reconcile_and_save(store, &posts, fresh_order, now, &mut report).await;

    report.log_summary("Reorder");
    Ok(report)
}

async fn fetch_channel(
    store: &dyn PostStore,
    source: &dyn ChannelSource,
    url: &str,
) -> Option<ChannelInfo> {
    match source.fetch_channel_info(url).await {
        Some(info) => {
            if let Err(e) = store.save_channel_info(&info).await {
                log::warn!("Could not save channel info: {}", e);
            }
            Some(info)
        }
        // Keep whatever an earlier run saved
        None => store.load_channel_info().await,
    }
}

/// Load posts into the report. `None` when there is nothing to process.
async fn load_posts(
    store: &dyn PostStore,
    now: DateTime<Utc>,
    report: &mut RunReport,
) -> Option<Vec<Post>> {
    let loaded = store.load_posts(now).await;
    report.posts_loaded = loaded.posts.len();
    report.skipped = loaded.skipped;

    if loaded.posts.is_empty() {
        log::warn!("No posts found in {}", store.root().display());
        return None;
    }
    log::info!("Loaded {} posts", loaded.posts.len());
    Some(loaded.posts)
}

async fn reconcile_and_save(
    store: &dyn PostStore,
    posts: &[Post],
    fresh_order: &[String],
    now: DateTime<Utc>,
    report: &mut RunReport,
) -> OrderTable {
    let previous = store.load_order_table().await;
    let reconciliation = reconcile_order(posts, Some(fresh_order), previous.as_ref(), now);

    match reconciliation.mode {
        OrderMode::Fresh => log::info!(
            "Ordered {} posts from {} freshly observed positions",
            reconciliation.table.len(),
            fresh_order.len()
        ),
        OrderMode::Fallback => log::info!(
            "No fresh order available, ordered {} posts by archive time",
            reconciliation.table.len()
        ),
    }
    if !reconciliation.dropped.is_empty() {
        log::info!(
            "{} posts have no known position and were left out of the order table",
            reconciliation.dropped.len()
        );
    }

    if let Err(e) = store.save_order_table(&reconciliation.table).await {
        log::warn!("Could not save order table: {}", e);
    }

    report.order_mode = Some(reconciliation.mode);
    report.order_table = Some(reconciliation.table.clone());
    reconciliation.table
}

async fn export(
    renderer: &dyn ViewerRenderer,
    posts: Vec<Post>,
    table: Option<&OrderTable>,
    channel: Option<ChannelInfo>,
    now: DateTime<Utc>,
    report: &mut RunReport,
) {
    let snapshot = ProcessedSnapshot::build(posts, table, channel, now);
    report.statistics = Some(snapshot.statistics.clone());

    match renderer.render(&snapshot).await {
        Ok(path) => report.export_path = Some(path),
        Err(e) => log::warn!("Viewer export failed: {}", e),
    }
}
