//! Storage abstractions for archive persistence.
//!
//! The archive is a plain directory shared with the external archiver:
//!
//! ```text
//! archive-output/
//! ├── channel_info.json     # Channel metadata
//! ├── channel_avatar.jpg
//! ├── channel_banner.jpg
//! ├── post_order.json       # Persisted order table
//! ├── <post_id>/            # One directory per post (written by the archiver)
//! │   ├── post.json
//! │   └── 0.jpg
//! └── viewer/               # Exported viewer data
//! ```
//!
//! Runs coordinate only through these files. A single writer is assumed.

pub mod local;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ChannelInfo, OrderTable, Post};

// Re-export for convenience
pub use local::LocalStorage;

/// A record file that could not be loaded.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading the post repository.
#[derive(Debug, Default)]
pub struct LoadedPosts {
    pub posts: Vec<Post>,
    pub skipped: Vec<SkippedRecord>,
}

/// Trait for archive storage backends.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Root directory of the archive.
    fn root(&self) -> &Path;

    /// Load every post record under the root.
    ///
    /// Unreadable records are skipped and reported, never returned as errors.
    async fn load_posts(&self, now: DateTime<Utc>) -> LoadedPosts;

    /// Ids of posts whose record is currently flagged member-only.
    async fn load_member_ids(&self) -> HashSet<String>;

    /// Persist `is_members = true` into the post's record.
    async fn mark_member(&self, post: &Post) -> Result<()>;

    /// Load the persisted order table, if present and readable.
    async fn load_order_table(&self) -> Option<OrderTable>;

    /// Replace the persisted order table.
    async fn save_order_table(&self, table: &OrderTable) -> Result<()>;

    /// Load saved channel metadata, if present and readable.
    async fn load_channel_info(&self) -> Option<ChannelInfo>;

    /// Save channel metadata.
    async fn save_channel_info(&self, info: &ChannelInfo) -> Result<()>;
}
