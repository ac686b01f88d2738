//! Viewer export.
//!
//! Writes a JSON projection of the processed snapshot plus copies of all
//! images under `<viewer>/assets/`, ready for a static viewer page:
//!
//! ```text
//! viewer/assets/
//! ├── posts.json            # Posts in display order
//! ├── summary.json          # Channel, statistics, archive date
//! ├── channel_avatar.jpg
//! └── posts/<post_id>/0.jpg
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{ChannelInfo, Post};
use crate::pipeline::query::PostStatistics;
use crate::pipeline::snapshot::ProcessedSnapshot;

/// Renders a processed snapshot for viewing.
#[async_trait]
pub trait ViewerRenderer: Send + Sync {
    /// Export the snapshot; returns the path of the main output file.
    async fn render(&self, snapshot: &ProcessedSnapshot) -> Result<PathBuf>;
}

#[derive(Debug, Serialize)]
struct PostView<'a> {
    post_id: &'a str,
    url: &'a str,
    text: &'a str,
    images: Vec<String>,
    links: &'a [String],
    is_members: bool,
    relative_date: &'a str,
    estimated_date: Option<DateTime<Utc>>,
    comments: &'a str,
    thumbs_up: &'a str,
    poll: Option<&'a Value>,
}

impl<'a> PostView<'a> {
    fn new(post: &'a Post) -> Self {
        Self {
            post_id: &post.post_id,
            url: &post.url,
            text: &post.text,
            images: post
                .local_images
                .iter()
                .map(|name| format!("posts/{}/{}", post.post_id, name))
                .collect(),
            links: &post.link_urls,
            is_members: post.is_members,
            relative_date: &post.relative_date,
            estimated_date: post.estimated_date,
            comments: &post.comment_count,
            thumbs_up: &post.thumbs_up_count,
            poll: post.poll.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryView<'a> {
    channel: Option<&'a ChannelInfo>,
    statistics: &'a PostStatistics,
    archive_date: DateTime<Utc>,
}

/// Exports the snapshot as JSON files under the viewer directory.
pub struct JsonViewerExporter {
    archive_root: PathBuf,
    viewer_dir: PathBuf,
}

impl JsonViewerExporter {
    pub fn new(archive_root: impl Into<PathBuf>, viewer_dir: &str) -> Self {
        let archive_root = archive_root.into();
        let viewer_dir = archive_root.join(viewer_dir);
        Self {
            archive_root,
            viewer_dir,
        }
    }

    fn assets_dir(&self) -> PathBuf {
        self.viewer_dir.join("assets")
    }

    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Copy one file, logging instead of failing.
    async fn copy_asset(src: &Path, dest: &Path) -> bool {
        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                log::warn!("Could not create {}: {}", parent.display(), e);
                return false;
            }
        }
        match tokio::fs::copy(src, dest).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Could not copy {}: {}", src.display(), e);
                false
            }
        }
    }

    async fn copy_channel_images(&self, channel: &ChannelInfo) {
        let assets = self.assets_dir();
        if channel.has_avatar() {
            let name = &channel.local_avatar;
            Self::copy_asset(&self.archive_root.join(name), &assets.join(name)).await;
        }
        if channel.has_banner() {
            let name = &channel.local_banner;
            Self::copy_asset(&self.archive_root.join(name), &assets.join(name)).await;
        }
    }

    async fn copy_post_images(&self, posts: &[Post]) -> usize {
        let posts_dir = self.assets_dir().join("posts");
        let mut copied = 0;
        for post in posts {
            let Some(src_dir) = post.record_path.parent() else {
                continue;
            };
            if !is_plain_name(&post.post_id) {
                log::warn!("Skipping images of post with unsafe id {:?}", post.post_id);
                continue;
            }
            for name in post.local_images.iter().filter(|name| is_plain_name(name)) {
                let dest = posts_dir.join(&post.post_id).join(name);
                if Self::copy_asset(&src_dir.join(name), &dest).await {
                    copied += 1;
                }
            }
        }
        copied
    }
}

/// A single normal path component: not empty, `.`, `..`, and free of separators.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[async_trait]
impl ViewerRenderer for JsonViewerExporter {
    async fn render(&self, snapshot: &ProcessedSnapshot) -> Result<PathBuf> {
        let assets = self.assets_dir();
        tokio::fs::create_dir_all(&assets).await?;

        let posts: Vec<PostView<'_>> = snapshot.posts.iter().map(PostView::new).collect();
        let posts_path = assets.join("posts.json");
        Self::write_json(&posts_path, &posts).await?;

        let summary = SummaryView {
            channel: snapshot.channel.as_ref(),
            statistics: &snapshot.statistics,
            archive_date: snapshot.archive_date,
        };
        Self::write_json(&assets.join("summary.json"), &summary).await?;

        if let Some(channel) = &snapshot.channel {
            self.copy_channel_images(channel).await;
        }
        let copied = self.copy_post_images(&snapshot.posts).await;

        log::info!(
            "Exported {} posts and {} images to {}",
            posts.len(),
            copied,
            self.viewer_dir.display()
        );
        Ok(posts_path)
    }
}
