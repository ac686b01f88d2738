//! Local filesystem storage implementation.
//!
//! Reads the per-post records the archiver leaves behind and owns the files
//! this crate maintains next to them (order table, channel metadata).
//!
//! ## Features
//!
//! - **Repository loading**: discovers `post.json` records at any depth and
//!   attaches the images stored beside them
//! - **Atomic writes**: files are written to a temp file and renamed in place
//! - **Record patching**: membership corrections keep every other field intact

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::error::{AppError, Result};
use crate::models::{ChannelInfo, OrderTable, PathsConfig, Post, PostRecord};
use crate::storage::{LoadedPosts, PostStore, SkippedRecord};
use crate::utils::is_image_file;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    record_file: String,
    order_file: String,
    channel_file: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory, using the
    /// default file names.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let paths = PathsConfig {
            output_dir: root_dir.into(),
            ..PathsConfig::default()
        };
        Self::from_config(&paths)
    }

    /// Create a LocalStorage from the configured archive layout.
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            root_dir: paths.output_dir.clone(),
            record_file: paths.record_file.clone(),
            order_file: paths.order_file.clone(),
            channel_file: paths.channel_file.clone(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(&self.path(key), &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read an optional JSON file, downgrading failures to a warning.
    async fn read_json_lenient<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_json(key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring unreadable {}: {}", self.path(key).display(), e);
                None
            }
        }
    }

    /// Find all record files under the root, sorted by path.
    fn discover_records(&self) -> Vec<PathBuf> {
        if !self.root_dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&self.root_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable path during discovery: {}", e);
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file() && entry.file_name() == self.record_file.as_str()
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// List image files in a post directory, sorted by name.
    async fn list_images(dir: &Path) -> Vec<String> {
        let mut images = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return images;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_image_file(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                images.push(name.to_string());
            }
        }
        images.sort();
        images
    }

    async fn read_record(path: &Path) -> Result<PostRecord> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::record(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::record(path, e))
    }

    /// Load a single post from its record path.
    async fn load_post(&self, record_path: &Path, now: DateTime<Utc>) -> Result<Post> {
        let record = Self::read_record(record_path).await?;
        let dir = record_path.parent().unwrap_or(&self.root_dir);
        let fallback_id = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let local_images = Self::list_images(dir).await;

        Ok(Post::from_record(
            record,
            &fallback_id,
            local_images,
            record_path.to_path_buf(),
            now,
        ))
    }

    /// Serialize a record the way the archiver lays it out (4-space indent).
    fn record_bytes(value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut serializer)?;
        Ok(buf)
    }
}

#[async_trait]
impl PostStore for LocalStorage {
    fn root(&self) -> &Path {
        &self.root_dir
    }

    async fn load_posts(&self, now: DateTime<Utc>) -> LoadedPosts {
        let mut loaded = LoadedPosts::default();

        for record_path in self.discover_records() {
            match self.load_post(&record_path, now).await {
                Ok(post) => loaded.posts.push(post),
                Err(e) => {
                    log::warn!("Could not load {}: {}", record_path.display(), e);
                    loaded.skipped.push(SkippedRecord {
                        path: record_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!(
            "Loaded {} posts from {} ({} skipped)",
            loaded.posts.len(),
            self.root_dir.display(),
            loaded.skipped.len()
        );
        loaded
    }

    async fn load_member_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for record_path in self.discover_records() {
            // Malformed records carry no evidence either way.
            if let Ok(post) = self.load_post(&record_path, Utc::now()).await {
                if post.is_members && !post.post_id.is_empty() {
                    ids.insert(post.post_id);
                }
            }
        }
        ids
    }

    async fn mark_member(&self, post: &Post) -> Result<()> {
        let path = post.record_path.as_path();
        if path.as_os_str().is_empty() {
            return Err(AppError::validation(format!(
                "post {} has no record path",
                post.post_id
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::record(path, e))?;
        let mut value: Value =
            serde_json::from_slice(&bytes).map_err(|e| AppError::record(path, e))?;
        let Some(object) = value.as_object_mut() else {
            return Err(AppError::record(path, "record is not a JSON object"));
        };
        object.insert("is_members".to_string(), Value::Bool(true));

        Self::write_bytes(path, &Self::record_bytes(&value)?).await
    }

    async fn load_order_table(&self) -> Option<OrderTable> {
        self.read_json_lenient(&self.order_file).await
    }

    async fn save_order_table(&self, table: &OrderTable) -> Result<()> {
        self.write_json(&self.order_file, table).await
    }

    async fn load_channel_info(&self) -> Option<ChannelInfo> {
        self.read_json_lenient(&self.channel_file).await
    }

    async fn save_channel_info(&self, info: &ChannelInfo) -> Result<()> {
        self.write_json(&self.channel_file, info).await
    }
}
