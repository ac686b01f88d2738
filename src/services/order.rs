//! Fresh display-order sources.
//!
//! A fresh order is a newest-first list of post ids as the channel currently
//! shows them. It may be incomplete; an empty list means "no evidence".

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderValue;

use crate::utils::http::fetch_text_with_cookies;
use crate::utils::url::{post_id_from_url, posts_url};

/// Produces the fresh order for a channel.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_order(&self, channel_url: &str, max_posts: Option<usize>) -> Vec<String>;
}

/// Source that never has an opinion.
pub struct NoOrderSource;

#[async_trait]
impl OrderSource for NoOrderSource {
    async fn fetch_order(&self, _channel_url: &str, _max_posts: Option<usize>) -> Vec<String> {
        Vec::new()
    }
}

/// Reads the order from a text file of post ids or post URLs, one per line.
pub struct FileOrderSource {
    path: PathBuf,
}

impl FileOrderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl OrderSource for FileOrderSource {
    async fn fetch_order(&self, _channel_url: &str, max_posts: Option<usize>) -> Vec<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let ids = cap(parse_order_list(&content), max_posts);
                log::info!("Read {} post ids from {}", ids.len(), self.path.display());
                ids
            }
            Err(e) => {
                log::warn!("Could not read order file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

/// Scrapes post ids from the channel's posts page in document order.
///
/// Only the posts present in the initial page payload are seen. Member-only
/// posts appear in the page only when login cookies are attached.
pub struct PageOrderSource {
    client: Client,
    cookies: Option<HeaderValue>,
}

impl PageOrderSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cookies: None,
        }
    }

    /// Send `cookies` as the `Cookie` header with the page request.
    pub fn with_cookies(mut self, cookies: Option<HeaderValue>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookies.is_some()
    }
}

#[async_trait]
impl OrderSource for PageOrderSource {
    async fn fetch_order(&self, channel_url: &str, max_posts: Option<usize>) -> Vec<String> {
        let url = posts_url(channel_url);
        match fetch_text_with_cookies(&self.client, &url, self.cookies.as_ref()).await {
            Ok(html) => {
                let ids = cap(extract_post_ids(&html), max_posts);
                log::info!(
                    "Observed {} posts in current page order{}",
                    ids.len(),
                    if self.is_authenticated() { " (logged in)" } else { "" }
                );
                ids
            }
            Err(e) => {
                log::warn!("Could not fetch post order from {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

fn cap(mut ids: Vec<String>, max_posts: Option<usize>) -> Vec<String> {
    if let Some(max) = max_posts {
        ids.truncate(max);
    }
    ids
}

/// Parse an order list. Blank lines and `#` comments are skipped, URLs are
/// reduced to their post id and repeats are dropped.
pub fn parse_order_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            if line.contains('/') {
                post_id_from_url(line)
            } else {
                Some(line.to_string())
            }
        })
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Extract `"postId":"..."` values in document order, without repeats.
pub fn extract_post_ids(html: &str) -> Vec<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = RE.get_or_init(|| Regex::new(r#""postId"\s*:\s*"([\w-]+)""#).ok()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
