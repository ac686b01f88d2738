//! Channel metadata fetching.
//!
//! Reads the channel page's embedded `ytInitialData` document, falling back to
//! OpenGraph meta tags, and downloads the avatar and banner images.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ChannelInfo;
use crate::utils::http::{download_to, fetch_text};
use crate::utils::url::{channel_url, extract_channel_handle};

pub const AVATAR_FILE: &str = "channel_avatar.jpg";
pub const BANNER_FILE: &str = "channel_banner.jpg";

/// Source of channel profile metadata.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Fetch channel metadata. Failures are logged and yield `None`.
    async fn fetch_channel_info(&self, url: &str) -> Option<ChannelInfo>;
}

/// Fetches channel metadata over HTTP and stores images in the archive root.
pub struct ChannelFetcher {
    client: Client,
    output_dir: PathBuf,
}

impl ChannelFetcher {
    pub fn new(client: Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<ChannelInfo> {
        let page_url = channel_url(url);
        url::Url::parse(&page_url)?;

        let html = fetch_text(&self.client, &page_url).await?;
        let mut info = parse_channel_page(&html, &page_url)
            .ok_or_else(|| AppError::collaborator("channel page", "no channel metadata found"))?;

        self.download_images(&mut info).await;
        Ok(info)
    }

    async fn download_images(&self, info: &mut ChannelInfo) {
        if !info.avatar_url.is_empty() {
            let dest = self.output_dir.join(AVATAR_FILE);
            match download_to(&self.client, &info.avatar_url, &dest).await {
                Ok(()) => info.local_avatar = AVATAR_FILE.to_string(),
                Err(e) => log::warn!("Avatar download failed: {}", e),
            }
        }
        if !info.banner_url.is_empty() {
            let dest = self.output_dir.join(BANNER_FILE);
            match download_to(&self.client, &info.banner_url, &dest).await {
                Ok(()) => info.local_banner = BANNER_FILE.to_string(),
                Err(e) => log::warn!("Banner download failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl ChannelSource for ChannelFetcher {
    async fn fetch_channel_info(&self, url: &str) -> Option<ChannelInfo> {
        match self.fetch(url).await {
            Ok(info) => {
                log::info!("Fetched channel info for {}", display_name(&info));
                Some(info)
            }
            Err(e) => {
                log::warn!("Could not fetch channel info for {}: {}", url, e);
                None
            }
        }
    }
}

fn display_name(info: &ChannelInfo) -> &str {
    if info.name.is_empty() {
        &info.handle
    } else {
        &info.name
    }
}

/// Extract channel metadata from a channel page.
pub fn parse_channel_page(html: &str, page_url: &str) -> Option<ChannelInfo> {
    let from_data = initial_data(html).and_then(|data| extract_from_initial_data(&data, page_url));
    from_data.or_else(|| extract_from_meta_tags(html, page_url))
}

fn initial_data(html: &str) -> Option<Value> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?s)var ytInitialData = (\{.*?\});</script>",
            r#"(?s)ytInitialData"\s*:\s*(\{.*?\})\s*[,}]</script>"#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns
        .iter()
        .filter_map(|re| re.captures(html)?.get(1))
        .find_map(|m| serde_json::from_str(m.as_str()).ok())
}

/// URL of the largest entry in a `{"thumbnails": [...]}` object.
fn last_thumbnail(value: &Value) -> Option<String> {
    value
        .get("thumbnails")?
        .as_array()?
        .last()?
        .get("url")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_at(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn extract_from_initial_data(data: &Value, page_url: &str) -> Option<ChannelInfo> {
    let null = Value::Null;
    let metadata = data.pointer("/metadata/channelMetadataRenderer").unwrap_or(&null);
    let header = data
        .pointer("/header/c4TabbedHeaderRenderer")
        .or_else(|| data.pointer("/header/pageHeaderRenderer"))
        .unwrap_or(&null);

    if metadata.is_null() && header.is_null() {
        return None;
    }

    let mut name = text_at(metadata, "title");
    if name.is_empty() {
        name = text_at(header, "title");
    }

    let avatar_url = metadata
        .get("avatar")
        .and_then(last_thumbnail)
        .or_else(|| header.get("avatar").and_then(last_thumbnail))
        .unwrap_or_default();

    // The TV banner is usually the larger image
    let banner_url = header
        .get("tvBanner")
        .and_then(last_thumbnail)
        .or_else(|| header.get("banner").and_then(last_thumbnail))
        .unwrap_or_default();

    let subscriber_count = header
        .pointer("/subscriberCountText/simpleText")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(ChannelInfo {
        channel_id: text_at(metadata, "externalId"),
        name,
        handle: handle_from_url(page_url),
        description: text_at(metadata, "description"),
        avatar_url: high_quality_avatar(&avatar_url),
        banner_url: high_quality_banner(&banner_url),
        subscriber_count,
        ..ChannelInfo::default()
    })
}

fn extract_from_meta_tags(html: &str, page_url: &str) -> Option<ChannelInfo> {
    let document = Html::parse_document(html);
    let meta = |property: &str| -> String {
        Selector::parse(&format!(r#"meta[property="{property}"]"#))
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .next()
                    .and_then(|el| el.value().attr("content"))
                    .map(str::to_string)
            })
            .unwrap_or_default()
    };

    let name = meta("og:title");
    let avatar_url = meta("og:image");
    if name.is_empty() && avatar_url.is_empty() {
        return None;
    }

    Some(ChannelInfo {
        name,
        handle: handle_from_url(page_url),
        description: meta("og:description"),
        avatar_url: high_quality_avatar(&avatar_url),
        ..ChannelInfo::default()
    })
}

fn handle_from_url(url: &str) -> String {
    extract_channel_handle(url)
        .filter(|h| h.starts_with('@'))
        .unwrap_or_default()
}

/// Request the 800px avatar (`=s88-` becomes `=s800-`).
pub fn high_quality_avatar(url: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"=s\d+-").ok()) {
        Some(re) => re.replace_all(url, "=s800-").into_owned(),
        None => url.to_string(),
    }
}

/// Request the 2120px banner (`=w1060-` becomes `=w2120-`).
pub fn high_quality_banner(url: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"=w\d+-").ok()) {
        Some(re) => re.replace_all(url, "=w2120-").into_owned(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.youtube.com/@Example";

    #[test]
    fn test_initial_data_extraction() {
        let html = r#"<html><script>var ytInitialData = {"metadata":{"channelMetadataRenderer":{"externalId":"UC1","title":"Example","description":"desc","avatar":{"thumbnails":[{"url":"https://yt3/a=s48-c"},{"url":"https://yt3/a=s176-c"}]}}},"header":{"c4TabbedHeaderRenderer":{"banner":{"thumbnails":[{"url":"https://yt3/b=w1060-x"}]},"subscriberCountText":{"simpleText":"1.2M subscribers"}}}};</script></html>"#;

        let info = parse_channel_page(html, URL).unwrap();
        assert_eq!(info.channel_id, "UC1");
        assert_eq!(info.name, "Example");
        assert_eq!(info.handle, "@Example");
        assert_eq!(info.description, "desc");
        assert_eq!(info.avatar_url, "https://yt3/a=s800-c");
        assert_eq!(info.banner_url, "https://yt3/b=w2120-x");
        assert_eq!(info.subscriber_count, "1.2M subscribers");
        assert!(!info.has_avatar());
    }

    #[test]
    fn test_header_fills_missing_metadata() {
        let html = r#"<script>var ytInitialData = {"header":{"c4TabbedHeaderRenderer":{"title":"From Header","avatar":{"thumbnails":[{"url":"https://yt3/h=s88-c"}]},"banner":{"thumbnails":[{"url":"b1"}]},"tvBanner":{"thumbnails":[{"url":"https://yt3/tv=w1280-x"}]}}}};</script>"#;

        let info = parse_channel_page(html, URL).unwrap();
        assert_eq!(info.name, "From Header");
        assert_eq!(info.avatar_url, "https://yt3/h=s800-c");
        assert_eq!(info.banner_url, "https://yt3/tv=w2120-x");
    }

    #[test]
    fn test_meta_tag_fallback() {
        let html = r#"<html><head>
            <meta property="og:title" content="Meta Name">
            <meta property="og:description" content="About us">
            <meta property="og:image" content="https://yt3/m=s900-c">
            </head></html>"#;

        let info = parse_channel_page(html, "https://www.youtube.com/channel/UC9").unwrap();
        assert_eq!(info.name, "Meta Name");
        assert_eq!(info.description, "About us");
        assert_eq!(info.avatar_url, "https://yt3/m=s800-c");
        assert_eq!(info.handle, "");
        assert_eq!(info.banner_url, "");
    }

    #[test]
    fn test_malformed_initial_data_falls_back() {
        let html = r#"<script>var ytInitialData = {not json};</script>
            <meta property="og:title" content="Fallback">"#;
        let info = parse_channel_page(html, URL).unwrap();
        assert_eq!(info.name, "Fallback");
    }

    #[test]
    fn test_nothing_found() {
        assert!(parse_channel_page("<html></html>", URL).is_none());
    }

    #[test]
    fn test_quality_rewrites() {
        assert_eq!(high_quality_avatar("x=s88-c-k"), "x=s800-c-k");
        assert_eq!(high_quality_avatar("no-size"), "no-size");
        assert_eq!(high_quality_banner("y=w1060-fcrop"), "y=w2120-fcrop");
        assert_eq!(high_quality_banner(""), "");
    }
}
