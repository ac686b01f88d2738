// src/utils/url.rs

//! Channel and post URL manipulation utilities.

use std::sync::OnceLock;

use regex::Regex;

/// Tab suffixes that may trail a channel URL.
const TAB_SUFFIXES: [&str; 7] = [
    "/posts",
    "/community",
    "/membership",
    "/videos",
    "/about",
    "/channels",
    "/playlists",
];

/// Strip a single trailing tab suffix (and trailing slashes) from a channel URL.
///
/// # Examples
/// ```
/// use community_archiver::utils::url::channel_url;
///
/// assert_eq!(
///     channel_url("https://www.youtube.com/@Example/posts/"),
///     "https://www.youtube.com/@Example"
/// );
/// ```
pub fn channel_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    TAB_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed)
        .to_string()
}

/// Make sure the URL points at the channel's posts tab.
///
/// Membership URLs and existing posts/community URLs are left alone.
pub fn posts_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with("/posts")
        || trimmed.ends_with("/community")
        || trimmed.contains("/membership")
    {
        return trimmed.to_string();
    }
    format!("{}/posts", channel_url(trimmed))
}

/// Convert a channel URL to its membership posts URL.
pub fn membership_url(url: &str) -> String {
    format!("{}/membership", channel_url(url))
}

/// Extract the channel handle (`@name`, custom name, or channel id) from a URL.
pub fn extract_channel_handle(url: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"youtube\.com/(@[\w.-]+)",
            r"youtube\.com/c/([\w-]+)",
            r"youtube\.com/channel/([\w-]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns
        .iter()
        .find_map(|re| re.captures(url)?.get(1).map(|m| m.as_str().to_string()))
}

/// Extract the post identifier from a post URL (its last path segment).
///
/// Falls back to plain string splitting only for values that are not
/// absolute URLs. An absolute URL without a path yields `None`.
pub fn post_id_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .last()
            .map(str::to_string),
        Err(_) => url
            .split(['?', '#'])
            .next()?
            .split('/')
            .filter(|segment| !segment.is_empty())
            .last()
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_url_strips_suffix() {
        assert_eq!(
            channel_url("https://www.youtube.com/@Example/membership"),
            "https://www.youtube.com/@Example"
        );
        assert_eq!(
            channel_url("https://www.youtube.com/@Example"),
            "https://www.youtube.com/@Example"
        );
    }

    #[test]
    fn test_posts_url() {
        assert_eq!(
            posts_url("https://www.youtube.com/@Example"),
            "https://www.youtube.com/@Example/posts"
        );
        assert_eq!(
            posts_url("https://www.youtube.com/@Example/community/"),
            "https://www.youtube.com/@Example/community"
        );
        assert_eq!(
            posts_url("https://www.youtube.com/@Example/videos"),
            "https://www.youtube.com/@Example/posts"
        );
        assert_eq!(
            posts_url("https://www.youtube.com/@Example/membership"),
            "https://www.youtube.com/@Example/membership"
        );
    }

    #[test]
    fn test_membership_url() {
        assert_eq!(
            membership_url("https://www.youtube.com/@Example/posts"),
            "https://www.youtube.com/@Example/membership"
        );
    }

    #[test]
    fn test_extract_channel_handle() {
        assert_eq!(
            extract_channel_handle("https://www.youtube.com/@Some-Name/posts"),
            Some("@Some-Name".to_string())
        );
        assert_eq!(
            extract_channel_handle("https://www.youtube.com/c/custom"),
            Some("custom".to_string())
        );
        assert_eq!(
            extract_channel_handle("https://www.youtube.com/channel/UC123abc"),
            Some("UC123abc".to_string())
        );
        assert_eq!(extract_channel_handle("https://example.com/x"), None);
    }

    #[test]
    fn test_post_id_from_url() {
        assert_eq!(
            post_id_from_url("https://www.youtube.com/post/UgkxAbC123"),
            Some("UgkxAbC123".to_string())
        );
        assert_eq!(
            post_id_from_url("https://www.youtube.com/post/UgkxAbC123?lc=1"),
            Some("UgkxAbC123".to_string())
        );
        assert_eq!(
            post_id_from_url("post/UgkxAbC123/"),
            Some("UgkxAbC123".to_string())
        );
        assert_eq!(post_id_from_url(""), None);
    }

    #[test]
    fn test_post_id_from_url_without_path() {
        assert_eq!(post_id_from_url("https://www.youtube.com/"), None);
        assert_eq!(post_id_from_url("https://www.youtube.com"), None);
        assert_eq!(post_id_from_url("https://www.youtube.com/?lc=1"), None);
    }
}
