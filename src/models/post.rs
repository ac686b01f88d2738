//! Post data structures.
//!
//! `PostRecord` mirrors the `post.json` document the archiver writes, with
//! lenient defaults for older records. `Post` is the in-memory entity the rest
//! of the crate works with.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::date::{estimate_date, parse_timestamp};
use crate::utils::url::post_id_from_url;

/// Default display value for engagement counts.
pub const DEFAULT_COUNT: &str = "0";

/// A post record as stored on disk by the archiver.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRecord {
    #[serde(default, deserialize_with = "string_or_default")]
    pub url: String,

    #[serde(default, deserialize_with = "string_or_default")]
    pub text: String,

    #[serde(default, deserialize_with = "list_or_default")]
    pub images: Vec<String>,

    #[serde(default, deserialize_with = "list_or_default")]
    pub links: Vec<String>,

    #[serde(default, deserialize_with = "membership_flag")]
    pub is_members: bool,

    #[serde(default, deserialize_with = "string_or_default")]
    pub relative_date: String,

    #[serde(default, deserialize_with = "display_count")]
    pub num_comments: Option<String>,

    /// Older archiver versions only record an approximate comment count.
    #[serde(default, deserialize_with = "display_count")]
    pub approximate_num_comments: Option<String>,

    #[serde(default, deserialize_with = "display_count")]
    pub num_thumbs_up: Option<String>,

    #[serde(default)]
    pub poll: Option<Value>,

    #[serde(default, deserialize_with = "string_or_default")]
    pub when_archived: String,
}

/// An archived community post.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Post {
    /// Unique key, the last path segment of the post URL
    pub post_id: String,

    /// Canonical post URL
    pub url: String,

    /// Post body text
    pub text: String,

    /// Remote image URLs, in post order
    pub image_urls: Vec<String>,

    /// Image files found next to the record, sorted by name
    pub local_images: Vec<String>,

    /// Links embedded in the post
    pub link_urls: Vec<String>,

    /// Visible only to channel members
    pub is_members: bool,

    /// Relative date phrase as displayed ("3 months ago")
    pub relative_date: String,

    /// Approximate absolute date derived from `relative_date`
    pub estimated_date: Option<DateTime<Utc>>,

    /// Comment count display string
    pub comment_count: String,

    /// Like count display string
    pub thumbs_up_count: String,

    /// Poll payload, kept opaque
    pub poll: Option<Value>,

    /// ISO-8601 time the archiver processed the post
    pub archived_at: String,

    /// Record file this post was loaded from
    #[serde(skip)]
    pub record_path: PathBuf,
}

impl Post {
    /// Build a post from its on-disk record.
    ///
    /// `fallback_id` is used when the record carries no URL; `now` is the
    /// reference time for relative-date estimation.
    pub fn from_record(
        record: PostRecord,
        fallback_id: &str,
        local_images: Vec<String>,
        record_path: PathBuf,
        now: DateTime<Utc>,
    ) -> Self {
        let post_id = post_id_from_url(&record.url).unwrap_or_else(|| fallback_id.to_string());
        let estimated_date = estimate_date(&record.relative_date, now);
        let comment_count = record
            .num_comments
            .or(record.approximate_num_comments)
            .unwrap_or_else(|| DEFAULT_COUNT.to_string());

        Self {
            post_id,
            url: record.url,
            text: record.text,
            image_urls: record.images,
            local_images,
            link_urls: record.links,
            is_members: record.is_members,
            relative_date: record.relative_date,
            estimated_date,
            comment_count,
            thumbs_up_count: record
                .num_thumbs_up
                .unwrap_or_else(|| DEFAULT_COUNT.to_string()),
            poll: record.poll.filter(|p| !p.is_null()),
            archived_at: record.when_archived,
            record_path,
        }
    }

    /// Whether the post has any image, remote or downloaded.
    pub fn has_images(&self) -> bool {
        !self.image_urls.is_empty() || !self.local_images.is_empty()
    }

    /// Whether the post carries a poll.
    pub fn has_poll(&self) -> bool {
        self.poll.is_some()
    }

    /// Parsed archive timestamp, if the record has a usable one.
    pub fn archived_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.archived_at)
    }
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn list_or_default<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts are display strings ("7.3K"); numbers are kept as their text.
fn display_count<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Membership marker: booleans as-is, truthy strings and non-zero numbers
/// count as member-only, everything else as public.
fn membership_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn parse(json: &str) -> PostRecord {
        serde_json::from_str(json).unwrap()
    }

    fn build(record: PostRecord) -> Post {
        Post::from_record(record, "dir_id", Vec::new(), PathBuf::from("post.json"), now())
    }

    #[test]
    fn test_full_record() {
        let record = parse(
            r#"{
                "url": "https://www.youtube.com/post/UgkxABC",
                "text": "hello",
                "images": ["https://img/1.jpg"],
                "links": ["https://example.com"],
                "is_members": true,
                "relative_date": "2 days ago",
                "num_comments": "12",
                "num_thumbs_up": "7.3K",
                "poll": {"choices": ["a", "b"]},
                "when_archived": "2024-05-31T10:00:00+00:00"
            }"#,
        );
        let post = build(record);

        assert_eq!(post.post_id, "UgkxABC");
        assert!(post.is_members);
        assert_eq!(post.comment_count, "12");
        assert_eq!(post.thumbs_up_count, "7.3K");
        assert!(post.has_poll());
        assert!(post.has_images());
        assert_eq!(
            post.estimated_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 30, 0, 0, 0).unwrap())
        );
        assert!(post.archived_time().is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let post = build(parse("{}"));

        assert_eq!(post.post_id, "dir_id");
        assert_eq!(post.text, "");
        assert!(post.image_urls.is_empty());
        assert!(!post.is_members);
        assert_eq!(post.comment_count, "0");
        assert_eq!(post.thumbs_up_count, "0");
        assert!(post.poll.is_none());
        assert!(post.estimated_date.is_none());
    }

    #[test]
    fn test_nulls_default() {
        let post = build(parse(
            r#"{"text": null, "images": null, "is_members": null, "num_comments": null, "poll": null}"#,
        ));
        assert_eq!(post.text, "");
        assert!(!post.is_members);
        assert_eq!(post.comment_count, "0");
        assert!(!post.has_poll());
    }

    #[test]
    fn test_approximate_comment_fallback() {
        let post = build(parse(r#"{"approximate_num_comments": "40"}"#));
        assert_eq!(post.comment_count, "40");

        let post = build(parse(
            r#"{"num_comments": "41", "approximate_num_comments": "40"}"#,
        ));
        assert_eq!(post.comment_count, "41");
    }

    #[test]
    fn test_numeric_counts_kept_as_text() {
        let post = build(parse(r#"{"num_comments": 15, "num_thumbs_up": 3}"#));
        assert_eq!(post.comment_count, "15");
        assert_eq!(post.thumbs_up_count, "3");
    }

    #[test]
    fn test_membership_flag_variants() {
        assert!(parse(r#"{"is_members": "true"}"#).is_members);
        assert!(parse(r#"{"is_members": "Yes"}"#).is_members);
        assert!(parse(r#"{"is_members": 1}"#).is_members);
        assert!(parse(r#"{"is_members": "1"}"#).is_members);
        assert!(!parse(r#"{"is_members": "0"}"#).is_members);
        assert!(!parse(r#"{"is_members": "false"}"#).is_members);
        assert!(!parse(r#"{"is_members": 0}"#).is_members);
        assert!(!parse(r#"{"is_members": {}}"#).is_members);
    }
}
