//! Read-only classification and filtering of loaded posts.

use std::ops::{Bound, RangeBounds};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Post;

/// Split posts into `(member_only, public)`, preserving order.
pub fn partition_by_membership(posts: &[Post]) -> (Vec<&Post>, Vec<&Post>) {
    posts.iter().partition(|p| p.is_members)
}

/// Keep member-only posts, public posts, or both.
pub fn filter_members(posts: &[Post], include_members: bool, include_public: bool) -> Vec<&Post> {
    posts
        .iter()
        .filter(|p| if p.is_members { include_members } else { include_public })
        .collect()
}

/// A range over estimated dates. Each bound may be inclusive, exclusive or open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Bound<DateTime<Utc>>,
    pub end: Bound<DateTime<Utc>>,
}

impl DateRange {
    /// Range with no bounds on either side.
    pub fn unbounded() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Inclusive range from optional endpoints.
    pub fn inclusive(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start: start.map_or(Bound::Unbounded, Bound::Included),
            end: end.map_or(Bound::Unbounded, Bound::Included),
        }
    }

    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        RangeBounds::contains(self, date)
    }
}

impl RangeBounds<DateTime<Utc>> for DateRange {
    fn start_bound(&self) -> Bound<&DateTime<Utc>> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&DateTime<Utc>> {
        self.end.as_ref()
    }
}

/// Posts whose estimated date falls in `range`.
///
/// Undated posts are always kept: a missing date is not evidence against the
/// range.
pub fn filter_by_date_range<'a>(posts: &'a [Post], range: &DateRange) -> Vec<&'a Post> {
    posts
        .iter()
        .filter(|p| p.estimated_date.as_ref().is_none_or(|d| range.contains(d)))
        .collect()
}

/// Case-insensitive substring search over post text.
pub fn search<'a>(posts: &'a [Post], query: &str) -> Vec<&'a Post> {
    let needle = query.to_lowercase();
    posts
        .iter()
        .filter(|p| p.text.to_lowercase().contains(&needle))
        .collect()
}

pub fn with_polls(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|p| p.has_poll()).collect()
}

pub fn with_images(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|p| p.has_images()).collect()
}

/// Aggregate counts over a set of posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostStatistics {
    pub total: usize,
    pub members_only: usize,
    pub public: usize,
    pub with_images: usize,
    pub with_polls: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Compute statistics. Date extremes ignore undated posts.
pub fn statistics<'a, I>(posts: I) -> PostStatistics
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut stats = PostStatistics::default();
    for post in posts {
        stats.total += 1;
        if post.is_members {
            stats.members_only += 1;
        } else {
            stats.public += 1;
        }
        if post.has_images() {
            stats.with_images += 1;
        }
        if post.has_poll() {
            stats.with_polls += 1;
        }
        if let Some(date) = post.estimated_date {
            stats.oldest = Some(stats.oldest.map_or(date, |d| d.min(date)));
            stats.newest = Some(stats.newest.map_or(date, |d| d.max(date)));
        }
    }
    stats
}
