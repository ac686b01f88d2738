//! Processed archive snapshot handed to the viewer exporter.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use crate::models::{ChannelInfo, OrderTable, Post};
use crate::pipeline::query::{self, PostStatistics};

/// Posts in display order with their partition and statistics.
#[derive(Debug, Clone)]
pub struct ProcessedSnapshot {
    /// All posts, newest first
    pub posts: Vec<Post>,
    pub statistics: PostStatistics,
    pub channel: Option<ChannelInfo>,
    pub archive_date: DateTime<Utc>,
}

impl ProcessedSnapshot {
    pub fn build(
        posts: Vec<Post>,
        table: Option<&OrderTable>,
        channel: Option<ChannelInfo>,
        archive_date: DateTime<Utc>,
    ) -> Self {
        let posts = canonical_order(posts, table);
        let statistics = query::statistics(&posts);
        Self {
            posts,
            statistics,
            channel,
            archive_date,
        }
    }

    /// Member-only posts in display order.
    pub fn member_posts(&self) -> Vec<&Post> {
        query::partition_by_membership(&self.posts).0
    }

    /// Public posts in display order.
    pub fn public_posts(&self) -> Vec<&Post> {
        query::partition_by_membership(&self.posts).1
    }
}

/// Order posts by table rank; posts missing from the table follow, newest
/// estimated date first and undated last.
pub fn canonical_order(posts: Vec<Post>, table: Option<&OrderTable>) -> Vec<Post> {
    let ranks = table.map(OrderTable::ranks).unwrap_or_default();

    let mut ranked: Vec<(usize, Post)> = Vec::new();
    let mut unranked: Vec<Post> = Vec::new();
    for post in posts {
        match ranks.get(post.post_id.as_str()) {
            Some(&rank) => ranked.push((rank, post)),
            None => unranked.push(post),
        }
    }

    ranked.sort_by_key(|(rank, _)| *rank);
    // None sorts below Some, so Reverse puts undated posts last
    unranked.sort_by_key(|p| Reverse(p.estimated_date));

    ranked
        .into_iter()
        .map(|(_, post)| post)
        .chain(unranked)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderEntry;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn make_post(id: &str, members: bool, date: Option<DateTime<Utc>>) -> Post {
        Post {
            post_id: id.to_string(),
            url: String::new(),
            text: String::new(),
            image_urls: Vec::new(),
            local_images: Vec::new(),
            link_urls: Vec::new(),
            is_members: members,
            relative_date: String::new(),
            estimated_date: date,
            comment_count: "0".into(),
            thumbs_up_count: "0".into(),
            poll: None,
            archived_at: String::new(),
            record_path: PathBuf::new(),
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.post_id.as_str()).collect()
    }

    #[test]
    fn test_table_order_then_dates() {
        let posts = vec![
            make_post("undated", false, None),
            make_post("old", false, Some(day(1))),
            make_post("ranked1", false, Some(day(1))),
            make_post("new", false, Some(day(20))),
            make_post("ranked0", false, None),
        ];
        let table = OrderTable::new(
            vec![OrderEntry::new("ranked0", 0), OrderEntry::new("ranked1", 1)],
            day(30),
        );

        let ordered = canonical_order(posts, Some(&table));
        assert_eq!(ids(&ordered), vec!["ranked0", "ranked1", "new", "old", "undated"]);
    }

    #[test]
    fn test_without_table_sorts_by_date() {
        let posts = vec![
            make_post("a", false, Some(day(2))),
            make_post("b", false, Some(day(5))),
            make_post("c", false, Some(day(2))),
        ];
        let ordered = canonical_order(posts, None);
        assert_eq!(ids(&ordered), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_snapshot_partition_and_stats() {
        let posts = vec![
            make_post("p", false, Some(day(3))),
            make_post("m", true, Some(day(4))),
        ];
        let snapshot = ProcessedSnapshot::build(posts, None, None, day(30));

        assert_eq!(snapshot.statistics.total, 2);
        assert_eq!(snapshot.member_posts().len(), 1);
        assert_eq!(snapshot.public_posts()[0].post_id, "p");
        assert_eq!(ids(&snapshot.posts), vec!["m", "p"]);
    }
}
