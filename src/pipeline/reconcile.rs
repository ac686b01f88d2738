//! Order reconciliation across archive runs.
//!
//! Produces the canonical, gap-free ranking of posts (0 = newest). A freshly
//! observed display order is authoritative for the posts it names; posts it
//! does not name keep their previous rank; posts with neither are dropped from
//! the table. Without any fresh order the ranking falls back to the evidence
//! stored in the records themselves.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{OrderEntry, OrderTable, Post};

/// Which evidence produced a reconciled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// A fresh display order was merged with the previous table
    Fresh,
    /// No fresh order; ranks derived from archive timestamps and dates
    Fallback,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub table: OrderTable,
    pub mode: OrderMode,
    /// Current posts that received no rank
    pub dropped: Vec<String>,
}

/// Rank lookup for a fresh order. The first occurrence of an id wins.
pub fn fresh_ranks(fresh_order: &[String]) -> HashMap<&str, usize> {
    let mut ranks = HashMap::with_capacity(fresh_order.len());
    for (idx, id) in fresh_order.iter().enumerate() {
        ranks.entry(id.as_str()).or_insert(idx);
    }
    ranks
}

/// Merge fresh and prior ranks into a dense ordering over `post_ids`.
///
/// Each id takes its fresh rank if it has one, else its prior rank, else it is
/// left out. Ranks are then sorted ascending (ties keep input order) and
/// renumbered `0..N`. Repeated ids in `post_ids` are ranked once.
pub fn merge_ranks(
    post_ids: &[&str],
    fresh: &HashMap<&str, usize>,
    prior: &HashMap<&str, usize>,
) -> Vec<OrderEntry> {
    let mut seen = HashSet::with_capacity(post_ids.len());
    let mut provisional: Vec<(usize, &str)> = post_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| {
            fresh
                .get(id)
                .or_else(|| prior.get(id))
                .map(|&rank| (rank, id))
        })
        .collect();

    provisional.sort_by_key(|&(rank, _)| rank);

    provisional
        .into_iter()
        .enumerate()
        .map(|(order, (_, id))| OrderEntry::new(id, order))
        .collect()
}

/// Rank every post from the evidence in its own record.
///
/// Posts with an archive timestamp come first, earliest first, because the
/// feed is scraped top to bottom. Posts with only an estimated date follow,
/// newest first. Everything else keeps input order at the end.
pub fn fallback_order(posts: &[Post]) -> Vec<OrderEntry> {
    let mut seen = HashSet::with_capacity(posts.len());
    let mut archived: Vec<(DateTime<Utc>, &str)> = Vec::new();
    let mut estimated: Vec<(DateTime<Utc>, &str)> = Vec::new();
    let mut residual: Vec<&str> = Vec::new();

    for post in posts {
        let id = post.post_id.as_str();
        if !seen.insert(id) {
            continue;
        }
        if let Some(ts) = post.archived_time() {
            archived.push((ts, id));
        } else if let Some(date) = post.estimated_date {
            estimated.push((date, id));
        } else {
            residual.push(id);
        }
    }

    archived.sort_by_key(|&(ts, _)| ts);
    estimated.sort_by_key(|&(date, _)| Reverse(date));

    archived
        .into_iter()
        .map(|(_, id)| id)
        .chain(estimated.into_iter().map(|(_, id)| id))
        .chain(residual)
        .enumerate()
        .map(|(order, id)| OrderEntry::new(id, order))
        .collect()
}

/// Reconcile the order of `posts` against a fresh order and the previous table.
///
/// An absent or empty fresh order selects the fallback ranking.
pub fn reconcile_order(
    posts: &[Post],
    fresh_order: Option<&[String]>,
    previous: Option<&OrderTable>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let fresh_order = fresh_order.filter(|order| !order.is_empty());

    let (entries, mode) = match fresh_order {
        Some(order) => {
            let ids: Vec<&str> = posts.iter().map(|p| p.post_id.as_str()).collect();
            let fresh = fresh_ranks(order);
            let prior = previous.map(OrderTable::ranks).unwrap_or_default();
            (merge_ranks(&ids, &fresh, &prior), OrderMode::Fresh)
        }
        None => (fallback_order(posts), OrderMode::Fallback),
    };

    let ranked: HashSet<&str> = entries.iter().map(|e| e.post_id.as_str()).collect();
    let mut dropped: Vec<String> = Vec::new();
    for post in posts {
        if !ranked.contains(post.post_id.as_str()) && !dropped.contains(&post.post_id) {
            dropped.push(post.post_id.clone());
        }
    }

    Reconciliation {
        table: OrderTable::new(entries, now),
        mode,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn make_post(id: &str) -> Post {
        Post {
            post_id: id.to_string(),
            url: format!("https://www.youtube.com/post/{id}"),
            text: String::new(),
            image_urls: Vec::new(),
            local_images: Vec::new(),
            link_urls: Vec::new(),
            is_members: false,
            relative_date: String::new(),
            estimated_date: None,
            comment_count: "0".into(),
            thumbs_up_count: "0".into(),
            poll: None,
            archived_at: String::new(),
            record_path: PathBuf::new(),
        }
    }

    fn archived(id: &str, at: DateTime<Utc>) -> Post {
        Post {
            archived_at: at.to_rfc3339(),
            ..make_post(id)
        }
    }

    fn dated(id: &str, date: DateTime<Utc>) -> Post {
        Post {
            estimated_date: Some(date),
            ..make_post(id)
        }
    }

    fn order_of(entries: &[OrderEntry]) -> Vec<(&str, usize)> {
        entries
            .iter()
            .map(|e| (e.post_id.as_str(), e.order))
            .collect()
    }

    #[test]
    fn test_merge_literal_maps() {
        let fresh = HashMap::from([("B", 0), ("A", 1)]);
        let prior = HashMap::from([("A", 0), ("C", 5)]);

        let entries = merge_ranks(&["A", "B", "C"], &fresh, &prior);
        assert_eq!(order_of(&entries), vec![("B", 0), ("A", 1), ("C", 2)]);
    }

    #[test]
    fn test_merge_drops_unranked() {
        let fresh = HashMap::from([("A", 0)]);
        let prior = HashMap::from([("B", 3)]);

        let entries = merge_ranks(&["A", "B", "X"], &fresh, &prior);
        assert_eq!(order_of(&entries), vec![("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_merge_ties_keep_input_order() {
        let fresh = HashMap::from([("N", 0)]);
        let prior = HashMap::from([("P", 0)]);

        let entries = merge_ranks(&["P", "N"], &fresh, &prior);
        assert_eq!(order_of(&entries), vec![("P", 0), ("N", 1)]);

        let entries = merge_ranks(&["N", "P"], &fresh, &prior);
        assert_eq!(order_of(&entries), vec![("N", 0), ("P", 1)]);
    }

    #[test]
    fn test_merge_ignores_duplicate_ids() {
        let fresh = HashMap::from([("A", 0), ("B", 1)]);
        let entries = merge_ranks(&["A", "B", "A"], &fresh, &HashMap::new());
        assert_eq!(order_of(&entries), vec![("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_fresh_ranks_first_occurrence_wins() {
        let order = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        let ranks = fresh_ranks(&order);
        assert_eq!(ranks.get("A"), Some(&0));
        assert_eq!(ranks.get("B"), Some(&1));
    }

    #[test]
    fn test_reconcile_fresh_wins_over_previous() {
        let posts = vec![make_post("A"), make_post("B"), make_post("C")];
        let previous = OrderTable::new(
            vec![OrderEntry::new("A", 0), OrderEntry::new("C", 5)],
            now(),
        );
        let fresh = vec!["B".to_string(), "A".to_string()];

        let result = reconcile_order(&posts, Some(&fresh), Some(&previous), now());

        assert_eq!(result.mode, OrderMode::Fresh);
        assert_eq!(
            order_of(&result.table.entries),
            vec![("B", 0), ("A", 1), ("C", 2)]
        );
        assert!(result.table.is_dense());
        assert!(result.dropped.is_empty());
        assert_eq!(result.table.updated_at, now());
    }

    #[test]
    fn test_reconcile_ignores_fresh_ids_without_records() {
        let posts = vec![make_post("A")];
        let fresh = vec!["GONE".to_string(), "A".to_string()];

        let result = reconcile_order(&posts, Some(&fresh), None, now());
        assert_eq!(order_of(&result.table.entries), vec![("A", 0)]);
    }

    #[test]
    fn test_reconcile_reports_dropped() {
        let posts = vec![make_post("A"), make_post("Z")];
        let fresh = vec!["A".to_string()];

        let result = reconcile_order(&posts, Some(&fresh), None, now());
        assert_eq!(order_of(&result.table.entries), vec![("A", 0)]);
        assert_eq!(result.dropped, vec!["Z".to_string()]);
    }

    #[test]
    fn test_empty_fresh_order_falls_back() {
        let t0 = now();
        let posts = vec![
            archived("late", t0 + TimeDelta::seconds(1)),
            archived("early", t0),
        ];
        let previous = OrderTable::new(vec![OrderEntry::new("late", 0)], now());

        let result = reconcile_order(&posts, Some(&[]), Some(&previous), now());

        assert_eq!(result.mode, OrderMode::Fallback);
        assert_eq!(
            order_of(&result.table.entries),
            vec![("early", 0), ("late", 1)]
        );
    }

    #[test]
    fn test_fallback_groups() {
        let t0 = now();
        let posts = vec![
            make_post("bare1"),
            dated("old", t0 - TimeDelta::days(300)),
            archived("second", t0 + TimeDelta::seconds(5)),
            dated("recent", t0 - TimeDelta::days(2)),
            make_post("bare2"),
            archived("first", t0),
        ];

        let entries = fallback_order(&posts);
        assert_eq!(
            order_of(&entries),
            vec![
                ("first", 0),
                ("second", 1),
                ("recent", 2),
                ("old", 3),
                ("bare1", 4),
                ("bare2", 5),
            ]
        );
    }

    #[test]
    fn test_fallback_unparseable_timestamp_uses_date() {
        let post = Post {
            archived_at: "sometime".into(),
            ..dated("x", now())
        };
        let entries = fallback_order(&[make_post("bare"), post]);
        assert_eq!(order_of(&entries), vec![("x", 0), ("bare", 1)]);
    }

    #[test]
    fn test_reconcile_empty_input() {
        let result = reconcile_order(&[], None, None, now());
        assert!(result.table.is_empty());
        assert!(result.dropped.is_empty());
    }
}
