//! Membership-status restoration.
//!
//! Re-running the archiver against the public posts tab rewrites records of
//! member-only posts with `is_members = false`. Ids captured before the run
//! are used to flip those posts back. Status only ever moves to member-only.

use std::collections::HashSet;

use crate::models::Post;
use crate::storage::PostStore;

/// A record that could not be rewritten.
#[derive(Debug, Clone)]
pub struct MembershipFailure {
    pub post_id: String,
    pub reason: String,
}

/// Result of a restoration pass.
#[derive(Debug, Clone, Default)]
pub struct MembershipReport {
    /// Posts whose status was corrected and persisted
    pub restored: Vec<String>,
    /// Posts corrected in memory whose record could not be written
    pub failures: Vec<MembershipFailure>,
}

impl MembershipReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Set `is_members` on every post whose id is in `member_ids`.
///
/// Returns the indices of posts that changed.
pub fn apply_member_flags(posts: &mut [Post], member_ids: &HashSet<String>) -> Vec<usize> {
    let mut changed = Vec::new();
    for (idx, post) in posts.iter_mut().enumerate() {
        if !post.is_members && member_ids.contains(&post.post_id) {
            post.is_members = true;
            changed.push(idx);
        }
    }
    changed
}

/// Restore member-only status and persist each correction.
pub async fn restore_member_status(
    store: &dyn PostStore,
    posts: &mut [Post],
    member_ids: &HashSet<String>,
) -> MembershipReport {
    let mut report = MembershipReport::default();
    if member_ids.is_empty() {
        return report;
    }

    for idx in apply_member_flags(posts, member_ids) {
        let post = &posts[idx];
        match store.mark_member(post).await {
            Ok(()) => {
                log::debug!("Restored member status for {}", post.post_id);
                report.restored.push(post.post_id.clone());
            }
            Err(e) => {
                log::warn!("Failed to persist member status for {}: {}", post.post_id, e);
                report.failures.push(MembershipFailure {
                    post_id: post.post_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !report.restored.is_empty() {
        log::info!("Restored member status for {} posts", report.restored.len());
    }
    report
}
