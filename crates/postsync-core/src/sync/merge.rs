//! Reconciles a fetched remote page with locally held like flags.

use std::collections::{HashMap, HashSet};

use crate::models::{LocalPostRecord, Post, PostId};

/// Like flags keyed by post id
pub type LikeIndex = HashMap<PostId, bool>;

/// Index the like flags of a persisted snapshot.
pub fn saved_likes(snapshot: &[LocalPostRecord]) -> LikeIndex {
    snapshot
        .iter()
        .map(|record| (record.id, record.is_liked))
        .collect()
}

/// Merge remote posts with known like state.
///
/// The result follows `remote` order and contains only remote ids. Each post
/// takes its flag from `unsynced` (toggles the store has not acknowledged)
/// first, then `saved`, else `false`. An id repeated within `remote` keeps its
/// first occurrence.
pub fn merge_with_saved_likes(
    remote: Vec<Post>,
    saved: &LikeIndex,
    unsynced: &LikeIndex,
) -> Vec<Post> {
    let mut seen = HashSet::with_capacity(remote.len());
    remote
        .into_iter()
        .filter(|post| seen.insert(post.id))
        .map(|mut post| {
            let liked = unsynced
                .get(&post.id)
                .or_else(|| saved.get(&post.id))
                .copied()
                .unwrap_or(false);
            post.is_liked = Some(liked);
            post
        })
        .collect()
}
