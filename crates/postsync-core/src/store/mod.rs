//! Local persistence boundary for the post feed

mod memory;

pub use memory::MemoryPostStore;

use crate::error::Result;
use crate::models::{LocalPostRecord, PostId};

/// Trait for post snapshot storage operations (async)
///
/// Rows are keyed by post id. `fetch_all` must return rows in a stable order
/// for a given store state; implementations here use insertion order.
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Replace the whole snapshot: delete every row, then insert `records`
    async fn replace_all(&self, records: &[LocalPostRecord]) -> Result<()>;

    /// Insert a row or update the existing row with the same id
    async fn upsert_one(&self, record: &LocalPostRecord) -> Result<()>;

    /// Update the like flag of an existing row
    ///
    /// Returns `false` when no row with `id` exists.
    async fn set_liked(&self, id: PostId, is_liked: bool) -> Result<bool>;

    /// Read the full snapshot
    async fn fetch_all(&self) -> Result<Vec<LocalPostRecord>>;
}
