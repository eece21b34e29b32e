//! In-process `LocalStore` for tests and throwaway sessions

use tokio::sync::Mutex;

use super::LocalStore;
use crate::error::Result;
use crate::models::{LocalPostRecord, PostId};

/// A `LocalStore` kept entirely in memory, preserving insertion order
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    rows: Mutex<Vec<LocalPostRecord>>,
}

impl MemoryPostStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `records`
    pub fn with_records(records: Vec<LocalPostRecord>) -> Self {
        Self {
            rows: Mutex::new(records),
        }
    }

    /// Stored like flag for `id`, if a row exists
    pub async fn liked(&self, id: PostId) -> Option<bool> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.is_liked)
    }
}

impl LocalStore for MemoryPostStore {
    async fn replace_all(&self, records: &[LocalPostRecord]) -> Result<()> {
        let mut rows = self.rows.lock().await;
        rows.clear();
        for record in records {
            match rows.iter_mut().find(|row| row.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => rows.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn upsert_one(&self, record: &LocalPostRecord) -> Result<()> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|row| row.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => rows.push(record.clone()),
        }
        Ok(())
    }

    async fn set_liked(&self, id: PostId, is_liked: bool) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(false);
        };
        row.is_liked = is_liked;
        Ok(true)
    }

    async fn fetch_all(&self) -> Result<Vec<LocalPostRecord>> {
        Ok(self.rows.lock().await.clone())
    }
}
