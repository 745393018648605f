//! Per-page write serialization.
//!
//! Every operation that mutates a page or anything it owns holds the page's
//! lock from its first read until its commit returned.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct PageLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, page_id: Uuid) -> OwnedMutexGuard<()> {
        // The map shard guard must be released before awaiting the mutex.
        let lock = self.inner.entry(page_id).or_default().value().clone();
        lock.lock_owned().await
    }

    /// Locks several pages in ascending id order so that concurrent
    /// multi-page writers cannot deadlock.
    pub async fn acquire_many(&self, page_ids: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = page_ids.to_vec();
        ids.sort();
        ids.dedup();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    /// Drops the entry of a deleted page. Holders of the old mutex keep it.
    pub fn forget(&self, page_id: Uuid) {
        self.inner.remove(&page_id);
    }
}
