//! Persistence collaborator seam and the in-memory adapter.
//!
//! Saving is whole-page and idempotent: saving the same snapshot twice has
//! the same effect as saving it once. Adapters also ignore snapshots older
//! than the one they hold, since saves from concurrent edits may land out of
//! order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use pagecraft_store::PageSnapshot;
use pagecraft_types::PageId;

/// Saving or loading a page failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("persistence backend failed: {0}")]
    Backend(String),

    #[error("page serialization failed: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for SaveError {
    fn from(err: rusqlite::Error) -> Self {
        SaveError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(err: serde_json::Error) -> Self {
        SaveError::Serialization(err.to_string())
    }
}

/// Stores and retrieves whole pages.
#[async_trait]
pub trait PagePersistence: Send + Sync {
    /// Persist a snapshot of the page.
    async fn save(&self, snapshot: &PageSnapshot) -> Result<(), SaveError>;

    /// Load the last saved snapshot of a page, if any.
    async fn load(&self, page_id: PageId) -> Result<Option<PageSnapshot>, SaveError>;
}

/// Keeps saved pages in memory.
///
/// Failures can be injected with [`fail_next`](Self::fail_next).
#[derive(Default)]
pub struct MemoryPersistence {
    pages: Mutex<HashMap<PageId, PageSnapshot>>,
    failures: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` saves fail with a backend error.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The snapshot currently held for a page.
    pub fn saved(&self, page_id: PageId) -> Option<PageSnapshot> {
        self.pages.lock().get(&page_id).cloned()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PagePersistence for MemoryPersistence {
    async fn save(&self, snapshot: &PageSnapshot) -> Result<(), SaveError> {
        if self.take_failure() {
            return Err(SaveError::Backend("injected failure".to_string()));
        }

        let mut pages = self.pages.lock();
        let newer = pages
            .get(&snapshot.page_id)
            .is_none_or(|held| held.revision <= snapshot.revision);
        if newer {
            pages.insert(snapshot.page_id, snapshot.clone());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, page_id: PageId) -> Result<Option<PageSnapshot>, SaveError> {
        Ok(self.saved(page_id))
    }
}
