//! Shared page document with change events.
//!
//! Wraps a [`BlockStore`] so it can be shared between the toolbar, the edit
//! pipeline's background tasks and any view that re-renders on change.
//!
//! # Concurrency Model
//!
//! - one `parking_lot::RwLock` around the store, held for exactly one store
//!   call and never across an `.await`
//! - events go out on a `tokio::sync::broadcast` channel after the lock is
//!   released

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use pagecraft_store::{BlockStore, PageSnapshot, Position, Result as StoreResult};
use pagecraft_types::{Block, BlockContent, BlockId, NewBlock, PageId, Provenance};

/// Events broadcast when the page changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageEvent {
    BlockInserted {
        block_id: BlockId,
        position: usize,
        ai_generated: bool,
    },
    BlockMoved {
        block_id: BlockId,
        position: usize,
    },
    BlockRemoved {
        block_id: BlockId,
    },
    /// Content replaced; `version` is the new version.
    BlockUpdated {
        block_id: BlockId,
        version: u64,
        ai_generated: bool,
    },
    /// A generation call for this block started.
    EditStarted {
        block_id: BlockId,
    },
    /// A generation call ended without changing the block.
    EditFailed {
        block_id: BlockId,
        reason: String,
    },
    Saved {
        revision: u64,
    },
    SaveFailed {
        revision: u64,
        error: String,
    },
}

/// A page shared across tasks.
pub struct PageDocument {
    store: RwLock<BlockStore>,
    event_tx: broadcast::Sender<PageEvent>,
    /// Highest revision known to be persisted.
    saved_revision: AtomicU64,
}

/// Shared reference to a page document.
pub type SharedPageDocument = Arc<PageDocument>;

impl PageDocument {
    /// Create an empty page.
    pub fn new(page_id: PageId, event_capacity: usize) -> Self {
        Self::from_store(BlockStore::new(page_id), event_capacity)
    }

    /// Wrap an existing store; its current revision counts as saved.
    pub fn from_store(store: BlockStore, event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        let saved_revision = AtomicU64::new(store.revision());
        Self {
            store: RwLock::new(store),
            event_tx,
            saved_revision,
        }
    }

    /// Wrap in an `Arc`.
    pub fn shared(self) -> SharedPageDocument {
        Arc::new(self)
    }

    /// Subscribe to page events.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn publish(&self, event: PageEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn page_id(&self) -> PageId {
        self.store.read().page_id()
    }

    pub fn list(&self) -> Vec<Block> {
        self.store.read().list()
    }

    pub fn get(&self, id: &BlockId) -> StoreResult<Block> {
        self.store.read().get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.store.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub fn position_of(&self, id: &BlockId) -> StoreResult<usize> {
        self.store.read().position_of(id)
    }

    pub fn revision(&self) -> u64 {
        self.store.read().revision()
    }

    pub fn snapshot(&self) -> PageSnapshot {
        self.store.read().snapshot()
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    /// Whether the page has changes that were not persisted.
    pub fn is_dirty(&self) -> bool {
        self.revision() > self.saved_revision.load(Ordering::SeqCst)
    }

    /// Record that `revision` was persisted.
    pub fn mark_saved(&self, revision: u64) {
        self.saved_revision.fetch_max(revision, Ordering::SeqCst);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn insert(&self, block: NewBlock, position: Position) -> StoreResult<Block> {
        let (block, index) = {
            let mut store = self.store.write();
            let block = store.insert(block, position)?;
            let index = store.position_of(&block.id)?;
            (block, index)
        };
        self.publish(PageEvent::BlockInserted {
            block_id: block.id,
            position: index,
            ai_generated: block.ai_generated,
        });
        Ok(block)
    }

    pub fn insert_raw(
        &self,
        type_name: &str,
        payload: serde_json::Value,
        position: Position,
    ) -> StoreResult<Block> {
        let (block, index) = {
            let mut store = self.store.write();
            let block = store.insert_raw(type_name, payload, position)?;
            let index = store.position_of(&block.id)?;
            (block, index)
        };
        self.publish(PageEvent::BlockInserted {
            block_id: block.id,
            position: index,
            ai_generated: block.ai_generated,
        });
        Ok(block)
    }

    pub fn move_block(&self, id: &BlockId, position: Position) -> StoreResult<usize> {
        let index = {
            let mut store = self.store.write();
            store.move_block(id, position)?;
            store.position_of(id)?
        };
        self.publish(PageEvent::BlockMoved {
            block_id: *id,
            position: index,
        });
        Ok(index)
    }

    pub fn duplicate(&self, id: &BlockId) -> StoreResult<Block> {
        let (copy, index) = {
            let mut store = self.store.write();
            let copy = store.duplicate(id)?;
            let index = store.position_of(&copy.id)?;
            (copy, index)
        };
        self.publish(PageEvent::BlockInserted {
            block_id: copy.id,
            position: index,
            ai_generated: copy.ai_generated,
        });
        Ok(copy)
    }

    /// Removal is a guarded action; sessions go through
    /// [`Editor::remove_block`](crate::Editor::remove_block) or the toolbar.
    pub(crate) fn remove(&self, id: &BlockId) -> StoreResult<Block> {
        let block = self.store.write().remove(id)?;
        self.publish(PageEvent::BlockRemoved { block_id: *id });
        Ok(block)
    }

    pub fn apply_content_patch(
        &self,
        id: &BlockId,
        content: BlockContent,
        expected_version: u64,
        provenance: Provenance,
    ) -> StoreResult<Block> {
        let block =
            self.store
                .write()
                .apply_content_patch_as(id, content, expected_version, provenance)?;
        self.publish(PageEvent::BlockUpdated {
            block_id: block.id,
            version: block.version,
            ai_generated: block.ai_generated,
        });
        Ok(block)
    }
}
