//! Block store: the ordered block collection of one page.
//!
//! Blocks live in a map keyed by ID; document order comes from each block's
//! fractional [`OrderKey`]. Inserting or moving a block computes a key between
//! its new neighbours, so no other block's stored key ever changes.
//!
//! Two counters are kept apart:
//!
//! - `Block::version`: per-block content version, for optimistic concurrency
//! - `BlockStore::revision`: bumped on any successful mutation of the page

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};
use pagecraft_types::{
    Block, BlockContent, BlockId, NewBlock, OrderKey, PageId, Provenance, now_millis,
};

/// Where to put a block in the page's order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// Index in the ordered list; 0 = first. Indexes past the end mean `End`.
    At(usize),
    /// After every other block.
    End,
}

impl Position {
    /// The first slot.
    pub const FIRST: Position = Position::At(0);
}

/// The blocks of one page, with identity and order invariants.
#[derive(Debug)]
pub struct BlockStore {
    /// Page this store belongs to.
    page_id: PageId,

    /// Live blocks indexed by ID.
    blocks: HashMap<BlockId, Block>,

    /// IDs of removed blocks. Never handed out again.
    retired: HashSet<BlockId>,

    /// Page revision (bumped on any mutation).
    revision: u64,
}

impl BlockStore {
    /// Create a new empty store.
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            blocks: HashMap::new(),
            retired: HashSet::new(),
            revision: 0,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the current page revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Get a copy of a block.
    pub fn get(&self, id: &BlockId) -> Result<Block> {
        self.blocks.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    /// Blocks in document order (by order key, ID as tiebreak).
    pub fn list(&self) -> Vec<Block> {
        self.ordered().into_iter().cloned().collect()
    }

    /// Block IDs in document order.
    pub fn ids(&self) -> Vec<BlockId> {
        self.ordered().into_iter().map(|b| b.id).collect()
    }

    /// Index of a block in document order.
    pub fn position_of(&self, id: &BlockId) -> Result<usize> {
        self.ordered()
            .iter()
            .position(|b| b.id == *id)
            .ok_or(StoreError::NotFound(*id))
    }

    fn ordered(&self) -> Vec<&Block> {
        let mut ordered: Vec<&Block> = self.blocks.values().collect();
        ordered.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        ordered
    }

    // =========================================================================
    // Order key calculation
    // =========================================================================

    /// Compute an order key for `position`, ignoring `exclude` (the block
    /// being moved, if any).
    fn key_for(&self, position: Position, exclude: Option<&BlockId>) -> OrderKey {
        let ordered: Vec<&OrderKey> = self
            .ordered()
            .into_iter()
            .filter(|b| Some(&b.id) != exclude)
            .map(|b| &b.order)
            .collect();

        let idx = match position {
            Position::At(i) => i.min(ordered.len()),
            Position::End => ordered.len(),
        };
        let prev = idx.checked_sub(1).map(|i| ordered[i]);
        let next = ordered.get(idx).copied();
        OrderKey::between(prev, next)
    }

    // =========================================================================
    // Block Operations
    // =========================================================================

    /// Insert a new block at `position`.
    ///
    /// Assigns a fresh ID unless the caller supplied one. Fails with
    /// `Validation` if the content breaks its kind's schema.
    pub fn insert(&mut self, new: NewBlock, position: Position) -> Result<Block> {
        let id = new.id.unwrap_or_default();
        if self.blocks.contains_key(&id) || self.retired.contains(&id) {
            return Err(StoreError::DuplicateBlock(id));
        }
        new.content.validate()?;

        let now = now_millis();
        let block = Block {
            id,
            order: self.key_for(position, None),
            content: new.content,
            ai_generated: new.ai_generated,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(block = %id.short(), kind = %block.kind(), order = %block.order, "insert block");

        self.blocks.insert(id, block.clone());
        self.revision += 1;
        Ok(block)
    }

    /// Insert a block from a raw JSON payload labelled with a type name.
    ///
    /// Unknown type names are stored as `generic` with the payload verbatim.
    pub fn insert_raw(
        &mut self,
        type_name: &str,
        payload: serde_json::Value,
        position: Position,
    ) -> Result<Block> {
        let content = BlockContent::from_raw(type_name, payload)?;
        self.insert(NewBlock::new(content), position)
    }

    /// Move a block to a new position.
    ///
    /// `position` indexes the list with the moved block taken out. Only the
    /// moved block's order key changes.
    pub fn move_block(&mut self, id: &BlockId, position: Position) -> Result<()> {
        if !self.blocks.contains_key(id) {
            return Err(StoreError::NotFound(*id));
        }
        let order = self.key_for(position, Some(id));
        tracing::debug!(block = %id.short(), order = %order, "move block");

        if let Some(block) = self.blocks.get_mut(id) {
            block.order = order;
        }
        self.revision += 1;
        Ok(())
    }

    /// Copy a block (content, kind, provenance) to a fresh ID right after it.
    pub fn duplicate(&mut self, id: &BlockId) -> Result<Block> {
        let source = self.get(id)?;
        let after = self.position_of(id)? + 1;

        let now = now_millis();
        let copy = Block {
            id: BlockId::new(),
            order: self.key_for(Position::At(after), None),
            content: source.content,
            ai_generated: source.ai_generated,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(source = %id.short(), copy = %copy.id.short(), "duplicate block");

        self.blocks.insert(copy.id, copy.clone());
        self.revision += 1;
        Ok(copy)
    }

    /// Remove a block.
    ///
    /// Not idempotent: removing an absent block fails with `NotFound` so
    /// callers can detect stale references.
    pub fn remove(&mut self, id: &BlockId) -> Result<Block> {
        let block = self.blocks.remove(id).ok_or(StoreError::NotFound(*id))?;
        self.retired.insert(*id);
        self.revision += 1;
        tracing::debug!(block = %id.short(), "remove block");
        Ok(block)
    }

    // =========================================================================
    // Content Mutation
    // =========================================================================

    /// Replace a block's content if it is still at `expected_version`.
    ///
    /// A user patch clears the `ai_generated` flag.
    pub fn apply_content_patch(
        &mut self,
        id: &BlockId,
        content: BlockContent,
        expected_version: u64,
    ) -> Result<Block> {
        self.apply_content_patch_as(id, content, expected_version, Provenance::User)
    }

    /// Replace a block's content, recording who produced it.
    ///
    /// Fails with `VersionConflict` if the block moved past
    /// `expected_version`, and with `Validation` if the content is not valid
    /// for the block's kind. On success the version grows by exactly one.
    pub fn apply_content_patch_as(
        &mut self,
        id: &BlockId,
        content: BlockContent,
        expected_version: u64,
        provenance: Provenance,
    ) -> Result<Block> {
        let block = self.blocks.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        if block.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: *id,
                expected: expected_version,
                actual: block.version,
            });
        }
        content.validate_for(block.kind())?;

        block.content = content;
        block.version += 1;
        block.ai_generated = provenance.is_generated();
        block.updated_at = now_millis();
        tracing::debug!(block = %id.short(), version = block.version, ?provenance, "patch content");

        let patched = block.clone();
        self.revision += 1;
        Ok(patched)
    }

    // =========================================================================
    // Snapshot / Restore
    // =========================================================================

    /// Create a snapshot of the entire page.
    pub fn snapshot(&self) -> PageSnapshot {
        let mut retired: Vec<BlockId> = self.retired.iter().copied().collect();
        retired.sort();
        PageSnapshot {
            page_id: self.page_id,
            revision: self.revision,
            blocks: self.list(),
            retired,
        }
    }

    /// Restore from a snapshot, re-checking the page invariants.
    pub fn from_snapshot(snapshot: PageSnapshot) -> Result<Self> {
        let mut store = Self::new(snapshot.page_id);
        store.revision = snapshot.revision;
        store.retired = snapshot.retired.into_iter().collect();

        for block in snapshot.blocks {
            if store.blocks.contains_key(&block.id) || store.retired.contains(&block.id) {
                return Err(StoreError::DuplicateBlock(block.id));
            }
            block.content.validate()?;
            store.blocks.insert(block.id, block);
        }

        let ordered = store.ordered();
        for pair in ordered.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(StoreError::OrderTie {
                    first: pair[0].id,
                    second: pair[1].id,
                    key: pair[0].order.clone(),
                });
            }
        }

        Ok(store)
    }
}

/// Snapshot of a page (serializable).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page ID.
    pub page_id: PageId,
    /// Page revision at snapshot time.
    pub revision: u64,
    /// Blocks in order.
    pub blocks: Vec<Block>,
    /// IDs of removed blocks, which may never be reused.
    #[serde(default)]
    pub retired: Vec<BlockId>,
}

impl PageSnapshot {
    /// Find a block by ID.
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == *id)
    }
}

// =========================================================================
// Tests
// =========================================================================
