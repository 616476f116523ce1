//! Which block the toolbar is acting on.
//!
//! The selection is a lookup relation only: it stores an ID, never the block,
//! and re-checks the document whenever it is read.

use parking_lot::Mutex;

use pagecraft_types::{Block, BlockId};

use crate::document::SharedPageDocument;
use crate::error::{EditorError, Result};

pub struct SelectionController {
    document: SharedPageDocument,
    selected: Mutex<Option<BlockId>>,
}

impl SelectionController {
    pub fn new(document: SharedPageDocument) -> Self {
        Self {
            document,
            selected: Mutex::new(None),
        }
    }

    /// Target a block. Fails with `NotFound` if it is not on the page.
    pub fn select(&self, id: BlockId) -> Result<()> {
        if !self.document.contains(&id) {
            return Err(EditorError::NotFound(id));
        }
        *self.selected.lock() = Some(id);
        Ok(())
    }

    /// The selected block ID, if it still exists.
    ///
    /// A selection whose block was removed is cleared here.
    pub fn selected(&self) -> Option<BlockId> {
        let mut selected = self.selected.lock();
        if let Some(id) = *selected {
            if !self.document.contains(&id) {
                tracing::debug!(block = %id.short(), "selected block is gone, clearing selection");
                *selected = None;
            }
        }
        *selected
    }

    /// A fresh copy of the selected block.
    pub fn selected_block(&self) -> Option<Block> {
        self.selected().and_then(|id| self.document.get(&id).ok())
    }

    pub fn clear(&self) {
        *self.selected.lock() = None;
    }
}
