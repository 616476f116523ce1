//! Toolbar verbs acting on the selected block.
//!
//! Each verb is one store call or one orchestrator call, so a failure leaves
//! the page as it was.

use std::sync::Arc;

use pagecraft_store::Position;
use pagecraft_types::{Block, BlockContent, BlockId, NewBlock, Provenance};

use crate::auth::{GuardedAction, SessionAuthority};
use crate::document::SharedPageDocument;
use crate::error::{EditorError, Result};
use crate::orchestrator::{EditHandle, EditOrchestrator};
use crate::selection::SelectionController;

pub struct ToolbarCommands {
    document: SharedPageDocument,
    selection: Arc<SelectionController>,
    orchestrator: Arc<EditOrchestrator>,
    authority: Arc<dyn SessionAuthority>,
}

impl ToolbarCommands {
    pub fn new(
        document: SharedPageDocument,
        selection: Arc<SelectionController>,
        orchestrator: Arc<EditOrchestrator>,
        authority: Arc<dyn SessionAuthority>,
    ) -> Self {
        Self {
            document,
            selection,
            orchestrator,
            authority,
        }
    }

    fn current(&self) -> Result<BlockId> {
        self.selection.selected().ok_or(EditorError::NoSelection)
    }

    /// Select a block.
    pub fn select(&self, id: BlockId) -> Result<()> {
        self.selection.select(id)
    }

    /// Add a user-authored block and select it.
    pub fn insert(&self, content: BlockContent, position: Position) -> Result<Block> {
        let block = self.document.insert(NewBlock::new(content), position)?;
        self.selection.select(block.id)?;
        Ok(block)
    }

    /// Move the selected block one slot up. No-op at the top.
    pub fn move_up(&self) -> Result<usize> {
        let id = self.current()?;
        let index = self.document.position_of(&id)?;
        if index == 0 {
            return Ok(0);
        }
        Ok(self.document.move_block(&id, Position::At(index - 1))?)
    }

    /// Move the selected block one slot down. No-op at the bottom.
    pub fn move_down(&self) -> Result<usize> {
        let id = self.current()?;
        let index = self.document.position_of(&id)?;
        if index + 1 >= self.document.len() {
            return Ok(index);
        }
        Ok(self.document.move_block(&id, Position::At(index + 1))?)
    }

    pub fn move_to(&self, position: Position) -> Result<usize> {
        let id = self.current()?;
        Ok(self.document.move_block(&id, position)?)
    }

    /// Duplicate the selected block and select the copy.
    pub fn duplicate(&self) -> Result<Block> {
        let id = self.current()?;
        let copy = self.document.duplicate(&id)?;
        self.selection.select(copy.id)?;
        Ok(copy)
    }

    /// Remove the selected block and clear the selection.
    pub fn delete(&self) -> Result<Block> {
        let id = self.current()?;
        if !self.authority.authorize(GuardedAction::Remove) {
            return Err(EditorError::Unauthorized(GuardedAction::Remove));
        }
        let removed = self.document.remove(&id)?;
        self.selection.clear();
        Ok(removed)
    }

    /// Ask the generator to change the selected block.
    pub fn request_edit(&self, instruction: impl Into<String>) -> Result<EditHandle> {
        let id = self.current()?;
        self.orchestrator.submit_edit(id, instruction)
    }

    /// Replace the selected block's content directly.
    ///
    /// Uses the block's current version, so it conflicts only with a change
    /// that lands between the read and the write.
    pub fn edit_content(&self, content: BlockContent) -> Result<Block> {
        let id = self.current()?;
        let version = self.document.get(&id)?.version;
        Ok(self
            .document
            .apply_content_patch(&id, content, version, Provenance::User)?)
    }
}
