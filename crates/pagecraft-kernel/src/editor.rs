//! Editor facade: one page with its selection, edit pipeline and toolbar.

use std::sync::Arc;

use pagecraft_store::BlockStore;
use pagecraft_types::{Block, BlockId, PageId};

use crate::auth::{GuardedAction, SessionAuthority};
use crate::config::EditorConfig;
use crate::document::{PageDocument, SharedPageDocument};
use crate::error::{EditorError, Result};
use crate::generation::ContentGenerator;
use crate::orchestrator::{EditOrchestrator, save_page};
use crate::persistence::{PagePersistence, SaveError};
use crate::render::{RenderNode, render_page};
use crate::selection::SelectionController;
use crate::toolbar::ToolbarCommands;

/// An editing session for one page.
pub struct Editor {
    config: EditorConfig,
    document: SharedPageDocument,
    selection: Arc<SelectionController>,
    orchestrator: Arc<EditOrchestrator>,
    toolbar: ToolbarCommands,
    persistence: Arc<dyn PagePersistence>,
    authority: Arc<dyn SessionAuthority>,
}

impl Editor {
    /// Start editing an empty page.
    pub fn new(
        config: EditorConfig,
        page_id: PageId,
        generator: Arc<dyn ContentGenerator>,
        persistence: Arc<dyn PagePersistence>,
        authority: Arc<dyn SessionAuthority>,
    ) -> Result<Self> {
        Self::assemble(
            config,
            BlockStore::new(page_id),
            generator,
            persistence,
            authority,
        )
    }

    /// Start editing a page, loading its last saved state if there is one.
    pub async fn open(
        config: EditorConfig,
        page_id: PageId,
        generator: Arc<dyn ContentGenerator>,
        persistence: Arc<dyn PagePersistence>,
        authority: Arc<dyn SessionAuthority>,
    ) -> Result<Self> {
        let store = match persistence.load(page_id).await? {
            Some(snapshot) => {
                if snapshot.page_id != page_id {
                    return Err(EditorError::InvalidSnapshot(format!(
                        "asked for page {page_id}, got {}",
                        snapshot.page_id
                    )));
                }
                let store = BlockStore::from_snapshot(snapshot)?;
                tracing::info!(page = %page_id.short(), blocks = store.len(), revision = store.revision(), "page loaded");
                store
            }
            None => BlockStore::new(page_id),
        };
        Self::assemble(config, store, generator, persistence, authority)
    }

    fn assemble(
        config: EditorConfig,
        store: BlockStore,
        generator: Arc<dyn ContentGenerator>,
        persistence: Arc<dyn PagePersistence>,
        authority: Arc<dyn SessionAuthority>,
    ) -> Result<Self> {
        config.validate()?;

        let document = PageDocument::from_store(store, config.events.capacity).shared();
        let selection = Arc::new(SelectionController::new(document.clone()));
        let orchestrator = Arc::new(EditOrchestrator::new(
            document.clone(),
            generator,
            persistence.clone(),
            authority.clone(),
            config.generation.timeout(),
        ));
        let toolbar = ToolbarCommands::new(
            document.clone(),
            selection.clone(),
            orchestrator.clone(),
            authority.clone(),
        );

        Ok(Self {
            config,
            document,
            selection,
            orchestrator,
            toolbar,
            persistence,
            authority,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &SharedPageDocument {
        &self.document
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn orchestrator(&self) -> &EditOrchestrator {
        &self.orchestrator
    }

    pub fn toolbar(&self) -> &ToolbarCommands {
        &self.toolbar
    }

    /// Remove a block from the page, if the session may remove blocks.
    pub fn remove_block(&self, id: &BlockId) -> Result<Block> {
        if !self.authority.authorize(GuardedAction::Remove) {
            return Err(EditorError::Unauthorized(GuardedAction::Remove));
        }
        Ok(self.document.remove(id)?)
    }

    /// Render the whole page.
    pub fn render(&self) -> RenderNode {
        render_page(&self.document.list())
    }

    /// Save the current page. Clears the dirty state on success.
    pub async fn save(&self) -> std::result::Result<u64, SaveError> {
        save_page(&self.document, self.persistence.as_ref()).await
    }
}
