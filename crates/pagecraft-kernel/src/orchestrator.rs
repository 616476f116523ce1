//! Edit orchestrator: the prompt → generation → patch pipeline.
//!
//! Each block is either idle or has exactly one pending edit. The pending
//! arena is a `DashMap<BlockId, PendingEdit>`; a second request for a pending
//! block is rejected with `Conflict`, never queued. Edits of different
//! blocks run concurrently.
//!
//! # Lifecycle of an edit
//!
//! 1. `submit_edit` checks authority, looks the block up, claims its pending
//!    slot and snapshots its version, all synchronously
//! 2. a spawned task calls the generation collaborator (the only suspension
//!    point)
//! 3. the reply is patched in against the snapshotted version; if the block
//!    changed meanwhile the reply is discarded with `Conflict`
//! 4. the pending slot is released and the page is saved; a save failure is
//!    reported in the outcome and leaves the page dirty, it never rolls the
//!    edit back
//!
//! The pending slot is released by a guard owned by the spawned task, so a
//! cancelled edit whose generator ignores cancellation keeps the block locked
//! until the call settles. The save runs after the release, so a slow
//! backend never blocks the next edit of the block.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

use pagecraft_store::{PageSnapshot, Position};
use pagecraft_types::{Block, BlockContent, BlockId, BlockKind, NewBlock, Provenance};

use crate::auth::{GuardedAction, SessionAuthority};
use crate::document::{PageDocument, PageEvent, SharedPageDocument};
use crate::error::{ConflictReason, EditorError, Result};
use crate::generation::{ContentGenerator, GenerationError, GenerationRequest};
use crate::persistence::{PagePersistence, SaveError};

/// A block's in-flight edit.
#[derive(Debug)]
pub struct PendingEdit {
    pub instruction: String,
    pub started: Instant,
    cancel: CancellationToken,
}

impl PendingEdit {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

type PendingArena = Arc<DashMap<BlockId, PendingEdit>>;

/// Releases a block's pending slot when dropped.
struct PendingGuard {
    pending: PendingArena,
    id: BlockId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// Result of a completed edit.
#[derive(Debug)]
pub struct EditOutcome {
    /// The block as it is now stored.
    pub block: Block,
    /// Page revision that was persisted, or why saving failed.
    pub save: std::result::Result<u64, SaveError>,
}

/// Handle to an edit running in the background.
///
/// Dropping the handle without waiting cancels the edit. Use
/// [`detach`](Self::detach) to let it run unobserved.
pub struct EditHandle {
    block_id: BlockId,
    cancel: CancellationToken,
    task: JoinHandle<Result<EditOutcome>>,
    guard: DropGuard,
}

impl EditHandle {
    /// The block being edited (or created).
    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Request cancellation. A result that arrives later is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the edit to settle.
    pub async fn wait(self) -> Result<EditOutcome> {
        let EditHandle {
            block_id,
            task,
            guard,
            ..
        } = self;
        let joined = task.await;
        let _token = guard.disarm();
        match joined {
            Ok(result) => result,
            Err(e) => Err(EditorError::Generation {
                id: block_id,
                source: GenerationError::Provider(format!("edit task failed: {e}")),
            }),
        }
    }

    /// Let the edit finish without waiting for it.
    pub fn detach(self) {
        let _token = self.guard.disarm();
    }
}

/// Drives prompt-driven edits of one page.
pub struct EditOrchestrator {
    document: SharedPageDocument,
    generator: Arc<dyn ContentGenerator>,
    persistence: Arc<dyn PagePersistence>,
    authority: Arc<dyn SessionAuthority>,
    pending: PendingArena,
    timeout: Duration,
}

impl EditOrchestrator {
    pub fn new(
        document: SharedPageDocument,
        generator: Arc<dyn ContentGenerator>,
        persistence: Arc<dyn PagePersistence>,
        authority: Arc<dyn SessionAuthority>,
        timeout: Duration,
    ) -> Self {
        Self {
            document,
            generator,
            persistence,
            authority,
            pending: Arc::new(DashMap::new()),
            timeout,
        }
    }

    pub fn document(&self) -> &SharedPageDocument {
        &self.document
    }

    pub fn is_pending(&self, id: &BlockId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Instruction of a block's pending edit.
    pub fn pending_instruction(&self, id: &BlockId) -> Option<String> {
        self.pending.get(id).map(|p| p.instruction.clone())
    }

    /// Cancel a block's pending edit. Returns `false` if none is pending.
    pub fn cancel(&self, id: &BlockId) -> bool {
        match self.pending.get(id) {
            Some(p) => {
                p.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Ask the generator to change a block.
    ///
    /// Fails immediately with `Unauthorized`, `NotFound`, or `Conflict` if the
    /// block already has a pending edit. Otherwise the generation runs on a
    /// spawned task; must be called from within a Tokio runtime.
    #[tracing::instrument(skip(self, instruction), fields(block = %id.short()))]
    pub fn submit_edit(&self, id: BlockId, instruction: impl Into<String>) -> Result<EditHandle> {
        self.authorize()?;
        let block = self.document.get(&id)?;
        let instruction = instruction.into();
        let cancel = CancellationToken::new();
        let guard = self.claim(id, &instruction, &cancel)?;

        info!(version = block.version, kind = %block.kind(), "edit submitted");
        self.document.publish(PageEvent::EditStarted { block_id: id });

        let ctx = self.context();
        let task_cancel = cancel.clone();
        let task =
            tokio::spawn(async move { ctx.run_edit(block, instruction, task_cancel, guard).await });
        Ok(EditHandle {
            block_id: id,
            cancel: cancel.clone(),
            task,
            guard: cancel.drop_guard(),
        })
    }

    /// Ask the generator for a new block of `kind` and insert it at
    /// `position`, flagged as generated.
    ///
    /// The new block's ID is reserved up front and shows as pending until
    /// the block is inserted.
    #[tracing::instrument(skip(self, instruction))]
    pub fn generate_block(
        &self,
        kind: BlockKind,
        instruction: impl Into<String>,
        position: Position,
    ) -> Result<EditHandle> {
        self.authorize()?;
        let id = BlockId::new();
        let instruction = instruction.into();
        let cancel = CancellationToken::new();
        let guard = self.claim(id, &instruction, &cancel)?;

        info!(block = %id.short(), "block generation submitted");
        self.document.publish(PageEvent::EditStarted { block_id: id });

        let ctx = self.context();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            ctx.run_generate(id, kind, instruction, position, task_cancel, guard)
                .await
        });
        Ok(EditHandle {
            block_id: id,
            cancel: cancel.clone(),
            task,
            guard: cancel.drop_guard(),
        })
    }

    fn authorize(&self) -> Result<()> {
        if self.authority.authorize(GuardedAction::SubmitEdit) {
            Ok(())
        } else {
            Err(EditorError::Unauthorized(GuardedAction::SubmitEdit))
        }
    }

    /// Claim a block's pending slot.
    fn claim(
        &self,
        id: BlockId,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> Result<PendingGuard> {
        match self.pending.entry(id) {
            Entry::Occupied(_) => {
                info!(block = %id.short(), "edit rejected, block already pending");
                Err(EditorError::Conflict {
                    id,
                    reason: ConflictReason::Pending,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingEdit {
                    instruction: instruction.to_string(),
                    started: Instant::now(),
                    cancel: cancel.clone(),
                });
                Ok(PendingGuard {
                    pending: self.pending.clone(),
                    id,
                })
            }
        }
    }

    fn context(&self) -> EditContext {
        EditContext {
            document: self.document.clone(),
            generator: self.generator.clone(),
            persistence: self.persistence.clone(),
            timeout: self.timeout,
        }
    }
}

/// What a background edit task needs.
struct EditContext {
    document: SharedPageDocument,
    generator: Arc<dyn ContentGenerator>,
    persistence: Arc<dyn PagePersistence>,
    timeout: Duration,
}

impl EditContext {
    async fn run_edit(
        self,
        block: Block,
        instruction: String,
        cancel: CancellationToken,
        slot: PendingGuard,
    ) -> Result<EditOutcome> {
        let id = block.id;
        let kind = block.kind();
        let expected_version = block.version;

        let request = GenerationRequest {
            kind,
            content: block.content,
            instruction,
            timeout: self.timeout,
        };
        let generated = self.generator.generate(request, cancel.clone()).await;
        let content = self.settle(id, kind, generated, &cancel)?;

        let patched = self
            .document
            .apply_content_patch(&id, content, expected_version, Provenance::Generated)
            .map_err(|e| self.fail(id, e.into()))?;
        info!(block = %id.short(), version = patched.version, "generated edit applied");
        drop(slot);

        let save = save_page(&self.document, self.persistence.as_ref()).await;
        Ok(EditOutcome {
            block: patched,
            save,
        })
    }

    async fn run_generate(
        self,
        id: BlockId,
        kind: BlockKind,
        instruction: String,
        position: Position,
        cancel: CancellationToken,
        slot: PendingGuard,
    ) -> Result<EditOutcome> {
        let request = GenerationRequest {
            kind,
            content: BlockContent::empty(kind),
            instruction,
            timeout: self.timeout,
        };
        let generated = self.generator.generate(request, cancel.clone()).await;
        let content = self.settle(id, kind, generated, &cancel)?;

        let block = self
            .document
            .insert(NewBlock::generated(content).with_id(id), position)
            .map_err(|e| self.fail(id, e.into()))?;
        info!(block = %id.short(), "generated block inserted");
        drop(slot);

        let save = save_page(&self.document, self.persistence.as_ref()).await;
        Ok(EditOutcome { block, save })
    }

    /// Turn a generator reply into content that may be applied, or the
    /// error to surface.
    fn settle(
        &self,
        id: BlockId,
        kind: BlockKind,
        generated: std::result::Result<BlockContent, GenerationError>,
        cancel: &CancellationToken,
    ) -> Result<BlockContent> {
        if cancel.is_cancelled() {
            return Err(self.fail(id, EditorError::Cancelled(id)));
        }
        let checked = generated.and_then(|content| {
            content
                .validate_for(kind)
                .map(|()| content)
                .map_err(|e| GenerationError::NonConforming(e.to_string()))
        });
        checked.map_err(|source| self.fail(id, EditorError::Generation { id, source }))
    }

    fn fail(&self, id: BlockId, err: EditorError) -> EditorError {
        warn!(block = %id.short(), error = %err, "edit failed, block unchanged");
        self.document.publish(PageEvent::EditFailed {
            block_id: id,
            reason: err.to_string(),
        });
        err
    }
}

/// Persist the current page and record the outcome on the document.
pub(crate) async fn save_page(
    document: &PageDocument,
    persistence: &dyn PagePersistence,
) -> std::result::Result<u64, SaveError> {
    let snapshot: PageSnapshot = document.snapshot();
    let revision = snapshot.revision;
    match persistence.save(&snapshot).await {
        Ok(()) => {
            document.mark_saved(revision);
            document.publish(PageEvent::Saved { revision });
            tracing::debug!(revision, "page saved");
            Ok(revision)
        }
        Err(err) => {
            warn!(revision, error = %err, "save failed, page stays dirty");
            document.publish(PageEvent::SaveFailed {
                revision,
                error: err.to_string(),
            });
            Err(err)
        }
    }
}
