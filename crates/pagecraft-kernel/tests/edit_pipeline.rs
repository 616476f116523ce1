//! Integration tests for the prompt-driven edit pipeline.
//!
//! # Tiers
//!
//! - **Tier 1:** single edits through the `Editor` facade (apply, not found,
//!   generation failure, timeout)
//! - **Tier 2:** concurrency, driven by a gated generator so every
//!   interleaving is deterministic
//! - **Tier 3:** cancellation, save failures and reload from SQLite
//! - **Tier 4:** toolbar verbs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use pagecraft_kernel::{
    AllowAll, BlockContent, BlockKind, CompletionRequest, CompletionResponse, ConflictReason,
    ContentGenerator, Editor, EditorConfig, EditorError, GenerationError, GenerationRequest,
    GuardedAction, LlmProvider, LlmResult, MemoryPersistence, PageEvent, PageId,
    PagePersistence, PageSnapshot, Position, PromptGenerator, SaveError, SessionGrant,
    SqlitePersistence, StoreError,
};

// ============================================================================
// Shared test setup
// ============================================================================

type Reply = Box<dyn Fn(&GenerationRequest) -> Result<BlockContent, GenerationError> + Send + Sync>;

/// Generator whose calls block until the test releases them.
///
/// Each call records its request, signals `started`, then waits for a permit
/// on `gate`. With `cooperative = false` it ignores cancellation, like a
/// provider that cannot abort an in-flight request.
struct GatedGenerator {
    gate: Semaphore,
    started: Semaphore,
    cooperative: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    reply: Reply,
}

impl GatedGenerator {
    fn new(reply: impl Fn(&GenerationRequest) -> Result<BlockContent, GenerationError> + Send + Sync + 'static) -> Self {
        Self {
            gate: Semaphore::new(0),
            started: Semaphore::new(0),
            cooperative: true,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        }
    }

    /// Replies with a hero whose headline is the instruction text.
    fn echo_headline() -> Self {
        Self::new(|req| Ok(BlockContent::hero(req.instruction.clone())))
    }

    fn stubborn(mut self) -> Self {
        self.cooperative = false;
        self
    }

    /// Wait until `n` more calls have reached the gate.
    async fn wait_started(&self, n: u32) {
        self.started.acquire_many(n).await.unwrap().forget();
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for GatedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<BlockContent, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        self.started.add_permits(1);

        if self.cooperative {
            tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                permit = self.gate.acquire() => permit.unwrap().forget(),
            }
        } else {
            self.gate.acquire().await.unwrap().forget();
        }
        (self.reply)(&request)
    }
}

struct Fixture {
    editor: Editor,
    generator: Arc<GatedGenerator>,
    persistence: Arc<MemoryPersistence>,
}

fn setup(generator: GatedGenerator) -> Fixture {
    let generator = Arc::new(generator);
    let persistence = Arc::new(MemoryPersistence::new());
    let editor = Editor::new(
        EditorConfig::default(),
        PageId::new(),
        generator.clone(),
        persistence.clone(),
        Arc::new(AllowAll),
    )
    .unwrap();
    Fixture {
        editor,
        generator,
        persistence,
    }
}

/// Persistence whose saves block until the test releases them, then land in
/// an in-memory store.
struct GatedPersistence {
    gate: Semaphore,
    started: Semaphore,
    inner: MemoryPersistence,
}

impl GatedPersistence {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: Semaphore::new(0),
            inner: MemoryPersistence::new(),
        }
    }

    async fn wait_started(&self, n: u32) {
        self.started.acquire_many(n).await.unwrap().forget();
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl PagePersistence for GatedPersistence {
    async fn save(&self, snapshot: &PageSnapshot) -> Result<(), SaveError> {
        self.started.add_permits(1);
        self.gate.acquire().await.unwrap().forget();
        self.inner.save(snapshot).await
    }

    async fn load(&self, page_id: PageId) -> Result<Option<PageSnapshot>, SaveError> {
        self.inner.load(page_id).await
    }
}

fn add_hero(editor: &Editor, headline: &str) -> pagecraft_kernel::Block {
    editor
        .document()
        .insert(
            pagecraft_kernel::NewBlock::new(BlockContent::hero(headline)),
            Position::End,
        )
        .unwrap()
}

// ============================================================================
// Tier 1: single edits
// ============================================================================

#[tokio::test]
async fn insert_into_empty_page() {
    let fx = setup(GatedGenerator::echo_headline());
    let block = fx
        .editor
        .document()
        .insert_raw("hero", json!({"headline": "Welcome"}), Position::At(0))
        .unwrap();

    let blocks = fx.editor.document().list();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, block.id);
    assert_eq!(blocks[0].content, BlockContent::hero("Welcome"));
}

#[tokio::test]
async fn edit_applies_generated_content() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::hero("Hi"))));
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx
        .editor
        .orchestrator()
        .submit_edit(b1.id, "shorten the headline")
        .unwrap();
    fx.generator.release(1);
    let outcome = handle.wait().await.unwrap();

    assert_eq!(outcome.block.content, BlockContent::hero("Hi"));
    assert!(outcome.block.ai_generated);
    assert_eq!(outcome.block.version, 2);
    assert_eq!(fx.editor.document().get(&b1.id).unwrap(), outcome.block);

    let sent = fx.generator.requests.lock()[0].clone();
    assert_eq!(sent.kind, BlockKind::Hero);
    assert_eq!(sent.content, BlockContent::hero("Welcome"));
    assert_eq!(sent.instruction, "shorten the headline");
    assert_eq!(sent.timeout, Duration::from_secs(30));

    let revision = outcome.save.unwrap();
    assert_eq!(
        fx.persistence.saved(fx.editor.document().page_id()).unwrap().revision,
        revision
    );
    assert!(!fx.editor.document().is_dirty());
}

#[tokio::test]
async fn edit_of_missing_block_is_not_found() {
    let fx = setup(GatedGenerator::echo_headline());
    add_hero(&fx.editor, "Welcome");
    let before = fx.editor.document().snapshot();

    let ghost = pagecraft_kernel::BlockId::new();
    let err = fx
        .editor
        .orchestrator()
        .submit_edit(ghost, "anything")
        .err()
        .unwrap();

    assert!(matches!(err, EditorError::NotFound(id) if id == ghost));
    assert_eq!(fx.editor.document().snapshot(), before);
    assert_eq!(fx.generator.calls(), 0);
}

#[tokio::test]
async fn generation_failure_leaves_block_unchanged() {
    let fx = setup(GatedGenerator::new(|_| {
        Err(GenerationError::Provider("model overloaded".into()))
    }));
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.release(1);
    let err = handle.wait().await.err().unwrap();

    assert!(matches!(
        err,
        EditorError::Generation { id, source: GenerationError::Provider(_) } if id == b1.id
    ));
    assert_eq!(fx.editor.document().get(&b1.id).unwrap(), b1);
    assert!(!fx.editor.orchestrator().is_pending(&b1.id));
    assert_eq!(fx.persistence.save_count(), 0);
}

#[tokio::test]
async fn wrong_kind_reply_is_rejected() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::empty(BlockKind::About))));
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.release(1);
    let err = handle.wait().await.err().unwrap();

    assert!(matches!(
        err,
        EditorError::Generation {
            source: GenerationError::NonConforming(_),
            ..
        }
    ));
    assert_eq!(fx.editor.document().get(&b1.id).unwrap(), b1);
}

/// Provider that never answers within any reasonable timeout.
struct SlowProvider;

#[async_trait]
impl LlmProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(CompletionResponse::text(request.model, "{\"headline\": \"late\"}"))
    }
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_leaves_block_unchanged() {
    let config = EditorConfig::from_toml_str("[generation]\ntimeout_ms = 250").unwrap();
    let generator = PromptGenerator::new(SlowProvider, config.generation.clone());
    let editor = Editor::new(
        config,
        PageId::new(),
        Arc::new(generator),
        Arc::new(MemoryPersistence::new()),
        Arc::new(AllowAll),
    )
    .unwrap();
    let b1 = add_hero(&editor, "Welcome");

    let err = editor
        .orchestrator()
        .submit_edit(b1.id, "shorten")
        .unwrap()
        .wait()
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        EditorError::Generation {
            source: GenerationError::Timeout(t),
            ..
        } if t == Duration::from_millis(250)
    ));
    assert_eq!(editor.document().get(&b1.id).unwrap(), b1);
    assert!(!editor.orchestrator().is_pending(&b1.id));
}

// ============================================================================
// Tier 2: concurrency
// ============================================================================

#[tokio::test]
async fn second_edit_of_pending_block_conflicts() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::hero("Hi"))));
    let b1 = add_hero(&fx.editor, "Welcome");
    let orch = fx.editor.orchestrator();

    let first = orch.submit_edit(b1.id, "shorten the headline").unwrap();
    fx.generator.wait_started(1).await;

    let err = orch.submit_edit(b1.id, "make it longer").err().unwrap();
    assert!(matches!(
        err,
        EditorError::Conflict {
            id,
            reason: ConflictReason::Pending
        } if id == b1.id
    ));
    assert_eq!(fx.generator.calls(), 1);

    fx.generator.release(1);
    let outcome = first.wait().await.unwrap();
    assert_eq!(outcome.block.content, BlockContent::hero("Hi"));
    assert_eq!(outcome.block.version, 2);

    // The slot is free again.
    let again = orch.submit_edit(b1.id, "once more").unwrap();
    fx.generator.release(1);
    assert_eq!(again.wait().await.unwrap().block.version, 3);
}

#[tokio::test]
async fn edits_of_different_blocks_run_concurrently() {
    let fx = setup(GatedGenerator::echo_headline());
    let a = add_hero(&fx.editor, "A");
    let b = add_hero(&fx.editor, "B");
    let orch = fx.editor.orchestrator();

    let ha = orch.submit_edit(a.id, "new A").unwrap();
    let hb = orch.submit_edit(b.id, "new B").unwrap();

    // Both calls are in flight at the same time.
    fx.generator.wait_started(2).await;
    assert_eq!(orch.pending_count(), 2);

    // Other blocks stay mutable while both are pending.
    let c = add_hero(&fx.editor, "C");
    fx.editor.document().move_block(&c.id, Position::FIRST).unwrap();

    fx.generator.release(2);
    let (ra, rb) = futures::future::join(ha.wait(), hb.wait()).await;
    assert_eq!(ra.unwrap().block.content, BlockContent::hero("new A"));
    assert_eq!(rb.unwrap().block.content, BlockContent::hero("new B"));
    assert_eq!(orch.pending_count(), 0);

    let ids: Vec<_> = fx.editor.document().list().iter().map(|blk| blk.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
}

#[tokio::test]
async fn newer_user_edit_wins_over_stale_generation() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::hero("generated"))));
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.wait_started(1).await;

    fx.editor.toolbar().select(b1.id).unwrap();
    let user = fx
        .editor
        .toolbar()
        .edit_content(BlockContent::hero("typed by hand"))
        .unwrap();
    assert_eq!(user.version, 2);

    fx.generator.release(1);
    let err = handle.wait().await.err().unwrap();
    assert!(matches!(
        err,
        EditorError::Conflict {
            reason: ConflictReason::StaleVersion {
                expected: 1,
                actual: 2
            },
            ..
        }
    ));

    let stored = fx.editor.document().get(&b1.id).unwrap();
    assert_eq!(stored.content, BlockContent::hero("typed by hand"));
    assert!(!stored.ai_generated);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn result_for_removed_block_is_discarded() {
    let fx = setup(GatedGenerator::echo_headline());
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.wait_started(1).await;
    fx.editor.remove_block(&b1.id).unwrap();

    fx.generator.release(1);
    let err = handle.wait().await.err().unwrap();
    assert!(matches!(err, EditorError::NotFound(id) if id == b1.id));
    assert!(fx.editor.document().is_empty());
}

// ============================================================================
// Tier 3: cancellation, saving, reload
// ============================================================================

#[tokio::test]
async fn cancelled_edit_holds_lock_until_call_settles() {
    let fx = setup(GatedGenerator::echo_headline().stubborn());
    let b1 = add_hero(&fx.editor, "Welcome");
    let orch = fx.editor.orchestrator();

    let handle = orch.submit_edit(b1.id, "late headline").unwrap();
    fx.generator.wait_started(1).await;
    handle.cancel();

    // The generator ignores cancellation, so the block stays locked.
    tokio::task::yield_now().await;
    assert!(orch.is_pending(&b1.id));
    assert!(matches!(
        orch.submit_edit(b1.id, "another").err().unwrap(),
        EditorError::Conflict {
            reason: ConflictReason::Pending,
            ..
        }
    ));

    fx.generator.release(1);
    let err = handle.wait().await.err().unwrap();
    assert!(matches!(err, EditorError::Cancelled(id) if id == b1.id));

    // The late reply was discarded and the lock released.
    assert_eq!(fx.editor.document().get(&b1.id).unwrap(), b1);
    assert!(!orch.is_pending(&b1.id));
}

#[tokio::test]
async fn save_failure_keeps_edit_and_marks_dirty() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::hero("Hi"))));
    let b1 = add_hero(&fx.editor, "Welcome");
    let mut events = fx.editor.document().subscribe();
    fx.persistence.fail_next(1);

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.release(1);
    let outcome = handle.wait().await.unwrap();

    assert!(outcome.save.is_err());
    assert_eq!(outcome.block.content, BlockContent::hero("Hi"));
    assert_eq!(fx.editor.document().get(&b1.id).unwrap().version, 2);
    assert!(fx.editor.document().is_dirty());

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        saw_failure |= matches!(event, PageEvent::SaveFailed { .. });
    }
    assert!(saw_failure);

    // A retry persists the edit.
    let revision = fx.editor.save().await.unwrap();
    assert!(!fx.editor.document().is_dirty());
    let saved = fx.persistence.saved(fx.editor.document().page_id()).unwrap();
    assert_eq!(saved.revision, revision);
    assert_eq!(saved.block(&b1.id).unwrap().content, BlockContent::hero("Hi"));
}

#[tokio::test]
async fn block_is_idle_while_save_is_in_flight() {
    let generator = Arc::new(GatedGenerator::echo_headline());
    let persistence = Arc::new(GatedPersistence::new());
    let editor = Editor::new(
        EditorConfig::default(),
        PageId::new(),
        generator.clone(),
        persistence.clone(),
        Arc::new(AllowAll),
    )
    .unwrap();
    let orch = editor.orchestrator();
    let b1 = add_hero(&editor, "Welcome");

    let first = orch.submit_edit(b1.id, "Fresh bread").unwrap();
    generator.release(1);
    persistence.wait_started(1).await;

    // The patch has landed and the save is blocked: the block is idle again.
    let patched = editor.document().get(&b1.id).unwrap();
    assert_eq!(patched.version, 2);
    assert!(patched.ai_generated);
    assert!(!orch.is_pending(&b1.id));

    let second = orch.submit_edit(b1.id, "Warm pastries").unwrap();
    generator.release(1);
    persistence.wait_started(1).await;
    assert!(!orch.is_pending(&b1.id));

    // Generated inserts release their slot before saving too.
    let third = orch
        .generate_block(BlockKind::Hero, "Open daily", Position::End)
        .unwrap();
    let new_id = third.block_id();
    generator.release(1);
    persistence.wait_started(1).await;
    assert!(editor.document().contains(&new_id));
    assert!(!orch.is_pending(&new_id));
    assert_eq!(orch.pending_count(), 0);

    persistence.release(3);
    assert_eq!(first.wait().await.unwrap().block.version, 2);
    let outcome = second.wait().await.unwrap();
    assert_eq!(outcome.block.content, BlockContent::hero("Warm pastries"));
    assert_eq!(outcome.block.version, 3);
    third.wait().await.unwrap().save.unwrap();
    assert!(!editor.document().is_dirty());
}

#[tokio::test]
async fn reopen_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = EditorConfig::from_toml_str(&format!(
        "[persistence]\nbackend = \"sqlite\"\npath = {:?}\n",
        dir.path().join("pages.db")
    ))
    .unwrap();
    let page_id = PageId::new();
    let generator = Arc::new(GatedGenerator::new(|_| Ok(BlockContent::hero("Hi"))));

    let persistence = config.persistence.connect().unwrap();
    let editor = Editor::open(
        config.clone(),
        page_id,
        generator.clone(),
        persistence,
        Arc::new(AllowAll),
    )
    .await
    .unwrap();
    assert!(editor.document().is_empty());

    let b1 = add_hero(&editor, "Welcome");
    editor
        .document()
        .insert_raw("faq", json!({"q": "Open on Sundays?"}), Position::End)
        .unwrap();
    let handle = editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    generator.release(1);
    handle.wait().await.unwrap().save.unwrap();
    let expected = editor.document().list();
    drop(editor);

    let reopened = Editor::open(
        config.clone(),
        page_id,
        generator,
        Arc::new(SqlitePersistence::open(dir.path().join("pages.db")).unwrap()),
        Arc::new(AllowAll),
    )
    .await
    .unwrap();
    assert_eq!(reopened.document().list(), expected);
    assert!(reopened.document().get(&b1.id).unwrap().ai_generated);
    assert!(!reopened.document().is_dirty());
}

#[tokio::test]
async fn open_rejects_corrupt_snapshot() {
    let page_id = PageId::new();
    let persistence = Arc::new(MemoryPersistence::new());
    let mut store = pagecraft_kernel::BlockStore::new(page_id);
    let a = store
        .insert(pagecraft_kernel::NewBlock::new(BlockContent::hero("A")), Position::End)
        .unwrap();
    store
        .insert(pagecraft_kernel::NewBlock::new(BlockContent::hero("B")), Position::End)
        .unwrap();
    let mut snapshot = store.snapshot();
    snapshot.blocks[1].order = a.order.clone();
    persistence.save(&snapshot).await.unwrap();

    let result = Editor::open(
        EditorConfig::default(),
        page_id,
        Arc::new(GatedGenerator::echo_headline()),
        persistence,
        Arc::new(AllowAll),
    )
    .await;
    assert!(matches!(result, Err(EditorError::InvalidSnapshot(_))));
}

// ============================================================================
// Tier 4: toolbar verbs
// ============================================================================

#[tokio::test]
async fn toolbar_requires_selection() {
    let fx = setup(GatedGenerator::echo_headline());
    add_hero(&fx.editor, "A");

    assert!(matches!(fx.editor.toolbar().move_up(), Err(EditorError::NoSelection)));
    assert!(matches!(fx.editor.toolbar().delete(), Err(EditorError::NoSelection)));
    assert!(matches!(
        fx.editor.toolbar().request_edit("x").err().unwrap(),
        EditorError::NoSelection
    ));
}

#[tokio::test]
async fn toolbar_move_duplicate_delete() {
    let fx = setup(GatedGenerator::echo_headline());
    let toolbar = fx.editor.toolbar();
    let a = toolbar.insert(BlockContent::hero("A"), Position::End).unwrap();
    let b = toolbar.insert(BlockContent::hero("B"), Position::End).unwrap();
    let ids = || -> Vec<_> { fx.editor.document().list().iter().map(|blk| blk.id).collect() };

    // Insert selects the new block.
    assert_eq!(fx.editor.selection().selected(), Some(b.id));

    assert_eq!(toolbar.move_up().unwrap(), 0);
    assert_eq!(ids(), vec![b.id, a.id]);
    assert_eq!(toolbar.move_up().unwrap(), 0);
    assert_eq!(toolbar.move_down().unwrap(), 1);
    assert_eq!(toolbar.move_down().unwrap(), 1);
    assert_eq!(ids(), vec![a.id, b.id]);

    toolbar.select(a.id).unwrap();
    let copy = toolbar.duplicate().unwrap();
    assert_eq!(ids(), vec![a.id, copy.id, b.id]);
    assert_eq!(fx.editor.selection().selected(), Some(copy.id));

    toolbar.move_to(Position::End).unwrap();
    assert_eq!(ids(), vec![a.id, b.id, copy.id]);

    let removed = toolbar.delete().unwrap();
    assert_eq!(removed.id, copy.id);
    assert_eq!(fx.editor.selection().selected(), None);
    assert_eq!(ids(), vec![a.id, b.id]);
}

#[tokio::test]
async fn toolbar_delete_checks_authority() {
    let generator = Arc::new(GatedGenerator::echo_headline());
    let editor = Editor::new(
        EditorConfig::default(),
        PageId::new(),
        generator,
        Arc::new(MemoryPersistence::new()),
        Arc::new(SessionGrant::new("tok").allowing(GuardedAction::SubmitEdit)),
    )
    .unwrap();
    let a = editor
        .toolbar()
        .insert(BlockContent::hero("A"), Position::End)
        .unwrap();

    assert!(matches!(
        editor.toolbar().delete(),
        Err(EditorError::Unauthorized(GuardedAction::Remove))
    ));
    assert!(matches!(
        editor.remove_block(&a.id),
        Err(EditorError::Unauthorized(GuardedAction::Remove))
    ));
    assert!(editor.document().contains(&a.id));
    assert_eq!(editor.selection().selected(), Some(a.id));
}

#[tokio::test]
async fn toolbar_request_edit_and_invalid_direct_edit() {
    let fx = setup(GatedGenerator::echo_headline());
    let toolbar = fx.editor.toolbar();
    let a = toolbar.insert(BlockContent::hero("A"), Position::End).unwrap();

    let handle = toolbar.request_edit("Fresh bread daily").unwrap();
    assert_eq!(handle.block_id(), a.id);
    fx.generator.release(1);
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.block.content, BlockContent::hero("Fresh bread daily"));

    // A direct edit with content of another kind is refused and changes nothing.
    let err = toolbar
        .edit_content(BlockContent::empty(BlockKind::Contact))
        .unwrap_err();
    assert!(matches!(err, EditorError::Validation(_)));
    assert_eq!(fx.editor.document().get(&a.id).unwrap(), outcome.block);
}

#[tokio::test]
async fn remove_twice_fails() {
    let fx = setup(GatedGenerator::echo_headline());
    let b1 = add_hero(&fx.editor, "Welcome");

    fx.editor.remove_block(&b1.id).unwrap();
    assert!(matches!(
        fx.editor.remove_block(&b1.id),
        Err(EditorError::NotFound(id)) if id == b1.id
    ));
}

#[tokio::test]
async fn removed_id_stays_retired_after_reopen() {
    let fx = setup(GatedGenerator::echo_headline());
    let page_id = fx.editor.document().page_id();
    let b1 = add_hero(&fx.editor, "Welcome");
    fx.editor.remove_block(&b1.id).unwrap();
    fx.editor.save().await.unwrap();

    let reopened = Editor::open(
        EditorConfig::default(),
        page_id,
        fx.generator.clone(),
        fx.persistence.clone(),
        Arc::new(AllowAll),
    )
    .await
    .unwrap();
    let err = reopened
        .document()
        .insert(
            pagecraft_kernel::NewBlock::new(BlockContent::hero("again")).with_id(b1.id),
            Position::End,
        )
        .unwrap_err();
    assert_eq!(err, StoreError::DuplicateBlock(b1.id));
}

#[tokio::test]
async fn rendered_page_reflects_edits() {
    let fx = setup(GatedGenerator::new(|_| Ok(BlockContent::hero("Hi"))));
    let b1 = add_hero(&fx.editor, "Welcome");

    let handle = fx.editor.orchestrator().submit_edit(b1.id, "x").unwrap();
    fx.generator.release(1);
    handle.wait().await.unwrap();

    let page = fx.editor.render();
    let sections = page.find_all("section");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].get_attr("data-ai-generated"), Some("true"));
    assert_eq!(page.find_all("h1")[0].text_content(), "Hi");
}
