//! # pagecraft-kernel
//!
//! Editing core for block-structured pages.
//!
//! A page is a [`PageDocument`]: an ordered set of typed blocks shared
//! between the toolbar, the renderer and background edit tasks. The
//! [`EditOrchestrator`] turns "this block + an instruction" into a
//! validated, atomically applied content update:
//!
//! ```text
//! ToolbarCommands ──► EditOrchestrator ──► ContentGenerator (async)
//!        │                   │
//!        ▼                   ▼
//!   PageDocument ◄── apply_content_patch ──► PagePersistence::save
//!        │
//!        ▼
//!   render_page
//! ```
//!
//! Collaborators sit behind traits: [`ContentGenerator`] for generation,
//! [`PagePersistence`] for saving, [`SessionAuthority`] for permission
//! checks. [`Editor`] wires them together from an [`EditorConfig`].

pub mod auth;
pub mod config;
pub mod db;
pub mod document;
pub mod editor;
pub mod error;
pub mod generation;
pub mod llm;
pub mod orchestrator;
pub mod persistence;
pub mod render;
pub mod selection;
pub mod telemetry;
pub mod toolbar;

pub use auth::{AllowAll, GuardedAction, SessionAuthority, SessionGrant};
pub use config::{Backend, ConfigError, EditorConfig, EventsConfig, GenerationConfig, PersistenceConfig};
pub use db::SqlitePersistence;
pub use document::{PageDocument, PageEvent, SharedPageDocument};
pub use editor::Editor;
pub use error::{ConflictReason, EditorError, Result};
pub use generation::{ContentGenerator, GenerationError, GenerationRequest};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, LlmResult,
    Message as LlmMessage, PromptGenerator, Role as LlmRole, Usage as LlmUsage,
};
pub use orchestrator::{EditHandle, EditOrchestrator, EditOutcome, PendingEdit};
pub use persistence::{MemoryPersistence, PagePersistence, SaveError};
pub use render::{RenderNode, render_block, render_content, render_page, render_raw};
pub use selection::SelectionController;
pub use telemetry::{TelemetryError, init_tracing};
pub use toolbar::ToolbarCommands;

pub use pagecraft_store::{BlockStore, PageSnapshot, Position, StoreError};
pub use pagecraft_types::{Block, BlockContent, BlockId, BlockKind, NewBlock, PageId, Provenance};
