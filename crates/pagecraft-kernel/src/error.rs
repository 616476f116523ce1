//! Error taxonomy for editor operations.

use thiserror::Error;

use pagecraft_store::StoreError;
use pagecraft_types::{BlockId, ValidationError};

use crate::auth::GuardedAction;
use crate::config::ConfigError;
use crate::generation::GenerationError;
use crate::persistence::SaveError;

/// Why an edit was refused as conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// Another edit of the same block is still in flight.
    Pending,
    /// The block changed after the edit read it.
    StaleVersion { expected: u64, actual: u64 },
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::Pending => write!(f, "an edit is already pending"),
            ConflictReason::StaleVersion { expected, actual } => {
                write!(f, "stale version: expected {expected}, found {actual}")
            }
        }
    }
}

/// Errors surfaced by the editor.
///
/// Every failure is reported; none of them leaves a block partially changed.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("block not found: {0:?}")]
    NotFound(BlockId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Concurrent edit of the same block, or a patch against an old version.
    /// Never retried automatically.
    #[error("conflicting edit on block {id:?}: {reason}")]
    Conflict { id: BlockId, reason: ConflictReason },

    /// The generation collaborator failed; the block is unchanged.
    #[error("generation failed for block {id:?}: {source}")]
    Generation {
        id: BlockId,
        #[source]
        source: GenerationError,
    },

    /// Persisting the page failed; the in-memory page is kept as is.
    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("session is not authorized to {0}")]
    Unauthorized(GuardedAction),

    #[error("no block is selected")]
    NoSelection,

    #[error("block id already used: {0:?}")]
    DuplicateBlock(BlockId),

    /// The edit was cancelled; any late result was discarded.
    #[error("edit of block {0:?} was cancelled")]
    Cancelled(BlockId),

    /// A stored page failed its integrity checks on load.
    #[error("stored page is inconsistent: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for EditorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EditorError::NotFound(id),
            StoreError::Validation(e) => EditorError::Validation(e),
            StoreError::VersionConflict {
                id,
                expected,
                actual,
            } => EditorError::Conflict {
                id,
                reason: ConflictReason::StaleVersion { expected, actual },
            },
            StoreError::DuplicateBlock(id) => EditorError::DuplicateBlock(id),
            e @ StoreError::OrderTie { .. } => EditorError::InvalidSnapshot(e.to_string()),
        }
    }
}

/// Result type for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;
