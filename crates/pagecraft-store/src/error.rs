//! Error types for block store operations.

use thiserror::Error;

use pagecraft_types::{BlockId, OrderKey, ValidationError};

/// Errors that can occur during block store operations.
///
/// Every failing operation leaves the store exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Block not found on the page.
    #[error("block not found: {0:?}")]
    NotFound(BlockId),

    /// Content does not conform to the schema of its kind.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Optimistic concurrency check failed: the block changed since the
    /// caller read it.
    #[error("version conflict on block {id:?}: expected {expected}, found {actual}")]
    VersionConflict { id: BlockId, expected: u64, actual: u64 },

    /// The requested ID is live or was used by a removed block.
    #[error("block id already used: {0:?}")]
    DuplicateBlock(BlockId),

    /// Two blocks share an order key (only possible in restored snapshots).
    #[error("blocks {first:?} and {second:?} share order key {key}")]
    OrderTie {
        first: BlockId,
        second: BlockId,
        key: OrderKey,
    },
}
