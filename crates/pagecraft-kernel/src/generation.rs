//! Generation collaborator seam.
//!
//! A [`ContentGenerator`] turns (kind, current content, instruction) into new
//! content for the same kind. The edit pipeline only ever talks to this
//! trait; [`crate::llm::PromptGenerator`] adapts a chat-completion provider
//! to it.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use pagecraft_types::{BlockContent, BlockKind};

use crate::llm::LlmError;

/// Input to one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Kind of the block being generated; the reply must be of this kind.
    pub kind: BlockKind,
    /// Current content (empty content for a brand-new block).
    pub content: BlockContent,
    /// The natural-language change the user asked for.
    pub instruction: String,
    /// Upper bound the generator must enforce on itself.
    pub timeout: Duration,
}

/// Generation failed. The block it was for is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation cancelled")]
    Cancelled,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("generator unavailable: {0}")]
    Unavailable(String),

    /// The reply could not be read as valid content of the requested kind.
    #[error("non-conforming response: {0}")]
    NonConforming(String),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable(msg) => GenerationError::Unavailable(msg),
            other => GenerationError::Provider(other.to_string()),
        }
    }
}

/// Produces new block content from an instruction.
///
/// Implementations should stop early when `cancel` fires and must give up
/// after `request.timeout`.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<BlockContent, GenerationError>;
}
