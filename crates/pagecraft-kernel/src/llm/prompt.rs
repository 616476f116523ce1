//! Adapts a chat-completion provider into a [`ContentGenerator`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pagecraft_types::{BlockContent, BlockKind, GenericContent};

use super::{CompletionRequest, LlmProvider, Message};
use crate::config::GenerationConfig;
use crate::generation::{ContentGenerator, GenerationError, GenerationRequest};

const BASE_PROMPT: &str = "You rewrite one section of a marketing web page. \
You receive the section's current content as JSON and an instruction. \
Reply with a single JSON object holding the complete new content for the \
same section type. Do not add commentary or fields that are not listed.";

/// Field list per kind, shown to the model.
fn schema_hint(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Hero => {
            r#"{"headline": string, "subheadline"?: string, "cta_text"?: string, "cta_link"?: string, "background_image"?: string}"#
        }
        BlockKind::About => r#"{"title": string, "body": string, "image"?: string}"#,
        BlockKind::Services => {
            r#"{"title": string, "items": [{"title": string, "description": string, "icon"?: string}]}"#
        }
        BlockKind::Cta => {
            r#"{"headline": string, "body"?: string, "button_text"?: string, "button_link"?: string}"#
        }
        BlockKind::Contact => {
            r#"{"title": string, "email"?: string, "phone"?: string, "address"?: string}"#
        }
        BlockKind::Generic => "any JSON object; keep the existing structure",
    }
}

/// Generates content by prompting a language model.
pub struct PromptGenerator<P> {
    provider: P,
    config: GenerationConfig,
}

impl<P: LlmProvider> PromptGenerator<P> {
    pub fn new(provider: P, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build the completion request for a generation call.
    pub fn build_request(&self, request: &GenerationRequest) -> CompletionRequest {
        let mut system = String::new();
        if let Some(prefix) = &self.config.system_prompt {
            system.push_str(prefix);
            system.push_str("\n\n");
        }
        system.push_str(BASE_PROMPT);
        system.push_str(&format!(
            "\n\nSection type: {}\nSchema: {}",
            request.kind,
            schema_hint(request.kind)
        ));

        let current = serde_json::to_string_pretty(&request.content.to_value())
            .unwrap_or_else(|_| "{}".to_string());
        let user = format!(
            "Current content:\n{current}\n\nInstruction: {}",
            request.instruction.trim()
        );

        let mut completion = CompletionRequest::new(&self.config.model, vec![Message::user(user)])
            .with_system(system)
            .with_max_tokens(self.config.max_tokens);
        if let Some(t) = self.config.temperature {
            completion = completion.with_temperature(t);
        }
        completion
    }
}

#[async_trait]
impl<P: LlmProvider> ContentGenerator for PromptGenerator<P> {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<BlockContent, GenerationError> {
        if !self.provider.is_available().await {
            return Err(GenerationError::Unavailable(self.provider.name().to_string()));
        }

        let completion = self.build_request(&request);
        let call = tokio::time::timeout(request.timeout, self.provider.complete(completion));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = call => match result {
                Ok(response) => response?,
                Err(_) => return Err(GenerationError::Timeout(request.timeout)),
            },
        };

        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "generation reply received"
        );
        parse_reply(&request.content, &response.content)
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Read a model reply as content of the same kind as `current`.
fn parse_reply(current: &BlockContent, reply: &str) -> Result<BlockContent, GenerationError> {
    let value: serde_json::Value = serde_json::from_str(strip_fences(reply))
        .map_err(|e| GenerationError::NonConforming(format!("reply is not JSON: {e}")))?;

    match current {
        BlockContent::Generic(g) => Ok(BlockContent::Generic(GenericContent {
            kind: g.kind.clone(),
            payload: value,
        })),
        other => BlockContent::from_value(other.kind(), value)
            .map_err(|e| GenerationError::NonConforming(e.to_string())),
    }
}
