//! LLM extractor collaborator.

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::LlmExtraction;

/// A network-bound free-text extractor, typically LLM backed.
///
/// May fail or time out. Callers treat any error as "zero mentions from this
/// source" and keep going.
#[async_trait]
pub trait MentionExtractor: Send + Sync {
    /// Extract mentions and relationships from `text`, biased towards `known_names`.
    async fn extract(
        &self,
        text: &str,
        known_names: &[String],
    ) -> Result<LlmExtraction, ExtractionError>;
}
