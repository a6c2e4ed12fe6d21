//! Factory for creating LLM providers.

use std::sync::Arc;

use grimoire_core::error::GrimoireResult;
use grimoire_core::traits::{Llm, LlmConfig, LlmProvider};

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create the provider named by `config.provider`.
    pub fn create(config: LlmConfig) -> GrimoireResult<Arc<dyn Llm>> {
        match config.provider {
            #[cfg(feature = "openai")]
            LlmProvider::OpenAI => Ok(Arc::new(crate::openai::OpenAILlm::new(config)?)),
            #[cfg(feature = "anthropic")]
            LlmProvider::Anthropic => Ok(Arc::new(crate::anthropic::AnthropicLlm::new(config)?)),
            #[allow(unreachable_patterns)]
            provider => Err(grimoire_core::GrimoireError::UnsupportedProvider {
                provider: format!("{:?}", provider),
            }),
        }
    }

    /// Create an OpenAI provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> GrimoireResult<Arc<dyn Llm>> {
        Self::create(LlmConfig {
            provider: LlmProvider::OpenAI,
            model: model.into(),
            ..Default::default()
        })
    }

    /// Create an Anthropic provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> GrimoireResult<Arc<dyn Llm>> {
        Self::create(LlmConfig {
            provider: LlmProvider::Anthropic,
            model: model.into(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dispatches_on_provider() {
        let llm = LlmFactory::create(LlmConfig {
            provider: LlmProvider::Anthropic,
            api_key: Some("sk-ant-test".to_string()),
            model: "claude-test".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(llm.model_name(), "claude-test");

        let llm = LlmFactory::create(LlmConfig {
            provider: LlmProvider::OpenAI,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
    }
}
