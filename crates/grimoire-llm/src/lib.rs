//! grimoire-llm - LLM providers and LLM-backed mention extraction.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - chat completions; also any compatible
//!   endpoint (Ollama, vLLM, LM Studio) through `base_url`
//! - **Anthropic** (feature: `anthropic`) - messages API
//!
//! # Example
//!
//! ```ignore
//! use grimoire_llm::{LlmFactory, LlmMentionExtractor, LlmExtractorConfig};
//!
//! let llm = LlmFactory::create(config.llm.clone())?;
//! let extractor = LlmMentionExtractor::new(llm, LlmExtractorConfig::from(&config));
//! let extraction = extractor.extract("Grom cast Fireball", &["Grom".to_string()]).await?;
//! ```

#[cfg(feature = "anthropic")]
mod anthropic;
mod extractor;
mod factory;
#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicLlm;
pub use extractor::{LlmExtractorConfig, LlmMentionExtractor};
pub use factory::LlmFactory;
#[cfg(feature = "openai")]
pub use openai::OpenAILlm;

// Re-export core types for convenience
pub use grimoire_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmProvider, LlmResponse, ResponseFormat,
};
