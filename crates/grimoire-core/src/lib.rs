//! grimoire-core - Core library for grimoire.
//!
//! This crate provides the mention data model, the collaborator traits
//! (statistical tagger, LLM extractor, canonical store, LLM), configuration
//! and error types shared by every grimoire crate.
//!
//! # Example
//!
//! ```ignore
//! use grimoire_core::{CandidateMention, EntityKind, MentionSource, NerConfig};
//!
//! let config = NerConfig::from_env();
//! let mention = CandidateMention::new("Fireball", EntityKind::Spell, 0.9, MentionSource::Gazetteer)
//!     .with_span(12, 20);
//! ```

pub mod config;
pub mod error;
pub mod similarity;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{CanonicalStoreConfig, CanonicalStoreProvider, NerConfig, NerConfigBuilder};
pub use error::{ErrorCode, ExtractionError, GrimoireError, GrimoireResult};
pub use traits::{
    CanonicalStore, GenerationOptions, Llm, LlmConfig, LlmProvider, LlmResponse,
    MentionExtractor, ResponseFormat, StatisticalTagger, TokenUsage,
};
pub use types::{
    normalize_name, CandidateMention, CanonicalRecord, EntityKind, ExtractedRelationship,
    ExtractionResult, GazetteerEntry, LlmExtraction, MatchKind, MatchSpan, MentionSource,
    Message, MessageRole, Metadata, RelationshipKind, ResolvedMention, Span,
};
