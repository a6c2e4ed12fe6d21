//! Collaborator traits consumed by the grimoire pipeline.

mod canonical_store;
mod extractor;
mod llm;
mod tagger;

pub use canonical_store::*;
pub use extractor::*;
pub use llm::*;
pub use tagger::*;
