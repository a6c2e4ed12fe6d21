//! Statistical tagger collaborator.

use crate::types::CandidateMention;

/// A statistical (model-based) entity tagger.
///
/// Synchronous, CPU-bound and infallible: a tagger that finds nothing returns
/// an empty list. Implementations map their own labels onto
/// [`EntityKind`](crate::types::EntityKind) and drop labels that have no mapping.
pub trait StatisticalTagger: Send + Sync {
    /// Tag entity mentions in `text`.
    fn extract(&self, text: &str) -> Vec<CandidateMention>;

    /// Noun phrases worth fuzzy-matching against the gazetteer.
    fn noun_chunks(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }

    /// Tagger name, for logs.
    fn name(&self) -> &str {
        "statistical"
    }
}
