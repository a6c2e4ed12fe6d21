//! Extraction results.

use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, RelationshipKind};
use super::mention::{CandidateMention, MentionSource};

/// A relationship between two mentioned entities, reported by the LLM extractor.
///
/// Passed through the pipeline unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub source_name: String,
    pub target_name: String,
    pub kind: RelationshipKind,
    pub confidence: f32,
    /// Text supporting the relationship.
    #[serde(default)]
    pub evidence: String,
}

impl ExtractedRelationship {
    /// Create a new relationship.
    pub fn new(
        source_name: impl Into<String>,
        target_name: impl Into<String>,
        kind: RelationshipKind,
        confidence: f32,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            target_name: target_name.into(),
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: String::new(),
        }
    }

    /// Attach supporting evidence.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }
}

/// Output of one LLM extractor call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmExtraction {
    pub mentions: Vec<CandidateMention>,
    pub relationships: Vec<ExtractedRelationship>,
}

impl LlmExtraction {
    /// Check if the extraction found nothing.
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty() && self.relationships.is_empty()
    }
}

/// Complete result of one pipeline invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub mentions: Vec<CandidateMention>,
    pub relationships: Vec<ExtractedRelationship>,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub processing_time_ms: f64,
    /// Sources that failed and contributed nothing to this result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<MentionSource>,
}

impl ExtractionResult {
    /// Get mention count.
    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }

    /// Get relationship count.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Mentions of a single kind.
    pub fn mentions_of_kind(&self, kind: EntityKind) -> Vec<&CandidateMention> {
        self.mentions.iter().filter(|m| m.kind == kind).collect()
    }

    /// Whether any source degraded to an empty contribution.
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_counts_and_filters() {
        let result = ExtractionResult {
            mentions: vec![
                CandidateMention::new("Fireball", EntityKind::Spell, 0.9, MentionSource::Gazetteer),
                CandidateMention::new("Goblin", EntityKind::Monster, 0.9, MentionSource::Gazetteer),
            ],
            relationships: vec![ExtractedRelationship::new(
                "Grom",
                "Goblin",
                RelationshipKind::Killed,
                0.8,
            )],
            ..Default::default()
        };

        assert_eq!(result.mention_count(), 2);
        assert_eq!(result.relationship_count(), 1);
        assert_eq!(result.mentions_of_kind(EntityKind::Spell).len(), 1);
        assert!(!result.is_degraded());
    }
}
