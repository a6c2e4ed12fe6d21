//! Mention types shared by every extraction source.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::kind::EntityKind;

/// Free-form metadata attached to mentions, entries and records.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers nothing.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Which recognizer produced a mention.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MentionSource {
    /// Statistical (model-based) entity tagger.
    Statistical,
    /// Gazetteer matching engine.
    Gazetteer,
    /// LLM free-text extractor.
    Llm,
    /// Several sources agreed on the mention.
    Hybrid,
}

/// A candidate reference to an entity, before or after resolution.
///
/// Two mentions can only ever denote the same identity when their `kind` is
/// equal; `normalized_name` is the key compared across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMention {
    /// Text as found in the source.
    pub text: String,
    /// Normalized (and, once linked, canonical) name.
    pub normalized_name: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Location in the source text, when the recognizer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Recognizer that produced the mention.
    pub source: MentionSource,
    /// Linked canonical record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    /// Gazetteer entry that produced the mention, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gazetteer_id: Option<String>,
    /// Source specific details.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A mention after clustering; carries `merged_count` and `sources` in metadata.
pub type ResolvedMention = CandidateMention;

impl CandidateMention {
    /// Create a new mention whose normalized name equals its text.
    pub fn new(
        text: impl Into<String>,
        kind: EntityKind,
        confidence: f32,
        source: MentionSource,
    ) -> Self {
        let text = text.into();
        Self {
            normalized_name: text.clone(),
            text,
            kind,
            span: None,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            canonical_id: None,
            gazetteer_id: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the normalized name.
    pub fn with_normalized_name(mut self, name: impl Into<String>) -> Self {
        self.normalized_name = name.into();
        self
    }

    /// Set the span.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }

    /// Set the canonical id.
    pub fn with_canonical_id(mut self, id: impl Into<String>) -> Self {
        self.canonical_id = Some(id.into());
        self
    }

    /// Set the gazetteer id.
    pub fn with_gazetteer_id(mut self, id: impl Into<String>) -> Self {
        self.gazetteer_id = Some(id.into());
        self
    }

    /// Add a metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the mention has been attached to a canonical record.
    pub fn is_linked(&self) -> bool {
        self.canonical_id.is_some()
    }

    /// Number of raw mentions merged into this one (1 when unresolved).
    pub fn merged_count(&self) -> usize {
        self.metadata
            .get("merged_count")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(1)
    }
}

const LOWERCASE_WORDS: &[&str] = &["the", "of", "and", "or", "a", "an"];

/// Normalize a raw entity name to title case.
///
/// Short all-caps words (acronyms) are preserved and lowercase articles or
/// conjunctions stay lowercase. Intended for tagger implementations whose
/// output is raw surface text.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let is_upper = word.chars().any(|c| c.is_alphabetic())
                && word.chars().all(|c| !c.is_lowercase());
            let starts_lower = word.chars().next().map_or(false, |c| c.is_lowercase());

            if is_upper && word.chars().count() <= 4 {
                word.to_string()
            } else if starts_lower && LOWERCASE_WORDS.contains(&word.to_lowercase().as_str()) {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_builder() {
        let mention = CandidateMention::new("fireball", EntityKind::Spell, 0.6, MentionSource::Statistical)
            .with_normalized_name("Fireball")
            .with_span(10, 18)
            .with_metadata("label", serde_json::json!("PRODUCT"));

        assert_eq!(mention.text, "fireball");
        assert_eq!(mention.normalized_name, "Fireball");
        assert_eq!(mention.span, Some(Span::new(10, 18)));
        assert!(!mention.is_linked());
        assert_eq!(mention.merged_count(), 1);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mention = CandidateMention::new("x", EntityKind::Item, 1.7, MentionSource::Llm);
        assert_eq!(mention.confidence, 1.0);
    }

    #[test]
    fn test_span_overlap() {
        assert!(Span::new(0, 5).overlaps(&Span::new(4, 8)));
        assert!(!Span::new(0, 5).overlaps(&Span::new(5, 8)));
        assert_eq!(Span::new(3, 7).len(), 4);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(MentionSource::Gazetteer.to_string(), "gazetteer");
        assert_eq!("hybrid".parse::<MentionSource>().unwrap(), MentionSource::Hybrid);
        let label: &'static str = MentionSource::Statistical.into();
        assert_eq!(label, "statistical");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("lord neverember"), "Lord Neverember");
        assert_eq!(normalize_name("tomb of the  NINE gods"), "Tomb of the NINE Gods");
        assert_eq!(normalize_name("WATERDEEP"), "Waterdeep");
        assert_eq!(normalize_name("The Yawning Portal"), "The Yawning Portal");
    }
}
