//! LLM-based mention and relationship extraction.
//!
//! The extractor prompts a chat model with the entity and relationship kinds it
//! should look for, the names already known to the campaign, and a bounded slice
//! of the text. The response is parsed leniently:
//!
//! 1. JSON is pulled out of a fenced code block when the model wrapped it
//! 2. Trivially malformed JSON (single quotes, trailing commas) is repaired
//! 3. Malformed entries, unknown kinds and missing text drop only that entry

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use grimoire_core::error::ExtractionError;
use grimoire_core::traits::{GenerationOptions, Llm, MentionExtractor, ResponseFormat};
use grimoire_core::types::{
    CandidateMention, EntityKind, ExtractedRelationship, LlmExtraction, MentionSource, Message,
    RelationshipKind,
};
use grimoire_core::NerConfig;

/// Entity kinds the model is asked for.
const PROMPT_ENTITY_KINDS: &[EntityKind] = &[
    EntityKind::Pc,
    EntityKind::Npc,
    EntityKind::Location,
    EntityKind::Item,
    EntityKind::Monster,
    EntityKind::Faction,
    EntityKind::Spell,
    EntityKind::Quest,
];

/// Relationship kinds the model is asked for, with their prompt descriptions.
const PROMPT_RELATIONSHIP_KINDS: &[(RelationshipKind, &str)] = &[
    (RelationshipKind::LocatedIn, "Entity is in a location"),
    (RelationshipKind::Knows, "Character knows another character"),
    (RelationshipKind::AlliedWith, "Characters/factions are allies"),
    (RelationshipKind::HostileTo, "Characters/factions are enemies"),
    (RelationshipKind::Owns, "Character owns an item"),
    (RelationshipKind::Killed, "Entity killed another entity"),
    (RelationshipKind::MemberOf, "Character is member of faction"),
];

/// Configuration for the LLM extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmExtractorConfig {
    /// Text is truncated to this many characters before prompting.
    pub chunk_size: usize,
    /// Confidence assigned to every extracted mention and relationship.
    pub confidence: f32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmExtractorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            confidence: 0.8,
            temperature: 0.1,
            max_tokens: 2000,
        }
    }
}

impl From<&NerConfig> for LlmExtractorConfig {
    fn from(config: &NerConfig) -> Self {
        Self {
            chunk_size: config.llm_chunk_size,
            confidence: config.llm_confidence,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }
}

/// Raw LLM response types for lenient parsing.
///
/// Models mix naming conventions, so each spelling gets its own field and the
/// first one present wins.
mod raw {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct RawEntity {
        pub text: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        entity_type: Option<String>,
        #[serde(rename = "entityType")]
        entity_type_camel: Option<String>,
        canonical_name: Option<String>,
        #[serde(rename = "canonicalName")]
        canonical_name_camel: Option<String>,
        name: Option<String>,
    }

    impl RawEntity {
        pub fn kind(&self) -> Option<&str> {
            first_of([&self.kind, &self.entity_type, &self.entity_type_camel])
        }

        pub fn canonical_name(&self) -> Option<&str> {
            first_of([&self.canonical_name, &self.canonical_name_camel, &self.name])
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct RawRelationship {
        source: Option<String>,
        from: Option<String>,
        target: Option<String>,
        to: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        relationship_type: Option<String>,
        #[serde(rename = "relationshipType")]
        relationship_type_camel: Option<String>,
        rel_type: Option<String>,
        pub evidence: Option<String>,
    }

    impl RawRelationship {
        pub fn source(&self) -> Option<&str> {
            first_of([&self.source, &self.from])
        }

        pub fn target(&self) -> Option<&str> {
            first_of([&self.target, &self.to])
        }

        pub fn kind(&self) -> Option<&str> {
            first_of([
                &self.kind,
                &self.relationship_type,
                &self.relationship_type_camel,
                &self.rel_type,
            ])
        }
    }

    /// Items stay untyped so one malformed entry only costs itself.
    #[derive(Debug, Deserialize)]
    pub struct RawExtraction {
        #[serde(default)]
        pub entities: Vec<serde_json::Value>,
        #[serde(default)]
        pub relationships: Vec<serde_json::Value>,
    }

    fn first_of<const N: usize>(fields: [&Option<String>; N]) -> Option<&str> {
        fields.into_iter().find_map(|f| f.as_deref())
    }
}

/// Mention extractor backed by a chat model.
pub struct LlmMentionExtractor {
    llm: Arc<dyn Llm>,
    config: LlmExtractorConfig,
}

impl LlmMentionExtractor {
    pub fn new(llm: Arc<dyn Llm>, config: LlmExtractorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &LlmExtractorConfig {
        &self.config
    }

    fn system_prompt() -> String {
        let entity_lines: Vec<String> = PROMPT_ENTITY_KINDS
            .iter()
            .map(|k| format!("- {}: {}", k.as_str(), k.description()))
            .collect();
        let relationship_lines: Vec<String> = PROMPT_RELATIONSHIP_KINDS
            .iter()
            .map(|(k, desc)| format!("- {}: {}", k.as_str(), desc))
            .collect();

        format!(
            r#"You are a D&D entity extractor. Extract named entities and relationships from D&D session transcripts.

Entity types to extract:
{}

Relationship types to extract:
{}

Return valid JSON only. Be conservative - only extract entities you're confident about."#,
            entity_lines.join("\n"),
            relationship_lines.join("\n"),
        )
    }

    fn user_prompt(&self, text: &str, known_names: &[String]) -> String {
        let known = if known_names.is_empty() {
            "(No known entities yet)".to_string()
        } else {
            known_names
                .iter()
                .map(|n| format!("- {n}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"Extract D&D entities and relationships from this transcript segment.

Known campaign entities (use these exact names if mentioned):
{known}

Transcript:
---
{}
---

Return JSON with this exact format:
{{
  "entities": [
    {{"text": "exact text found", "type": "ENTITY_TYPE", "canonical_name": "standardized name"}}
  ],
  "relationships": [
    {{"source": "entity name", "target": "entity name", "type": "RELATIONSHIP_TYPE", "evidence": "quote from text"}}
  ]
}}

Only include entities and relationships you find in the text. Do not invent or assume."#,
            truncate_chars(text, self.config.chunk_size),
        )
    }

    fn parse_response(&self, content: &str) -> Result<LlmExtraction, ExtractionError> {
        let json_str = extract_json(content);
        if json_str.is_empty() {
            return Ok(LlmExtraction::default());
        }

        let raw: raw::RawExtraction = match serde_json::from_str(json_str) {
            Ok(parsed) => parsed,
            Err(e) => lenient_parse(json_str).ok_or_else(|| {
                ExtractionError::InvalidResponse(format!("unparseable extraction JSON: {e}"))
            })?,
        };

        let mentions = raw
            .entities
            .into_iter()
            .filter_map(|item| decode_item::<raw::RawEntity>(item, "entity"))
            .filter_map(|entity| self.convert_entity(entity))
            .collect();
        let relationships = raw
            .relationships
            .into_iter()
            .filter_map(|item| decode_item::<raw::RawRelationship>(item, "relationship"))
            .filter_map(|rel| self.convert_relationship(rel))
            .collect();

        Ok(LlmExtraction {
            mentions,
            relationships,
        })
    }

    fn convert_entity(&self, raw: raw::RawEntity) -> Option<CandidateMention> {
        let text = raw.text.as_deref()?.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let Some(kind) = raw.kind().and_then(EntityKind::from_str_flexible) else {
            tracing::debug!(text = %text, kind = ?raw.kind(), "Dropping LLM entity with unknown kind");
            return None;
        };

        let canonical = raw
            .canonical_name()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| text.clone(), str::to_string);

        Some(
            CandidateMention::new(text, kind, self.config.confidence, MentionSource::Llm)
                .with_normalized_name(canonical)
                .with_metadata("llm_extracted", serde_json::Value::Bool(true)),
        )
    }

    fn convert_relationship(&self, raw: raw::RawRelationship) -> Option<ExtractedRelationship> {
        let source = raw.source().map(str::trim).filter(|s| !s.is_empty())?.to_string();
        let target = raw.target().map(str::trim).filter(|s| !s.is_empty())?.to_string();
        let kind = raw.kind().and_then(RelationshipKind::from_str_flexible)?;

        Some(
            ExtractedRelationship::new(source, target, kind, self.config.confidence)
                .with_evidence(raw.evidence.unwrap_or_default()),
        )
    }
}

#[async_trait]
impl MentionExtractor for LlmMentionExtractor {
    async fn extract(
        &self,
        text: &str,
        known_names: &[String],
    ) -> Result<LlmExtraction, ExtractionError> {
        if text.trim().is_empty() {
            return Ok(LlmExtraction::default());
        }

        let messages = vec![
            Message::system(Self::system_prompt()),
            Message::user(self.user_prompt(text, known_names)),
        ];

        let options = GenerationOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            response_format: self.llm.supports_json_mode().then_some(ResponseFormat::Json),
        };

        let response = self.llm.generate(&messages, Some(options)).await?;
        let extraction = self.parse_response(response.content_or_empty())?;

        tracing::debug!(
            model = self.llm.model_name(),
            mentions = extraction.mentions.len(),
            relationships = extraction.relationships.len(),
            "LLM extraction complete"
        );

        Ok(extraction)
    }
}

/// The first `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Extract JSON from a response that may be wrapped in a code block.
fn extract_json(content: &str) -> &str {
    static JSON_BLOCK: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").unwrap());

    if let Some(m) = JSON_BLOCK.captures(content).and_then(|caps| caps.get(1)) {
        return m.as_str().trim();
    }

    content.trim()
}

/// Decode one list item, skipping it when it has the wrong shape.
fn decode_item<T: serde::de::DeserializeOwned>(item: serde_json::Value, what: &str) -> Option<T> {
    match serde_json::from_value(item) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed LLM {}", what);
            None
        }
    }
}

/// Repair common model JSON mistakes and retry.
fn lenient_parse(json_str: &str) -> Option<raw::RawExtraction> {
    let fixed = json_str
        .replace('\'', "\"")
        .replace(",]", "]")
        .replace(",}", "}");

    serde_json::from_str(&fixed).ok()
}
