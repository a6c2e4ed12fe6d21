//! Gazetteer entry and match span types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::kind::EntityKind;
use super::mention::{Metadata, Span};

/// A curated, immutable gazetteer entry.
///
/// `id` doubles as the join key into the canonical store when the entry is
/// pre-linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Regex sources, matched case-insensitively.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl GazetteerEntry {
    /// Create an entry with no aliases, patterns or metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            aliases: Vec::new(),
            patterns: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Add aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add regex patterns.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Primary name followed by every alias.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// How a span was matched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Pattern,
}

/// A gazetteer hit inside a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub entry_id: String,
    pub matched_text: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
    pub match_kind: MatchKind,
}

impl MatchSpan {
    /// Byte range of the match.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
