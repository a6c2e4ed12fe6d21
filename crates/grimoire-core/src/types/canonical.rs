//! Canonical record as seen by the linker.

use serde::{Deserialize, Serialize};

use super::kind::EntityKind;
use super::mention::Metadata;

/// A persisted, authoritative entity owned by the canonical store.
///
/// Only the fields needed for similarity scoring are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub properties: Metadata,
}

impl CanonicalRecord {
    /// Create a record without aliases.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            aliases: Vec::new(),
            properties: Metadata::new(),
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

    /// Case-insensitive check against the name and every alias.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.name.to_lowercase() == name || self.aliases.iter().any(|a| a.to_lowercase() == name)
    }
}
