//! Gazetteer loading from YAML and JSON entry lists.

use std::path::{Path, PathBuf};

use grimoire_core::{
    EntityKind, GazetteerEntry, GrimoireError, GrimoireResult, Metadata, NerConfig,
};
use serde_json::Value;

use crate::store::GazetteerStore;

/// Keys consumed by the loader; everything else lands in entry metadata.
const RESERVED_KEYS: &[&str] = &["id", "name", "entity_type", "type", "aliases", "patterns", "label"];

/// Reads gazetteer directories, canonical first then campaign.
#[derive(Debug, Clone)]
pub struct GazetteerLoader {
    canonical_dir: PathBuf,
    campaign_dir: PathBuf,
}

impl GazetteerLoader {
    pub fn new(canonical_dir: impl Into<PathBuf>, campaign_dir: impl Into<PathBuf>) -> Self {
        Self {
            canonical_dir: canonical_dir.into(),
            campaign_dir: campaign_dir.into(),
        }
    }

    /// Loader over the directories named in `config`.
    pub fn from_config(config: &NerConfig) -> Self {
        Self::new(&config.canonical_gazetteer_dir, &config.campaign_gazetteer_dir)
    }

    /// Load every entry from both directories in override order.
    ///
    /// Missing directories are skipped. Unreadable or malformed files are errors.
    pub fn load_all(&self) -> GrimoireResult<Vec<GazetteerEntry>> {
        let mut entries = Vec::new();
        for dir in [&self.canonical_dir, &self.campaign_dir] {
            if dir.is_dir() {
                entries.extend(self.load_directory(dir)?);
            } else {
                tracing::debug!(dir = %dir.display(), "Gazetteer directory not found, skipping");
            }
        }
        tracing::info!(count = entries.len(), "Loaded gazetteer entries");
        Ok(entries)
    }

    /// Load everything into an id-keyed store.
    pub fn load_store(&self) -> GrimoireResult<GazetteerStore> {
        Ok(GazetteerStore::from_entries(self.load_all()?))
    }

    /// Load all `.yaml`, `.yml` and `.json` files of a directory in file-name order.
    pub fn load_directory(&self, dir: &Path) -> GrimoireResult<Vec<GazetteerEntry>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml" | "yml" | "json")
                    )
            })
            .collect();
        files.sort();

        let mut entries = Vec::new();
        for file in files {
            entries.extend(self.load_file(&file)?);
        }
        Ok(entries)
    }

    /// Load a single gazetteer file.
    pub fn load_file(&self, path: &Path) -> GrimoireResult<Vec<GazetteerEntry>> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let data: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                GrimoireError::gazetteer(format!("{}: {}", path.display(), e))
            })?,
            _ => serde_yaml::from_str(&content).map_err(|e| {
                GrimoireError::gazetteer(format!("{}: {}", path.display(), e))
            })?,
        };

        let items = match data {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items,
            _ => {
                return Err(GrimoireError::gazetteer(format!(
                    "{}: expected a list of entries",
                    path.display()
                )))
            }
        };

        let default_kind = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(default_kind_for_file);

        let entries: Vec<GazetteerEntry> = items
            .iter()
            .filter_map(|item| {
                let entry = parse_entry(item, default_kind);
                if entry.is_none() {
                    tracing::warn!(file = %path.display(), "Skipping gazetteer entry without name or kind");
                }
                entry
            })
            .collect();

        tracing::debug!(file = %path.display(), count = entries.len(), "Loaded gazetteer file");
        Ok(entries)
    }
}

/// Kind implied by a conventional file name. `characters` mixes PCs and NPCs.
fn default_kind_for_file(stem: &str) -> Option<EntityKind> {
    match stem {
        "spells" => Some(EntityKind::Spell),
        "monsters" => Some(EntityKind::Monster),
        "items" => Some(EntityKind::Item),
        "classes" => Some(EntityKind::Class),
        "races" => Some(EntityKind::Race),
        "locations" => Some(EntityKind::Location),
        "factions" => Some(EntityKind::Faction),
        _ => None,
    }
}

fn parse_entry(item: &Value, default_kind: Option<EntityKind>) -> Option<GazetteerEntry> {
    let obj = item.as_object()?;
    let name = obj.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let kind = obj
        .get("entity_type")
        .or_else(|| obj.get("type"))
        .and_then(Value::as_str)
        .and_then(EntityKind::from_str_flexible)
        .or(default_kind)
        .or_else(|| {
            obj.get("label")
                .and_then(Value::as_str)
                .and_then(EntityKind::from_str_flexible)
        })?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{}_{}",
                kind.as_str().to_lowercase(),
                name.to_lowercase().replace(' ', "_")
            )
        });

    let mut aliases = string_list(obj.get("aliases"));
    if let Some(short) = obj.get("short_name").and_then(Value::as_str) {
        aliases.push(short.to_string());
    }

    let metadata: Metadata = obj
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut entry = GazetteerEntry::new(id, name, kind)
        .with_aliases(aliases)
        .with_patterns(string_list(obj.get("patterns")));
    entry.metadata = metadata;
    Some(entry)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
