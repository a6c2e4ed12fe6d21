//! Loading gazetteer directories from disk and matching against them.

use std::fs;
use std::path::Path;

use grimoire_core::{EntityKind, MatchKind, NerConfig};
use grimoire_gazetteer::{GazetteerLoader, MatcherConfig, MatchingEngine};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_campaign_overrides_canonical() {
    let canonical = tempfile::tempdir().unwrap();
    let campaign = tempfile::tempdir().unwrap();

    write(
        canonical.path(),
        "spells.yaml",
        r#"
- name: Fireball
  level: 3
  school: evocation
- name: Magic Missile
  aliases: [MM]
"#,
    );
    write(
        canonical.path(),
        "monsters.json",
        r#"[{"name": "Goblin", "aliases": ["Goblins"]}]"#,
    );
    write(
        campaign.path(),
        "characters.yaml",
        r#"
- name: Grom Stonefist
  label: PC
  short_name: Grom
- name: Sildar Hallwinter
  entity_type: NPC
- name: Nameless
"#,
    );
    write(
        campaign.path(),
        "spells.yaml",
        r#"
- id: spell_fireball
  name: Fireball
  aliases: [Big Boom]
"#,
    );
    write(campaign.path(), "notes.txt", "not a gazetteer");

    let loader = GazetteerLoader::new(canonical.path(), campaign.path());
    let store = loader.load_store().unwrap();

    assert_eq!(store.len(), 5);
    let fireball = store.get("spell_fireball").unwrap();
    assert_eq!(fireball.aliases, vec!["Big Boom"]);
    assert!(fireball.metadata.get("level").is_none());

    let grom = store.get("pc_grom_stonefist").unwrap();
    assert_eq!(grom.kind, EntityKind::Pc);
    assert_eq!(grom.aliases, vec!["Grom"]);

    assert_eq!(store.get("npc_sildar_hallwinter").unwrap().kind, EntityKind::Npc);
    assert_eq!(store.get("monster_goblin").unwrap().kind, EntityKind::Monster);

    let engine = MatchingEngine::new(store, MatcherConfig::default()).unwrap();
    let spans = engine.find_all("Grom hurled a big boom at the Goblins");
    let ids: Vec<_> = spans.iter().map(|s| s.entry_id.as_str()).collect();
    assert_eq!(ids, vec!["pc_grom_stonefist", "spell_fireball", "monster_goblin"]);
    assert!(spans.iter().all(|s| s.match_kind == MatchKind::Exact));
}

#[test]
fn test_missing_directories_load_nothing() {
    let config = NerConfig::builder()
        .gazetteer_dirs("/nonexistent/canonical", "/nonexistent/campaign")
        .build();
    let entries = GazetteerLoader::from_config(&config).load_all().unwrap();
    assert!(entries.is_empty());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "items.yaml", "name: [unterminated");

    let loader = GazetteerLoader::new(dir.path(), "/nonexistent");
    assert!(loader.load_all().is_err());
}

#[test]
fn test_empty_file_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "items.yaml", "");

    let loader = GazetteerLoader::new(dir.path(), "/nonexistent");
    assert!(loader.load_all().unwrap().is_empty());
}
