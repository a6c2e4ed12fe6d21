//! Cross-source mention resolution.
//!
//! Mentions are partitioned by kind, then greedily clustered highest-confidence
//! first on normalized-name similarity. Each cluster collapses into one mention
//! whose confidence is boosted by how many distinct sources agreed on it.

use std::collections::BTreeSet;

use grimoire_core::similarity::ratio;
use grimoire_core::{CandidateMention, EntityKind, MentionSource, NerConfig, ResolvedMention};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for mention resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Name similarity (0.0 - 1.0) needed to join a cluster.
    /// Default: 0.85
    pub similarity_threshold: f32,
    /// Confidence added per extra distinct source.
    /// Default: 0.1
    pub source_boost: f32,
    /// Cap on the total boost.
    /// Default: 0.2
    pub max_boost: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            source_boost: 0.1,
            max_boost: 0.2,
        }
    }
}

impl ResolverConfig {
    /// Create a resolver config with a custom threshold.
    pub fn with_threshold(similarity_threshold: f32) -> Self {
        Self {
            similarity_threshold,
            ..Default::default()
        }
    }
}

impl From<&NerConfig> for ResolverConfig {
    fn from(config: &NerConfig) -> Self {
        Self::with_threshold(config.similarity_threshold)
    }
}

/// Greedy, deterministic mention clustering.
#[derive(Debug, Clone, Default)]
pub struct MentionResolver {
    config: ResolverConfig,
}

impl MentionResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Collapse `mentions` to one mention per identity.
    ///
    /// Output is grouped by kind in order of each kind's first appearance, and
    /// within a kind ordered by cluster seed confidence. Mentions of different
    /// kinds are never merged.
    pub fn resolve(&self, mentions: Vec<CandidateMention>) -> Vec<ResolvedMention> {
        let mut partitions: Vec<(EntityKind, Vec<CandidateMention>)> = Vec::new();
        for mention in mentions {
            match partitions.iter_mut().find(|(kind, _)| *kind == mention.kind) {
                Some((_, group)) => group.push(mention),
                None => partitions.push((mention.kind, vec![mention])),
            }
        }

        partitions
            .into_iter()
            .flat_map(|(_, group)| self.resolve_group(group))
            .collect()
    }

    fn resolve_group(&self, mut group: Vec<CandidateMention>) -> Vec<ResolvedMention> {
        // Stable, so equal confidences keep input order.
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut assigned = vec![false; group.len()];
        let mut resolved = Vec::new();

        for seed in 0..group.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;

            let mut cluster = vec![&group[seed]];
            for other in seed + 1..group.len() {
                if assigned[other] {
                    continue;
                }
                let similarity = ratio(&group[seed].normalized_name, &group[other].normalized_name);
                if similarity >= self.config.similarity_threshold {
                    assigned[other] = true;
                    cluster.push(&group[other]);
                }
            }

            resolved.push(self.merge_cluster(&cluster));
        }

        resolved
    }

    fn merge_cluster(&self, cluster: &[&CandidateMention]) -> ResolvedMention {
        let base = cluster
            .iter()
            .find(|m| m.source == MentionSource::Gazetteer)
            .unwrap_or(&cluster[0]);

        let sources: BTreeSet<MentionSource> = cluster.iter().map(|m| m.source).collect();
        let extra = sources.len().saturating_sub(1) as f32;
        let boost = (self.config.source_boost * extra).min(self.config.max_boost);

        let mut merged = (*base).clone();
        merged.confidence = (base.confidence + boost).min(1.0);
        if sources.len() > 1 {
            merged.source = MentionSource::Hybrid;
        }
        if merged.span.is_none() {
            merged.span = cluster.iter().find_map(|m| m.span);
        }
        if merged.canonical_id.is_none() {
            merged.canonical_id = cluster.iter().find_map(|m| m.canonical_id.clone());
        }
        if merged.gazetteer_id.is_none() {
            merged.gazetteer_id = cluster.iter().find_map(|m| m.gazetteer_id.clone());
        }

        let source_labels: Vec<&'static str> = sources.iter().map(|s| (*s).into()).collect();
        merged.metadata.insert("merged_count".to_string(), json!(cluster.len()));
        merged.metadata.insert("sources".to_string(), json!(source_labels));

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(text: &str, kind: EntityKind, confidence: f32, source: MentionSource) -> CandidateMention {
        CandidateMention::new(text, kind, confidence, source)
    }

    #[test]
    fn test_fireball_scenario() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Fireball", EntityKind::Spell, 0.9, MentionSource::Gazetteer)
                .with_gazetteer_id("sp1")
                .with_span(10, 18),
            mention("fireball", EntityKind::Spell, 0.6, MentionSource::Statistical),
        ]);

        assert_eq!(resolved.len(), 1);
        let m = &resolved[0];
        assert_eq!(m.normalized_name, "Fireball");
        assert_eq!(m.source, MentionSource::Hybrid);
        assert!((m.confidence - 1.0).abs() < 1e-6);
        assert_eq!(m.gazetteer_id.as_deref(), Some("sp1"));
        assert_eq!(m.merged_count(), 2);
        assert_eq!(m.metadata["sources"], json!(["statistical", "gazetteer"]));
    }

    #[test]
    fn test_gazetteer_base_wins_over_higher_confidence() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Goblins", EntityKind::Monster, 0.95, MentionSource::Llm).with_span(0, 7),
            mention("goblin", EntityKind::Monster, 0.7, MentionSource::Gazetteer)
                .with_normalized_name("Goblin"),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].normalized_name, "Goblin");
        assert!((resolved[0].confidence - 0.8).abs() < 1e-6);
        // Base had no span; the first spanned member supplies it.
        assert_eq!(resolved[0].span.map(|s| s.start), Some(0));
    }

    #[test]
    fn test_plural_merges_with_singular() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Orc", EntityKind::Monster, 0.9, MentionSource::Gazetteer),
            mention("Orcs", EntityKind::Monster, 0.6, MentionSource::Statistical),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].normalized_name, "Orc");
        assert_eq!(resolved[0].source, MentionSource::Hybrid);
        assert_eq!(resolved[0].merged_count(), 2);
    }

    #[test]
    fn test_kinds_never_merge() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Shield", EntityKind::Spell, 0.9, MentionSource::Gazetteer),
            mention("Shield", EntityKind::Item, 0.9, MentionSource::Gazetteer),
        ]);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].kind, EntityKind::Spell);
        assert_eq!(resolved[1].kind, EntityKind::Item);
        assert_eq!(resolved[0].source, MentionSource::Gazetteer);
    }

    #[test]
    fn test_same_source_gets_no_boost() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Strahd", EntityKind::Npc, 0.6, MentionSource::Statistical),
            mention("Strahd", EntityKind::Npc, 0.5, MentionSource::Statistical),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].confidence, 0.6);
        assert_eq!(resolved[0].source, MentionSource::Statistical);
        assert_eq!(resolved[0].merged_count(), 2);
    }

    #[test]
    fn test_fusion_bound() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Neverwinter", EntityKind::Location, 0.5, MentionSource::Gazetteer),
            mention("Neverwinter", EntityKind::Location, 0.5, MentionSource::Statistical),
            mention("Neverwinter", EntityKind::Location, 0.5, MentionSource::Llm),
            mention("Neverwinter", EntityKind::Location, 0.5, MentionSource::Hybrid),
        ]);

        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].confidence <= 0.5 + 0.2 + 1e-6);
        assert!((resolved[0].confidence - 0.7).abs() < 1e-6);

        let capped = resolver.resolve(vec![
            mention("Tiamat", EntityKind::Monster, 0.95, MentionSource::Gazetteer),
            mention("Tiamat", EntityKind::Monster, 0.9, MentionSource::Llm),
        ]);
        assert_eq!(capped[0].confidence, 1.0);
    }

    #[test]
    fn test_dissimilar_names_stay_apart() {
        let resolver = MentionResolver::default();
        let resolved = resolver.resolve(vec![
            mention("Sildar", EntityKind::Npc, 0.8, MentionSource::Llm),
            mention("Gundren", EntityKind::Npc, 0.9, MentionSource::Llm),
        ]);

        let names: Vec<_> = resolved.iter().map(|m| m.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["Gundren", "Sildar"]);
        assert!(resolved.iter().all(|m| m.merged_count() == 1));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let input = vec![
            mention("Firebal", EntityKind::Spell, 0.6, MentionSource::Statistical),
            mention("Fireball", EntityKind::Spell, 0.75, MentionSource::Gazetteer),
            mention("Fire Bolt", EntityKind::Spell, 0.8, MentionSource::Llm),
            mention("Fireball", EntityKind::Spell, 0.8, MentionSource::Llm),
        ];
        let resolver = MentionResolver::default();

        let first = resolver.resolve(input.clone());
        let second = resolver.resolve(input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        assert!(MentionResolver::default().resolve(Vec::new()).is_empty());
    }
}
