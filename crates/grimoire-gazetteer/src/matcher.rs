//! Gazetteer matching engine.
//!
//! Exact names and aliases go through a single Aho-Corasick automaton built
//! over case-folded text; regex patterns are scanned independently. Results
//! are reduced to a non-overlapping span set. Fuzzy lookup compares one
//! candidate string against every name and is never run over a whole document.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, MatchKind as AcMatchKind};
use grimoire_core::similarity::ratio_percent;
use grimoire_core::{
    EntityKind, GazetteerEntry, GrimoireError, GrimoireResult, MatchKind, MatchSpan, NerConfig,
};
use regex::{Regex, RegexBuilder};

use crate::store::GazetteerStore;

/// Matching thresholds and confidences.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Minimum fuzzy score, 0-100.
    pub fuzzy_threshold: f32,
    pub exact_confidence: f32,
    pub pattern_confidence: f32,
    /// Upper bound for fuzzy match confidence.
    pub fuzzy_confidence: f32,
    /// Treat an empty gazetteer as a configuration error.
    pub require_loaded: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::from(&NerConfig::default())
    }
}

impl From<&NerConfig> for MatcherConfig {
    fn from(config: &NerConfig) -> Self {
        Self {
            fuzzy_threshold: config.fuzzy_threshold,
            exact_confidence: config.exact_confidence,
            pattern_confidence: config.pattern_confidence,
            fuzzy_confidence: config.fuzzy_confidence,
            require_loaded: config.require_gazetteer,
        }
    }
}

/// Multi-strategy gazetteer matcher. Immutable once built; rebuild to reload.
pub struct MatchingEngine {
    config: MatcherConfig,
    store: GazetteerStore,
    automaton: Option<AhoCorasick>,
    /// Automaton pattern index -> entry index.
    name_owners: Vec<usize>,
    regexes: Vec<(Regex, usize)>,
    /// Every non-empty name and alias, in load order.
    fuzzy_names: Vec<(String, usize)>,
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("entries", &self.store.len())
            .field("names", &self.name_owners.len())
            .field("patterns", &self.regexes.len())
            .finish()
    }
}

impl MatchingEngine {
    /// Build the engine over a gazetteer store.
    ///
    /// Malformed regex patterns are logged and skipped. When two entries share a
    /// folded name or alias the later entry owns it.
    pub fn new(store: GazetteerStore, config: MatcherConfig) -> GrimoireResult<Self> {
        let mut folded_index: HashMap<String, usize> = HashMap::new();
        let mut folded_names: Vec<String> = Vec::new();
        let mut name_owners: Vec<usize> = Vec::new();
        let mut regexes = Vec::new();
        let mut fuzzy_names = Vec::new();

        for (idx, entry) in store.iter().enumerate() {
            for name in entry.all_names() {
                if name.trim().is_empty() {
                    continue;
                }
                fuzzy_names.push((name.to_string(), idx));

                let folded = fold(name);
                match folded_index.get(&folded) {
                    Some(&pos) => name_owners[pos] = idx,
                    None => {
                        folded_index.insert(folded.clone(), folded_names.len());
                        folded_names.push(folded);
                        name_owners.push(idx);
                    }
                }
            }

            for pattern in &entry.patterns {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => regexes.push((re, idx)),
                    Err(e) => tracing::warn!(
                        entry = %entry.id,
                        pattern = %pattern,
                        error = %e,
                        "Skipping malformed gazetteer pattern"
                    ),
                }
            }
        }

        let automaton = if folded_names.is_empty() {
            None
        } else {
            let ac = AhoCorasick::builder()
                .match_kind(AcMatchKind::Standard)
                .build(&folded_names)
                .map_err(|e| GrimoireError::gazetteer(format!("failed to build automaton: {e}")))?;
            Some(ac)
        };

        tracing::debug!(
            entries = store.len(),
            names = folded_names.len(),
            patterns = regexes.len(),
            "Built matching engine"
        );

        Ok(Self {
            config,
            store,
            automaton,
            name_owners,
            regexes,
            fuzzy_names,
        })
    }

    /// Engine with no entries. Matches nothing unless `require_loaded` is set.
    pub fn empty(config: MatcherConfig) -> Self {
        Self {
            config,
            store: GazetteerStore::new(),
            automaton: None,
            name_owners: Vec::new(),
            regexes: Vec::new(),
            fuzzy_names: Vec::new(),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn store(&self) -> &GazetteerStore {
        &self.store
    }

    pub fn get_entry(&self, id: &str) -> Option<&GazetteerEntry> {
        self.store.get(id)
    }

    pub fn is_loaded(&self) -> bool {
        !self.store.is_empty()
    }

    /// Fail when a gazetteer was required but nothing was loaded.
    pub fn ensure_ready(&self) -> GrimoireResult<()> {
        if self.config.require_loaded && !self.is_loaded() {
            return Err(GrimoireError::gazetteer_not_loaded());
        }
        Ok(())
    }

    /// Exact and pattern matches, deduplicated to a non-overlapping set.
    pub fn find_all(&self, text: &str) -> Vec<MatchSpan> {
        let mut spans = self.find_exact(text);
        spans.extend(self.find_patterns(text));
        dedup_spans(spans)
    }

    /// Every word-bounded occurrence of a name or alias, possibly overlapping.
    pub fn find_exact(&self, text: &str) -> Vec<MatchSpan> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };

        let folded = FoldedText::new(text);
        let mut spans = Vec::new();

        for m in automaton.find_overlapping_iter(folded.as_str()) {
            let (Some(start), Some(end)) = (folded.original(m.start()), folded.original(m.end()))
            else {
                continue;
            };
            if start >= end || !is_word_bounded(text, start, end) {
                continue;
            }

            let entry = &self.store.entries()[self.name_owners[m.pattern().as_usize()]];
            spans.push(MatchSpan {
                entry_id: entry.id.clone(),
                matched_text: text[start..end].to_string(),
                start,
                end,
                confidence: self.config.exact_confidence,
                match_kind: MatchKind::Exact,
            });
        }

        spans
    }

    /// Every regex pattern hit, possibly overlapping.
    pub fn find_patterns(&self, text: &str) -> Vec<MatchSpan> {
        let entries = self.store.entries();
        let mut spans = Vec::new();

        for (re, idx) in &self.regexes {
            for m in re.find_iter(text) {
                if m.as_str().is_empty() {
                    continue;
                }
                spans.push(MatchSpan {
                    entry_id: entries[*idx].id.clone(),
                    matched_text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    confidence: self.config.pattern_confidence,
                    match_kind: MatchKind::Pattern,
                });
            }
        }

        spans
    }

    /// Best fuzzy match of a single candidate string against every name and alias.
    ///
    /// The returned span covers the candidate itself (`0..candidate.len()`).
    pub fn find_fuzzy(&self, candidate: &str, kind: Option<EntityKind>) -> Option<MatchSpan> {
        if candidate.trim().is_empty() {
            return None;
        }

        let entries = self.store.entries();
        let mut best: Option<(f32, usize)> = None;

        for (name, idx) in &self.fuzzy_names {
            if kind.is_some_and(|k| entries[*idx].kind != k) {
                continue;
            }
            let score = ratio_percent(candidate, name);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, *idx));
            }
        }

        let (score, idx) = best?;
        if score < self.config.fuzzy_threshold {
            return None;
        }

        Some(MatchSpan {
            entry_id: entries[idx].id.clone(),
            matched_text: candidate.to_string(),
            start: 0,
            end: candidate.len(),
            confidence: self.config.fuzzy_confidence.min(score / 100.0),
            match_kind: MatchKind::Fuzzy,
        })
    }
}

/// Keep a non-overlapping subset: earliest start first, then higher confidence,
/// then longer span, then lower entry id.
pub fn dedup_spans(mut spans: Vec<MatchSpan>) -> Vec<MatchSpan> {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });

    let mut kept: Vec<MatchSpan> = Vec::with_capacity(spans.len());
    let mut last_end = 0;
    for span in spans {
        if span.start >= last_end {
            last_end = span.end;
            kept.push(span);
        }
    }
    kept
}

fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Neither neighbour of `start..end` in the original text is alphanumeric.
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Lower-cased text with a map back to original byte offsets.
struct FoldedText {
    folded: String,
    /// Folded byte offset -> original byte offset; `None` inside a multi-char expansion.
    offsets: Vec<Option<usize>>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);

        for (orig, ch) in text.char_indices() {
            let before = folded.len();
            folded.extend(ch.to_lowercase());
            offsets.push(Some(orig));
            offsets.extend(std::iter::repeat(None).take(folded.len() - before - 1));
        }
        offsets.push(Some(text.len()));

        Self { folded, offsets }
    }

    fn as_str(&self) -> &str {
        &self.folded
    }

    fn original(&self, folded_offset: usize) -> Option<usize> {
        self.offsets.get(folded_offset).copied().flatten()
    }
}
