//! The extraction pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use grimoire_core::similarity::ratio_percent;
use grimoire_core::{
    CandidateMention, ExtractionError, ExtractionResult, GrimoireError, GrimoireResult,
    LlmExtraction, MentionExtractor, MentionSource, NerConfig, ResolvedMention,
    StatisticalTagger,
};
use grimoire_gazetteer::{GazetteerExtractor, GazetteerStore, MatcherConfig};
use grimoire_resolution::{CanonicalLinker, MentionResolver};

use crate::builder::NerPipelineBuilder;

/// Noun chunks this short are not worth a fuzzy lookup.
const MIN_FUZZY_CHUNK_CHARS: usize = 3;

/// Orders the extraction sources, resolution and linking for each request.
///
/// The gazetteer engine and the linker cache are the only state shared
/// between concurrent invocations. Everything else is owned per call.
pub struct NerPipeline {
    config: NerConfig,
    gazetteer: RwLock<Option<Arc<GazetteerExtractor>>>,
    tagger: Option<Arc<dyn StatisticalTagger>>,
    llm: Option<Arc<dyn MentionExtractor>>,
    resolver: MentionResolver,
    linker: Option<CanonicalLinker>,
}

/// Mentions gathered from the local sources before resolution.
struct Gathered {
    mentions: Vec<CandidateMention>,
    degraded: Vec<MentionSource>,
}

impl NerPipeline {
    /// Start building a pipeline.
    pub fn builder(config: NerConfig) -> NerPipelineBuilder {
        NerPipelineBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: NerConfig,
        gazetteer: Option<GazetteerExtractor>,
        tagger: Option<Arc<dyn StatisticalTagger>>,
        llm: Option<Arc<dyn MentionExtractor>>,
        linker: Option<CanonicalLinker>,
    ) -> Self {
        let resolver = MentionResolver::new((&config).into());
        Self {
            config,
            gazetteer: RwLock::new(gazetteer.map(Arc::new)),
            tagger,
            llm,
            resolver,
            linker,
        }
    }

    pub fn config(&self) -> &NerConfig {
        &self.config
    }

    pub fn linker(&self) -> Option<&CanonicalLinker> {
        self.linker.as_ref()
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// The gazetteer extractor currently in use.
    pub async fn gazetteer(&self) -> Option<Arc<GazetteerExtractor>> {
        self.gazetteer.read().await.clone()
    }

    /// Rebuild the matching engine over `store` and swap it in.
    ///
    /// Invocations already running keep the engine they started with.
    pub async fn reload_gazetteer(&self, store: GazetteerStore) -> GrimoireResult<()> {
        let entries = store.len();
        let extractor = GazetteerExtractor::from_store(store, MatcherConfig::from(&self.config))?;
        *self.gazetteer.write().await = Some(Arc::new(extractor));
        tracing::info!(entries, "Gazetteer reloaded");
        Ok(())
    }

    /// Drop cached canonical records so external creations become visible.
    pub async fn refresh_cache(&self) {
        if let Some(linker) = &self.linker {
            linker.refresh_cache().await;
        }
    }

    /// Extract, resolve and link the mentions in `text`.
    ///
    /// `use_llm` overrides `use_llm_extraction` for this call. LLM failures and
    /// timeouts degrade to an empty contribution; the only error surfaced is a
    /// required gazetteer that is not loaded.
    pub async fn extract(
        &self,
        text: &str,
        session_id: Option<&str>,
        use_llm: Option<bool>,
    ) -> GrimoireResult<ExtractionResult> {
        if self.config.refresh_cache_per_request {
            self.refresh_cache().await;
        }
        self.run(text, session_id, use_llm).await
    }

    /// Extract every text, up to `batch_concurrency` at a time.
    ///
    /// The canonical cache is refreshed once for the whole batch. Results are in
    /// input order.
    pub async fn extract_batch(
        &self,
        texts: &[String],
        session_id: Option<&str>,
    ) -> GrimoireResult<Vec<ExtractionResult>> {
        self.refresh_cache().await;

        let results: Vec<GrimoireResult<ExtractionResult>> = stream::iter(texts)
            .map(|text| self.run(text, session_id, None))
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        results.into_iter().collect()
    }

    async fn run(
        &self,
        text: &str,
        session_id: Option<&str>,
        use_llm: Option<bool>,
    ) -> GrimoireResult<ExtractionResult> {
        let started = Instant::now();

        let Gathered {
            mentions,
            mut degraded,
        } = self.gather(text).await?;
        let mut resolved = self.resolver.resolve(mentions);

        let mut relationships = Vec::new();
        let llm = self
            .llm
            .as_ref()
            .filter(|_| use_llm.unwrap_or(self.config.use_llm_extraction));
        if let Some(extractor) = llm {
            let known_names: Vec<String> =
                resolved.iter().map(|m| m.normalized_name.clone()).collect();

            match self.call_llm(&**extractor, text, &known_names).await {
                Ok(extraction) => {
                    let fresh: Vec<CandidateMention> = extraction
                        .mentions
                        .into_iter()
                        .filter(|m| !self.already_resolved(m, &resolved))
                        .collect();
                    tracing::debug!(new = fresh.len(), "LLM mentions added");
                    resolved.extend(self.resolver.resolve(fresh));
                    relationships = extraction.relationships;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "LLM extraction failed, continuing without it");
                    degraded.push(MentionSource::Llm);
                }
            }
        }

        let linked = match &self.linker {
            Some(linker) if self.config.link_to_canonical => linker.link_all(resolved).await,
            _ => resolved,
        };

        let before_filter = linked.len();
        let mentions: Vec<ResolvedMention> = linked
            .into_iter()
            .filter(|m| m.confidence >= self.config.confidence_threshold)
            .collect();

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            mentions = mentions.len(),
            filtered = before_filter - mentions.len(),
            relationships = relationships.len(),
            processing_time_ms,
            "Extraction complete"
        );

        Ok(ExtractionResult {
            mentions,
            relationships,
            source_text: text.to_string(),
            session_id: session_id.map(str::to_string),
            processing_time_ms,
            degraded_sources: degraded,
        })
    }

    /// Run the gazetteer and the tagger side by side on blocking threads, then
    /// fuzzy-match the tagger's noun chunks against the gazetteer.
    async fn gather(&self, text: &str) -> GrimoireResult<Gathered> {
        let gazetteer = if self.config.use_gazetteer {
            self.gazetteer().await
        } else {
            None
        };
        let tagger = self
            .tagger
            .clone()
            .filter(|_| self.config.use_statistical);

        let gazetteer_task = gazetteer.clone().map(|extractor| {
            let text = text.to_string();
            tokio::task::spawn_blocking(move || extractor.extract(&text))
        });
        let tagger_task = tagger.map(|tagger| {
            let text = text.to_string();
            tokio::task::spawn_blocking(move || (tagger.extract(&text), tagger.noun_chunks(&text)))
        });

        let mut degraded = Vec::new();

        let (tagged, noun_chunks) = match tagger_task {
            Some(task) => match task.await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(error = %e, "Statistical tagger failed, continuing without it");
                    degraded.push(MentionSource::Statistical);
                    (Vec::new(), Vec::new())
                }
            },
            None => (Vec::new(), Vec::new()),
        };

        let matched = match gazetteer_task {
            Some(task) => task
                .await
                .map_err(|e| GrimoireError::internal(format!("gazetteer task failed: {e}")))??,
            None => Vec::new(),
        };

        let fuzzy = match &gazetteer {
            Some(extractor) if !noun_chunks.is_empty() => {
                let chunks: Vec<String> = noun_chunks
                    .into_iter()
                    .filter(|c| c.chars().count() >= MIN_FUZZY_CHUNK_CHARS)
                    .collect();
                extractor.extract_with_fuzzy(text, &chunks)?
            }
            _ => Vec::new(),
        };

        tracing::debug!(
            statistical = tagged.len(),
            gazetteer = matched.len(),
            fuzzy = fuzzy.len(),
            "Gathered candidate mentions"
        );

        let mut mentions = tagged;
        mentions.extend(matched);
        mentions.extend(fuzzy);

        Ok(Gathered { mentions, degraded })
    }

    async fn call_llm(
        &self,
        extractor: &dyn MentionExtractor,
        text: &str,
        known_names: &[String],
    ) -> Result<LlmExtraction, ExtractionError> {
        let limit = Duration::from_secs(self.config.llm_timeout_secs);
        match tokio::time::timeout(limit, extractor.extract(text, known_names)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(limit)),
        }
    }

    /// Same kind and a name closer than the fuzzy threshold.
    fn already_resolved(&self, candidate: &CandidateMention, resolved: &[ResolvedMention]) -> bool {
        resolved.iter().any(|existing| {
            existing.kind == candidate.kind
                && ratio_percent(&existing.normalized_name, &candidate.normalized_name)
                    > self.config.fuzzy_threshold
        })
    }
}
