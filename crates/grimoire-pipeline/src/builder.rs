//! Builder for [`NerPipeline`].

use std::sync::Arc;

use grimoire_core::{
    CanonicalStore, GrimoireError, GrimoireResult, MentionExtractor, NerConfig, StatisticalTagger,
};
use grimoire_gazetteer::{GazetteerExtractor, GazetteerLoader, GazetteerStore, MatcherConfig};
use grimoire_resolution::{CanonicalLinker, LinkerConfig};
use grimoire_stores::CanonicalStoreFactory;

use crate::pipeline::NerPipeline;

/// Assembles a pipeline from a config and its collaborators.
///
/// Every collaborator is optional. A missing canonical store is created from
/// `config.canonical_store` when linking is enabled.
pub struct NerPipelineBuilder {
    config: NerConfig,
    gazetteer: Option<GazetteerStore>,
    load_gazetteer: bool,
    tagger: Option<Arc<dyn StatisticalTagger>>,
    llm: Option<Arc<dyn MentionExtractor>>,
    canonical_store: Option<Arc<dyn CanonicalStore>>,
}

impl NerPipelineBuilder {
    pub fn new(config: NerConfig) -> Self {
        Self {
            config,
            gazetteer: None,
            load_gazetteer: false,
            tagger: None,
            llm: None,
            canonical_store: None,
        }
    }

    /// Use an already loaded gazetteer.
    pub fn gazetteer(mut self, store: GazetteerStore) -> Self {
        self.gazetteer = Some(store);
        self
    }

    /// Load the gazetteer from the configured directories at build time.
    pub fn load_gazetteer(mut self) -> Self {
        self.load_gazetteer = true;
        self
    }

    pub fn tagger(mut self, tagger: Arc<dyn StatisticalTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn llm_extractor(mut self, extractor: Arc<dyn MentionExtractor>) -> Self {
        self.llm = Some(extractor);
        self
    }

    pub fn canonical_store(mut self, store: Arc<dyn CanonicalStore>) -> Self {
        self.canonical_store = Some(store);
        self
    }

    /// Validate the config and assemble the pipeline.
    ///
    /// Fails when `require_gazetteer` is set and no non-empty gazetteer is
    /// available.
    pub fn build(self) -> GrimoireResult<NerPipeline> {
        let config = self.config;
        config.validate()?;

        let store = match (self.gazetteer, self.load_gazetteer) {
            (Some(store), _) => Some(store),
            (None, true) => Some(GazetteerLoader::from_config(&config).load_store()?),
            (None, false) => None,
        };

        if config.use_gazetteer
            && config.require_gazetteer
            && store.as_ref().map_or(true, GazetteerStore::is_empty)
        {
            return Err(GrimoireError::gazetteer_not_loaded());
        }

        let gazetteer = store
            .map(|store| GazetteerExtractor::from_store(store, MatcherConfig::from(&config)))
            .transpose()?;

        let linker = if config.link_to_canonical {
            let store = match self.canonical_store {
                Some(store) => store,
                None => CanonicalStoreFactory::create(&config.canonical_store)?,
            };
            Some(CanonicalLinker::new(store, LinkerConfig::from(&config)))
        } else {
            None
        };

        tracing::info!(
            gazetteer_entries = gazetteer.as_ref().map_or(0, |g| g.engine().store().len()),
            statistical = self.tagger.is_some(),
            llm = self.llm.is_some(),
            linking = linker.is_some(),
            "NER pipeline ready"
        );

        Ok(NerPipeline::from_parts(
            config,
            gazetteer,
            self.tagger,
            self.llm,
            linker,
        ))
    }
}
