//! Configuration system for grimoire.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GrimoireError, GrimoireResult};
use crate::traits::{LlmConfig, LlmProvider};

/// Canonical store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStoreProvider {
    /// Process-local store, lost on exit.
    #[default]
    Memory,
    /// SQLite-backed store.
    Embedded,
}

/// Canonical store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalStoreConfig {
    #[serde(default)]
    pub provider: CanonicalStoreProvider,
    /// Database path for the embedded provider. In-memory SQLite when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CanonicalStoreConfig {
    /// Embedded store at `path`.
    pub fn embedded(path: impl Into<PathBuf>) -> Self {
        Self {
            provider: CanonicalStoreProvider::Embedded,
            path: Some(path.into()),
        }
    }
}

/// Extraction pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Shipped rule-system gazetteers, loaded first.
    pub canonical_gazetteer_dir: PathBuf,
    /// Campaign-specific gazetteers, loaded last so they override.
    pub campaign_gazetteer_dir: PathBuf,

    /// Minimum fuzzy score on the 0-100 scale.
    pub fuzzy_threshold: f32,
    /// Mentions below this confidence are dropped from the result.
    pub confidence_threshold: f32,
    /// Name similarity required to cluster or link, 0.0-1.0.
    pub similarity_threshold: f32,

    pub exact_confidence: f32,
    pub pattern_confidence: f32,
    pub fuzzy_confidence: f32,
    /// Confidence assigned by statistical tagger implementations.
    pub statistical_confidence: f32,
    /// Confidence assigned to LLM-extracted mentions.
    pub llm_confidence: f32,

    pub use_gazetteer: bool,
    pub use_statistical: bool,
    pub use_llm_extraction: bool,
    pub link_to_canonical: bool,
    pub auto_create_missing: bool,
    /// Fail instead of matching nothing when no gazetteer was loaded.
    pub require_gazetteer: bool,

    /// Maximum characters of text sent to the LLM per call.
    pub llm_chunk_size: usize,
    pub llm_timeout_secs: u64,

    /// Concurrent invocations inside `extract_batch`.
    pub batch_concurrency: usize,
    /// Refresh the canonical cache at the start of every single-text extraction.
    pub refresh_cache_per_request: bool,

    pub canonical_store: CanonicalStoreConfig,
    pub llm: LlmConfig,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            canonical_gazetteer_dir: PathBuf::from("data/gazetteers/canonical"),
            campaign_gazetteer_dir: PathBuf::from("data/gazetteers/campaign"),
            fuzzy_threshold: 85.0,
            confidence_threshold: 0.5,
            similarity_threshold: 0.85,
            exact_confidence: 0.95,
            pattern_confidence: 0.75,
            fuzzy_confidence: 0.75,
            statistical_confidence: 0.6,
            llm_confidence: 0.8,
            use_gazetteer: true,
            use_statistical: true,
            use_llm_extraction: true,
            link_to_canonical: true,
            auto_create_missing: false,
            require_gazetteer: false,
            llm_chunk_size: 2000,
            llm_timeout_secs: 30,
            batch_concurrency: 10,
            refresh_cache_per_request: true,
            canonical_store: CanonicalStoreConfig::default(),
            llm: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                ..Default::default()
            },
        }
    }
}

impl NerConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GrimoireResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GrimoireError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GrimoireError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GrimoireError::Configuration(e.to_string()))?,
            _ => {
                return Err(GrimoireError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `GRIMOIRE_*` environment variables over the defaults.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("GRIMOIRE_CANONICAL_GAZETTEER_DIR") {
            config.canonical_gazetteer_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("GRIMOIRE_CAMPAIGN_GAZETTEER_DIR") {
            config.campaign_gazetteer_dir = PathBuf::from(dir);
        }

        env_parse("GRIMOIRE_FUZZY_THRESHOLD", &mut config.fuzzy_threshold);
        env_parse("GRIMOIRE_CONFIDENCE_THRESHOLD", &mut config.confidence_threshold);
        env_parse("GRIMOIRE_SIMILARITY_THRESHOLD", &mut config.similarity_threshold);
        env_parse("GRIMOIRE_USE_GAZETTEER", &mut config.use_gazetteer);
        env_parse("GRIMOIRE_USE_STATISTICAL", &mut config.use_statistical);
        env_parse("GRIMOIRE_USE_LLM_EXTRACTION", &mut config.use_llm_extraction);
        env_parse("GRIMOIRE_LINK_TO_CANONICAL", &mut config.link_to_canonical);
        env_parse("GRIMOIRE_AUTO_CREATE_MISSING", &mut config.auto_create_missing);
        env_parse("GRIMOIRE_REQUIRE_GAZETTEER", &mut config.require_gazetteer);
        env_parse("GRIMOIRE_LLM_TIMEOUT_SECS", &mut config.llm_timeout_secs);
        env_parse("GRIMOIRE_BATCH_CONCURRENCY", &mut config.batch_concurrency);

        // LLM configuration
        if let Ok(provider) = std::env::var("GRIMOIRE_LLM_PROVIDER") {
            config.llm.provider = match provider.to_lowercase().as_str() {
                "anthropic" => LlmProvider::Anthropic,
                _ => LlmProvider::OpenAI,
            };
        }
        if let Ok(model) = std::env::var("GRIMOIRE_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("GRIMOIRE_LLM_BASE_URL") {
            config.llm.base_url = Some(base_url);
        }
        let key_var = match config.llm.provider {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        };
        if let Ok(api_key) = std::env::var(key_var) {
            config.llm.api_key = Some(api_key);
        }

        // Canonical store
        if let Ok(path) = std::env::var("GRIMOIRE_CANONICAL_DB_PATH") {
            config.canonical_store = CanonicalStoreConfig::embedded(path);
        }

        config
    }

    /// Create a builder for configuration.
    pub fn builder() -> NerConfigBuilder {
        NerConfigBuilder::default()
    }

    /// Check thresholds and limits.
    pub fn validate(&self) -> GrimoireResult<()> {
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(GrimoireError::Configuration(format!(
                "fuzzy_threshold must be within 0-100, got {}",
                self.fuzzy_threshold
            )));
        }

        let unit_ranged = [
            ("confidence_threshold", self.confidence_threshold),
            ("similarity_threshold", self.similarity_threshold),
            ("exact_confidence", self.exact_confidence),
            ("pattern_confidence", self.pattern_confidence),
            ("fuzzy_confidence", self.fuzzy_confidence),
            ("statistical_confidence", self.statistical_confidence),
            ("llm_confidence", self.llm_confidence),
        ];
        for (name, value) in unit_ranged {
            if !(0.0..=1.0).contains(&value) {
                return Err(GrimoireError::Configuration(format!(
                    "{name} must be within 0.0-1.0, got {value}"
                )));
            }
        }

        if self.batch_concurrency == 0 {
            return Err(GrimoireError::Configuration(
                "batch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.llm_chunk_size == 0 {
            return Err(GrimoireError::Configuration(
                "llm_chunk_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(var, value = %raw, "Ignoring unparseable environment value"),
        }
    }
}

/// Builder for NerConfig.
#[derive(Default)]
pub struct NerConfigBuilder {
    config: NerConfig,
}

impl NerConfigBuilder {
    /// Set both gazetteer directories.
    pub fn gazetteer_dirs(
        mut self,
        canonical: impl Into<PathBuf>,
        campaign: impl Into<PathBuf>,
    ) -> Self {
        self.config.canonical_gazetteer_dir = canonical.into();
        self.config.campaign_gazetteer_dir = campaign.into();
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.config.fuzzy_threshold = threshold;
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Toggle the gazetteer, statistical tagger and LLM sources.
    pub fn sources(mut self, gazetteer: bool, statistical: bool, llm: bool) -> Self {
        self.config.use_gazetteer = gazetteer;
        self.config.use_statistical = statistical;
        self.config.use_llm_extraction = llm;
        self
    }

    pub fn link_to_canonical(mut self, enabled: bool) -> Self {
        self.config.link_to_canonical = enabled;
        self
    }

    pub fn auto_create_missing(mut self, enabled: bool) -> Self {
        self.config.auto_create_missing = enabled;
        self
    }

    pub fn require_gazetteer(mut self, required: bool) -> Self {
        self.config.require_gazetteer = required;
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs;
        self
    }

    pub fn batch_concurrency(mut self, limit: usize) -> Self {
        self.config.batch_concurrency = limit;
        self
    }

    pub fn refresh_cache_per_request(mut self, enabled: bool) -> Self {
        self.config.refresh_cache_per_request = enabled;
        self
    }

    /// Set canonical store configuration.
    pub fn canonical_store(mut self, config: CanonicalStoreConfig) -> Self {
        self.config.canonical_store = config;
        self
    }

    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> NerConfig {
        self.config
    }
}
