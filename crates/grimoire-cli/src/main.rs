//! grimoire - extract entity mentions from campaign notes and transcripts.
//!
//! Each input file (or stdin when none is given) is run through the pipeline
//! and printed as one JSON extraction result per line.
//!
//! # Configuration
//!
//! - `GRIMOIRE_CONFIG` - Optional TOML/JSON/YAML config file; otherwise
//!   `GRIMOIRE_*` environment variables are read
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` - Enables LLM extraction
//! - `GRIMOIRE_DATA_DIR` - Optional, defaults to `~/.grimoire`
//!
//! A `.env` file in the working directory is loaded first.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grimoire_core::{
    CanonicalStoreConfig, CanonicalStoreProvider, ExtractionResult, LlmConfig, LlmProvider,
    NerConfig,
};
use grimoire_llm::{LlmExtractorConfig, LlmFactory, LlmMentionExtractor};
use grimoire_pipeline::NerPipeline;

#[derive(Parser)]
#[command(name = "grimoire")]
#[command(version)]
#[command(about = "Extract, resolve and link entity mentions in TTRPG session text")]
struct Cli {
    /// Input files (reads stdin if none are given)
    files: Vec<PathBuf>,

    /// Config file (TOML, JSON or YAML)
    #[arg(long, short, env = "GRIMOIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Session identifier attached to every result
    #[arg(long, short)]
    session: Option<String>,

    /// Skip LLM extraction even when an API key is available
    #[arg(long)]
    no_llm: bool,

    /// Keep canonical records in memory instead of the on-disk store
    #[arg(long)]
    ephemeral: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the results, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let pipeline = build_pipeline(config)?;

    let texts = read_inputs(&cli.files)?;
    let results = pipeline
        .extract_batch(&texts, cli.session.as_deref())
        .await
        .context("extraction failed")?;

    for result in &results {
        println!("{}", render(result, cli.pretty)?);
    }

    Ok(())
}

/// Load the config file or environment, then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<NerConfig> {
    let mut config = match &cli.config {
        Some(path) => NerConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => NerConfig::from_env(),
    };

    if cli.no_llm {
        config.use_llm_extraction = false;
    } else if config.use_llm_extraction && !llm_key_available(&config.llm) {
        tracing::info!("No LLM API key found, LLM extraction disabled");
        config.use_llm_extraction = false;
    }

    if !cli.ephemeral {
        apply_default_store(&mut config, &data_dir())?;
    }

    Ok(config)
}

/// Point an unconfigured canonical store at `<data_dir>/canonical.db`.
fn apply_default_store(config: &mut NerConfig, data_dir: &Path) -> Result<()> {
    if config.canonical_store.provider != CanonicalStoreProvider::Memory
        || config.canonical_store.path.is_some()
    {
        return Ok(());
    }

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let path = data_dir.join("canonical.db");
    tracing::info!("Canonical store: {}", path.display());
    config.canonical_store = CanonicalStoreConfig::embedded(path);
    Ok(())
}

fn data_dir() -> PathBuf {
    std::env::var("GRIMOIRE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".grimoire")
        })
}

/// An explicit key, a provider key in the environment, or a custom endpoint.
fn llm_key_available(llm: &LlmConfig) -> bool {
    let env_var = match llm.provider {
        LlmProvider::OpenAI => "OPENAI_API_KEY",
        LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
    };
    llm.api_key.is_some() || llm.base_url.is_some() || std::env::var(env_var).is_ok()
}

fn build_pipeline(config: NerConfig) -> Result<NerPipeline> {
    let mut builder = NerPipeline::builder(config.clone());

    if config.use_gazetteer {
        builder = builder.load_gazetteer();
    }

    if config.use_llm_extraction {
        let llm = LlmFactory::create(config.llm.clone()).context("failed to create LLM provider")?;
        tracing::info!(model = llm.model_name(), "LLM extraction enabled");
        let extractor = LlmMentionExtractor::new(llm, LlmExtractorConfig::from(&config));
        builder = builder.llm_extractor(Arc::new(extractor));
    }

    builder.build().context("failed to build pipeline")
}

/// Contents of each file, or all of stdin when `files` is empty.
fn read_inputs(files: &[PathBuf]) -> Result<Vec<String>> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(vec![text]);
    }

    files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))
        })
        .collect()
}

fn render(result: &ExtractionResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_inputs_preserves_file_order() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        write!(first, "Grom cast Fireball.").unwrap();
        write!(second, "Phandalin burns.").unwrap();

        let texts = read_inputs(&[second.path().to_path_buf(), first.path().to_path_buf()])
            .unwrap();
        assert_eq!(texts, vec!["Phandalin burns.", "Grom cast Fireball."]);
    }

    #[test]
    fn test_read_inputs_missing_file() {
        let err = read_inputs(&[PathBuf::from("/nonexistent/session.txt")]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/session.txt"));
    }

    #[test]
    fn test_default_store_is_embedded_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("grimoire");
        let mut config = NerConfig::default();

        apply_default_store(&mut config, &data_dir).unwrap();

        assert_eq!(config.canonical_store.provider, CanonicalStoreProvider::Embedded);
        assert_eq!(config.canonical_store.path, Some(data_dir.join("canonical.db")));
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_explicit_store_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NerConfig {
            canonical_store: CanonicalStoreConfig::embedded("/srv/campaign.db"),
            ..Default::default()
        };

        apply_default_store(&mut config, dir.path()).unwrap();
        assert_eq!(config.canonical_store.path, Some(PathBuf::from("/srv/campaign.db")));
    }

    #[test]
    fn test_custom_endpoint_counts_as_available() {
        let llm = LlmConfig {
            base_url: Some("http://localhost:11434/v1".to_string()),
            ..Default::default()
        };
        assert!(llm_key_available(&llm));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["grimoire", "--no-llm", "-s", "s1", "notes.md"]);
        assert!(cli.no_llm);
        assert_eq!(cli.session.as_deref(), Some("s1"));
        assert_eq!(cli.files, vec![PathBuf::from("notes.md")]);
    }
}
