//! grimoire-pipeline - End-to-end mention extraction.
//!
//! [`NerPipeline`] runs the gazetteer matcher and an optional statistical
//! tagger, resolves their mentions across sources, optionally asks an LLM for
//! anything they missed, links the result to canonical records and filters by
//! confidence.
//!
//! # Example
//!
//! ```ignore
//! use grimoire_pipeline::NerPipeline;
//!
//! let pipeline = NerPipeline::builder(config)
//!     .load_gazetteer()
//!     .llm_extractor(extractor)
//!     .build()?;
//!
//! let result = pipeline.extract("Grom cast Fireball", Some("session-1"), None).await?;
//! ```

mod builder;
mod pipeline;

pub use builder::NerPipelineBuilder;
pub use pipeline::NerPipeline;
