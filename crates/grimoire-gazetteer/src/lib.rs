//! grimoire-gazetteer - Gazetteer loading and matching for grimoire.
//!
//! A [`GazetteerLoader`] reads declarative entry lists from disk into a
//! [`GazetteerStore`]. A [`MatchingEngine`] built over the store finds exact,
//! pattern and fuzzy hits in text, and [`GazetteerExtractor`] turns those hits
//! into gazetteer-sourced mentions.

pub mod extractor;
pub mod loader;
pub mod matcher;
pub mod store;

pub use extractor::GazetteerExtractor;
pub use loader::GazetteerLoader;
pub use matcher::{MatcherConfig, MatchingEngine};
pub use store::GazetteerStore;
