//! grimoire-resolution - Mention resolution and canonical linking.
//!
//! [`MentionResolver`] collapses near-duplicate mentions from independent
//! sources into one mention per identity. [`CanonicalLinker`] attaches the
//! survivors to records of a [`CanonicalStore`](grimoire_core::CanonicalStore),
//! optionally creating missing ones, through an explicitly refreshable
//! [`CanonicalCache`].

pub mod linker;
pub mod resolver;

pub use linker::{score_record, CanonicalCache, CanonicalLinker, LinkerConfig};
pub use resolver::{MentionResolver, ResolverConfig};
