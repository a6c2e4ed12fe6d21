//! grimoire-stores - Canonical store implementations for grimoire.
//!
//! This crate provides implementations of the `CanonicalStore` trait:
//! - In-memory store for tests and ephemeral sessions
//! - Embedded SQLite store (enabled by default via the `embedded` feature)

pub mod factory;
pub mod memory;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use factory::CanonicalStoreFactory;
pub use memory::InMemoryCanonicalStore;

#[cfg(feature = "embedded")]
pub use embedded::EmbeddedCanonicalStore;
