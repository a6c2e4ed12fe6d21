//! Factory for creating canonical store providers.

use std::sync::Arc;

use grimoire_core::config::{CanonicalStoreConfig, CanonicalStoreProvider};
use grimoire_core::error::{GrimoireError, GrimoireResult};
use grimoire_core::traits::CanonicalStore;

use crate::memory::InMemoryCanonicalStore;

/// Factory for creating canonical store providers.
pub struct CanonicalStoreFactory;

impl CanonicalStoreFactory {
    /// Create a canonical store from the given configuration.
    pub fn create(config: &CanonicalStoreConfig) -> GrimoireResult<Arc<dyn CanonicalStore>> {
        match config.provider {
            CanonicalStoreProvider::Memory => Ok(Arc::new(InMemoryCanonicalStore::new())),

            #[cfg(feature = "embedded")]
            CanonicalStoreProvider::Embedded => {
                let store = crate::embedded::EmbeddedCanonicalStore::from_config(config)?;
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            _ => Err(GrimoireError::UnsupportedProvider {
                provider: format!("{:?}", config.provider),
            }),
        }
    }
}
