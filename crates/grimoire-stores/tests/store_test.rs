//! Canonical store persistence across reopen.

use grimoire_core::config::CanonicalStoreConfig;
use grimoire_core::traits::CanonicalStore;
use grimoire_core::types::{EntityKind, Metadata};
use grimoire_stores::CanonicalStoreFactory;

#[tokio::test]
async fn test_embedded_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = CanonicalStoreConfig::embedded(dir.path().join("nested").join("canon.db"));

    let created = {
        let store = CanonicalStoreFactory::create(&config).unwrap();
        store
            .create("Phandalin", EntityKind::Location, Metadata::new())
            .await
            .unwrap()
    };

    let reopened = CanonicalStoreFactory::create(&config).unwrap();
    let locations = reopened.list_by_kind(EntityKind::Location).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].id, created.id);
    assert_eq!(locations[0].name, "Phandalin");
}

#[tokio::test]
async fn test_default_config_is_memory() {
    let store = CanonicalStoreFactory::create(&CanonicalStoreConfig::default()).unwrap();
    let record = store
        .create("Cragmaw Hideout", EntityKind::Location, Metadata::new())
        .await
        .unwrap();
    let again = store
        .create("Cragmaw Hideout", EntityKind::Location, Metadata::new())
        .await
        .unwrap();
    assert_eq!(record.id, again.id);
}
