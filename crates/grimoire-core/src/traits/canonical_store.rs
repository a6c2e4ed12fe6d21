//! Canonical store collaborator.

use async_trait::async_trait;

use crate::error::GrimoireResult;
use crate::types::{CanonicalRecord, EntityKind, Metadata};

/// The persisted canonical-entity store.
///
/// No transactional guarantee is assumed beyond "a created record is eventually
/// visible to later `list_by_kind` calls".
#[async_trait]
pub trait CanonicalStore: Send + Sync {
    /// All records of one kind.
    async fn list_by_kind(&self, kind: EntityKind) -> GrimoireResult<Vec<CanonicalRecord>>;

    /// Create a record and return it with its assigned id.
    async fn create(
        &self,
        name: &str,
        kind: EntityKind,
        metadata: Metadata,
    ) -> GrimoireResult<CanonicalRecord>;
}
