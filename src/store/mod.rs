pub mod memory;

use crate::error::ColmigError;
use crate::model::{
    Artifact, ArtifactKind, AttributeDraft, AttributeIdentity, DependencyRef, Record, RecordUpdate,
};

/// Synchronous object-store client boundary. One method per store primitive
/// the orchestrator needs; implementations own transport, auth, and timeouts.
pub trait StoreClient {
    /// Full attribute list for the owning entity. Fetched once per resolve.
    fn entity_attributes(&self, entity: &str) -> Result<Vec<AttributeIdentity>, ColmigError>;

    /// Creates a physical attribute. Returns `AttributeExists` when the
    /// schema name is already taken (including case-insensitive collisions,
    /// which is why case-only renames must stage through a temp).
    fn create_attribute(
        &self,
        entity: &str,
        draft: &AttributeDraft,
    ) -> Result<AttributeIdentity, ColmigError>;

    fn delete_attribute(&self, attribute: &AttributeIdentity) -> Result<(), ColmigError>;

    /// Dependency probe: every schema object that would break if the
    /// attribute were deleted.
    fn blocking_dependencies(
        &self,
        attribute: &AttributeIdentity,
    ) -> Result<Vec<DependencyRef>, ColmigError>;

    fn record_count(&self, entity: &str) -> Result<u64, ColmigError>;

    /// Bounded projection query over the entity's records.
    fn records(&self, entity: &str, columns: &[&str]) -> Result<Vec<Record>, ColmigError>;

    /// Single-record column update. No atomicity beyond the one record.
    fn update_record(&self, entity: &str, update: &RecordUpdate) -> Result<(), ColmigError>;

    /// Atomic all-or-nothing multi-record update. Only called when
    /// `ColmigConfig::bulk_update_available` is set.
    fn update_batch(&self, entity: &str, updates: &[RecordUpdate]) -> Result<(), ColmigError>;

    /// Artifacts of one kind that reference the attribute by schema name.
    fn artifacts_referencing(
        &self,
        kind: ArtifactKind,
        attribute: &AttributeIdentity,
    ) -> Result<Vec<Artifact>, ColmigError>;

    fn save_artifact(&self, artifact: &Artifact) -> Result<(), ColmigError>;

    /// Flushes pending metadata changes so later reads observe them.
    fn publish(&self, entity: &str) -> Result<(), ColmigError>;
}
