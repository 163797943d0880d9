use crate::error::ColmigError;
use crate::model::{
    Artifact, ArtifactKind, AttributeDraft, AttributeIdentity, DependencyKind, DependencyRef,
    Record, RecordUpdate, Value,
};
use crate::rewrite::payload_references;
use crate::store::StoreClient;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct EntityData {
    attributes: Vec<AttributeIdentity>,
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<String, EntityData>,
    artifacts: Vec<Artifact>,
    /// Dependencies registered out of band: relationships and mappings the
    /// store reports but no artifact payload carries.
    manual_dependencies: Vec<(String, String, DependencyRef)>,
    publishes: u64,
    updates_applied: usize,
    fail_after_updates: Option<usize>,
}

/// In-process `StoreClient` over guarded maps. Backs the integration suites
/// and embedders that stage migrations without a live store; supports
/// injecting an update failure to exercise the partial-batch path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, ColmigError> {
        self.inner
            .read()
            .map_err(|_| ColmigError::Store("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, ColmigError> {
        self.inner
            .write()
            .map_err(|_| ColmigError::Store("store lock poisoned".into()))
    }

    pub fn add_entity(&self, entity: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entities.entry(entity.into()).or_default();
        }
    }

    pub fn add_attribute(
        &self,
        entity: &str,
        draft: &AttributeDraft,
    ) -> Result<AttributeIdentity, ColmigError> {
        self.add_entity(entity);
        self.create_attribute(entity, draft)
    }

    pub fn insert_record(&self, entity: &str, values: &[(&str, Value)]) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut inner) = self.inner.write() {
            let data = inner.entities.entry(entity.into()).or_default();
            data.records.push(Record {
                id,
                values: values
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            });
        }
        id
    }

    pub fn add_artifact(&self, kind: ArtifactKind, entity: &str, name: &str, payload: &str) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut inner) = self.inner.write() {
            inner.artifacts.push(Artifact {
                kind,
                id,
                name: name.into(),
                entity: entity.into(),
                payload: payload.into(),
            });
        }
        id
    }

    pub fn add_manual_dependency(&self, entity: &str, schema_name: &str, dep: DependencyRef) {
        if let Ok(mut inner) = self.inner.write() {
            inner
                .manual_dependencies
                .push((entity.into(), schema_name.into(), dep));
        }
    }

    /// After `n` more successful single-record updates, every further update
    /// fails. Batch updates refuse atomically when the batch would cross the
    /// limit.
    pub fn fail_after_updates(&self, n: usize) {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_after_updates = Some(inner.updates_applied + n);
        }
    }

    pub fn clear_update_failure(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_after_updates = None;
        }
    }

    pub fn publish_count(&self) -> u64 {
        self.inner.read().map(|i| i.publishes).unwrap_or(0)
    }

    pub fn attribute(&self, entity: &str, schema_name: &str) -> Option<AttributeIdentity> {
        let inner = self.inner.read().ok()?;
        inner
            .entities
            .get(entity)?
            .attributes
            .iter()
            .find(|a| a.schema_name == schema_name)
            .cloned()
    }

    pub fn record(&self, entity: &str, id: Uuid) -> Option<Record> {
        let inner = self.inner.read().ok()?;
        inner
            .entities
            .get(entity)?
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn artifact(&self, id: Uuid) -> Option<Artifact> {
        let inner = self.inner.read().ok()?;
        inner.artifacts.iter().find(|a| a.id == id).cloned()
    }
}

fn artifact_dependency_kind(kind: ArtifactKind) -> DependencyKind {
    match kind {
        ArtifactKind::Form => DependencyKind::Form,
        ArtifactKind::SavedView => DependencyKind::SavedQuery,
        ArtifactKind::Chart => DependencyKind::Chart,
        ArtifactKind::Workflow => DependencyKind::Workflow,
        ArtifactKind::EventFilter => DependencyKind::EventFilter,
        ArtifactKind::CalculatedField => DependencyKind::CalculatedField,
    }
}

impl Inner {
    fn entity(&self, entity: &str) -> Result<&EntityData, ColmigError> {
        self.entities
            .get(entity)
            .ok_or_else(|| ColmigError::EntityNotFound {
                entity: entity.into(),
            })
    }

    fn entity_mut(&mut self, entity: &str) -> Result<&mut EntityData, ColmigError> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| ColmigError::EntityNotFound {
                entity: entity.into(),
            })
    }

    fn apply_update(&mut self, entity: &str, update: &RecordUpdate) -> Result<(), ColmigError> {
        if let Some(limit) = self.fail_after_updates
            && self.updates_applied >= limit
        {
            return Err(ColmigError::Store("injected update failure".into()));
        }
        let data = self.entity_mut(entity)?;
        let record = data
            .records
            .iter_mut()
            .find(|r| r.id == update.record_id)
            .ok_or_else(|| {
                ColmigError::Store(format!("record {} not found", update.record_id))
            })?;
        record
            .values
            .insert(update.column.clone(), update.value.clone());
        self.updates_applied += 1;
        Ok(())
    }
}

impl StoreClient for MemoryStore {
    fn entity_attributes(&self, entity: &str) -> Result<Vec<AttributeIdentity>, ColmigError> {
        Ok(self.read()?.entity(entity)?.attributes.clone())
    }

    fn create_attribute(
        &self,
        entity: &str,
        draft: &AttributeDraft,
    ) -> Result<AttributeIdentity, ColmigError> {
        let mut inner = self.write()?;
        let data = inner.entity_mut(entity)?;
        // Schema names are unique case-insensitively; a case-only variant of
        // an existing name cannot coexist with it.
        if data
            .attributes
            .iter()
            .any(|a| a.schema_name.eq_ignore_ascii_case(&draft.schema_name))
        {
            return Err(ColmigError::AttributeExists {
                schema_name: draft.schema_name.clone(),
            });
        }
        let identity = AttributeIdentity {
            entity: entity.into(),
            schema_name: draft.schema_name.clone(),
            value_type: draft.value_type,
            metadata_id: Uuid::new_v4(),
        };
        data.attributes.push(identity.clone());
        Ok(identity)
    }

    fn delete_attribute(&self, attribute: &AttributeIdentity) -> Result<(), ColmigError> {
        let mut inner = self.write()?;
        let data = inner.entity_mut(&attribute.entity)?;
        let before = data.attributes.len();
        data.attributes.retain(|a| a.metadata_id != attribute.metadata_id);
        if data.attributes.len() == before {
            return Err(ColmigError::AttributeNotFound {
                schema_name: attribute.schema_name.clone(),
            });
        }
        for record in &mut data.records {
            record.values.remove(&attribute.schema_name);
        }
        Ok(())
    }

    fn blocking_dependencies(
        &self,
        attribute: &AttributeIdentity,
    ) -> Result<Vec<DependencyRef>, ColmigError> {
        let inner = self.read()?;
        let mut refs: Vec<DependencyRef> = inner
            .artifacts
            .iter()
            .filter(|a| {
                a.entity == attribute.entity
                    && payload_references(&a.payload, &attribute.schema_name)
            })
            .map(|a| DependencyRef {
                kind: artifact_dependency_kind(a.kind),
                object_id: a.id,
                display_name: a.name.clone(),
            })
            .collect();
        refs.extend(
            inner
                .manual_dependencies
                .iter()
                .filter(|(entity, name, _)| {
                    entity == &attribute.entity && name == &attribute.schema_name
                })
                .map(|(_, _, dep)| dep.clone()),
        );
        Ok(refs)
    }

    fn record_count(&self, entity: &str) -> Result<u64, ColmigError> {
        Ok(self.read()?.entity(entity)?.records.len() as u64)
    }

    fn records(&self, entity: &str, columns: &[&str]) -> Result<Vec<Record>, ColmigError> {
        let inner = self.read()?;
        let data = inner.entity(entity)?;
        Ok(data
            .records
            .iter()
            .map(|r| Record {
                id: r.id,
                values: r
                    .values
                    .iter()
                    .filter(|(k, _)| columns.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })
            .collect())
    }

    fn update_record(&self, entity: &str, update: &RecordUpdate) -> Result<(), ColmigError> {
        self.write()?.apply_update(entity, update)
    }

    fn update_batch(&self, entity: &str, updates: &[RecordUpdate]) -> Result<(), ColmigError> {
        let mut inner = self.write()?;
        // All-or-nothing: refuse up front rather than stop partway through.
        if let Some(limit) = inner.fail_after_updates
            && inner.updates_applied + updates.len() > limit
        {
            return Err(ColmigError::Store("injected update failure".into()));
        }
        {
            let data = inner.entity(entity)?;
            for update in updates {
                if !data.records.iter().any(|r| r.id == update.record_id) {
                    return Err(ColmigError::Store(format!(
                        "record {} not found",
                        update.record_id
                    )));
                }
            }
        }
        for update in updates {
            inner.apply_update(entity, update)?;
        }
        Ok(())
    }

    fn artifacts_referencing(
        &self,
        kind: ArtifactKind,
        attribute: &AttributeIdentity,
    ) -> Result<Vec<Artifact>, ColmigError> {
        let inner = self.read()?;
        Ok(inner
            .artifacts
            .iter()
            .filter(|a| {
                a.kind == kind
                    && a.entity == attribute.entity
                    && payload_references(&a.payload, &attribute.schema_name)
            })
            .cloned()
            .collect())
    }

    fn save_artifact(&self, artifact: &Artifact) -> Result<(), ColmigError> {
        let mut inner = self.write()?;
        let slot = inner
            .artifacts
            .iter_mut()
            .find(|a| a.id == artifact.id)
            .ok_or_else(|| ColmigError::ArtifactNotFound {
                artifact_id: artifact.id.to_string(),
            })?;
        *slot = artifact.clone();
        Ok(())
    }

    fn publish(&self, _entity: &str) -> Result<(), ColmigError> {
        self.write()?.publishes += 1;
        Ok(())
    }
}
