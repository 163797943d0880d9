use crate::batch::copy_attribute_data;
use crate::config::ColmigConfig;
use crate::error::ColmigError;
use crate::model::{AttributeDraft, AttributeIdentity, AttributeType, DependencyReport};
use crate::rewrite::{ReferenceRewriter, SchemaNameRewriter, rewrite_all};
use crate::state::MigrationState;
use crate::steps::{Action, StepKind, Steps, Topology};
use crate::store::StoreClient;
use crate::validate::validate;
use tracing::{info, warn};

/// What one `run` actually did, for operator reporting and tests.
#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub executed: Vec<&'static str>,
    pub records_copied: u64,
    pub artifacts_rewritten: u64,
    pub state: MigrationState,
}

/// Drives one attribute migration: resolve live state, prove the request is
/// legal, then execute the topology's fixed step order, skipping steps whose
/// bit is absent from the request. Fully synchronous; a failure aborts the
/// run and propagates. Re-invoking with the same arguments resumes safely.
pub struct Migrator<'a> {
    store: &'a dyn StoreClient,
    rewriters: Vec<Box<dyn ReferenceRewriter>>,
    config: ColmigConfig,
}

impl<'a> Migrator<'a> {
    pub fn new(store: &'a dyn StoreClient, config: ColmigConfig) -> Self {
        Self {
            store,
            rewriters: SchemaNameRewriter::full_set(),
            config,
        }
    }

    pub fn with_rewriters(mut self, rewriters: Vec<Box<dyn ReferenceRewriter>>) -> Self {
        self.rewriters = rewriters;
        self
    }

    pub fn run(
        &self,
        attribute: &AttributeIdentity,
        new_schema_name: &str,
        steps: Steps,
        action: Action,
        new_type: Option<AttributeType>,
    ) -> Result<MigrationOutcome, ColmigError> {
        self.config.validate()?;
        let topology = Topology::for_action(action)?;
        if topology.changes_type() && new_type.is_none() {
            return Err(ColmigError::UnsupportedAction(
                "change_type requested without a target value type".into(),
            ));
        }

        info!(
            entity = %attribute.entity,
            attribute = %attribute.schema_name,
            target = new_schema_name,
            %action,
            %steps,
            "migration run begin"
        );

        let state = MigrationState::resolve(
            self.store,
            attribute,
            new_schema_name,
            &self.config.temp_suffix,
            action,
            steps,
        )?;
        let steps = if topology.requires_temp_stage() {
            steps | Steps::MIGRATION_TO_TEMP_REQUIRED
        } else {
            steps
        };
        validate(
            self.store,
            &state,
            steps,
            action,
            &attribute.schema_name,
            new_schema_name,
        )?;

        let mut outcome = MigrationOutcome::default();
        let mut state = state;
        for kind in topology.sequence() {
            if !steps.contains(kind.bit()) {
                continue;
            }
            info!(step = kind.name(), "step begin");
            state = self.execute_step(
                *kind,
                topology,
                state,
                attribute,
                new_schema_name,
                new_type,
                action,
                &mut outcome,
            )?;
            outcome.executed.push(kind.name());
            info!(step = kind.name(), "step end");
        }
        outcome.state = state;

        info!(
            entity = %attribute.entity,
            executed = outcome.executed.len(),
            records_copied = outcome.records_copied,
            "migration run complete"
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_step(
        &self,
        kind: StepKind,
        topology: Topology,
        state: MigrationState,
        attribute: &AttributeIdentity,
        new_schema_name: &str,
        new_type: Option<AttributeType>,
        action: Action,
        outcome: &mut MigrationOutcome,
    ) -> Result<MigrationState, ColmigError> {
        match kind {
            StepKind::CreateTemp => {
                if state.temp.is_some() {
                    info!("temp attribute already present, reusing");
                    return Ok(state);
                }
                let source = state.old.as_ref().unwrap_or(attribute);
                let temp_name =
                    MigrationState::temp_name(&attribute.schema_name, &self.config.temp_suffix);
                let draft = AttributeDraft::from_existing(source, temp_name, None);
                let temp = self.create_or_retrieve(&attribute.entity, &draft)?;
                self.store.publish(&attribute.entity)?;
                Ok(state.with_temp(Some(temp)))
            }
            StepKind::MigrateToTemp => {
                let (from, to) = pair(state.old.as_ref(), state.temp.as_ref(), kind)?;
                self.migrate(from, to, outcome)?;
                Ok(state)
            }
            StepKind::RemoveExisting => {
                let old = state
                    .old
                    .clone()
                    .ok_or_else(|| missing_slot(kind, "old"))?;
                if action.contains(Action::DELETE) {
                    // Delete has no destination: clear every reference, then
                    // remove the attribute itself.
                    outcome.artifacts_rewritten +=
                        rewrite_all(self.store, &self.rewriters, &old, None)?;
                }
                self.remove(&old)?;
                Ok(state.with_old(None))
            }
            StepKind::CreateNew => {
                if state.new.is_some() {
                    info!("new attribute already present, reusing");
                    return Ok(state);
                }
                // Direct topologies clone from old; temp-staged ones from
                // temp, since old is gone by this point in the sequence.
                let source = if topology.requires_temp_stage() {
                    state.temp.as_ref()
                } else {
                    state.old.as_ref()
                }
                .unwrap_or(attribute);
                let type_override = if topology.changes_type() {
                    new_type
                } else {
                    None
                };
                let draft = AttributeDraft::from_existing(source, new_schema_name, type_override);
                let new = self.create_or_retrieve(&attribute.entity, &draft)?;
                self.store.publish(&attribute.entity)?;
                Ok(state.with_new(Some(new)))
            }
            StepKind::MigrateToNew => {
                let source = if topology.requires_temp_stage() {
                    state.temp.as_ref()
                } else {
                    state.old.as_ref()
                };
                let (from, to) = pair(source, state.new.as_ref(), kind)?;
                self.migrate(from, to, outcome)?;
                Ok(state)
            }
            StepKind::RemoveTemp => {
                let temp = state
                    .temp
                    .clone()
                    .ok_or_else(|| missing_slot(kind, "temp"))?;
                self.remove(&temp)?;
                Ok(state.with_temp(None))
            }
        }
    }

    /// Create-or-retrieve: an existing attribute under the draft's name is
    /// success, which is what makes a failed run resumable.
    fn create_or_retrieve(
        &self,
        entity: &str,
        draft: &AttributeDraft,
    ) -> Result<AttributeIdentity, ColmigError> {
        match self.store.create_attribute(entity, draft) {
            Ok(identity) => Ok(identity),
            Err(ColmigError::AttributeExists { schema_name }) => {
                info!(attribute = %schema_name, "attribute already exists, retrieving");
                self.store
                    .entity_attributes(entity)?
                    .into_iter()
                    .find(|a| a.schema_name == draft.schema_name)
                    .ok_or(ColmigError::AttributeExists { schema_name })
            }
            Err(e) => Err(e),
        }
    }

    /// One migrate stage: copy record data (unless disabled), repoint every
    /// referencing artifact, then re-probe the source's deletability.
    fn migrate(
        &self,
        from: &AttributeIdentity,
        to: &AttributeIdentity,
        outcome: &mut MigrationOutcome,
    ) -> Result<(), ColmigError> {
        if self.config.migrate_data {
            let stats = copy_attribute_data(self.store, &self.config, from, to)?;
            outcome.records_copied += stats.copied;
        }
        outcome.artifacts_rewritten += rewrite_all(self.store, &self.rewriters, from, Some(to))?;
        let report = self.probe(from)?;
        if !report.is_clear() {
            return Err(ColmigError::DependencyBlocked {
                attribute: from.qualified_name(),
                report,
            });
        }
        Ok(())
    }

    /// One remove stage: re-probe deletability, then delete and publish.
    fn remove(&self, attribute: &AttributeIdentity) -> Result<(), ColmigError> {
        let report = self.probe(attribute)?;
        if !report.is_clear() {
            return Err(ColmigError::DependencyBlocked {
                attribute: attribute.qualified_name(),
                report,
            });
        }
        self.store.delete_attribute(attribute)?;
        self.store.publish(&attribute.entity)?;
        info!(attribute = %attribute.qualified_name(), "attribute removed");
        Ok(())
    }

    fn probe(&self, attribute: &AttributeIdentity) -> Result<DependencyReport, ColmigError> {
        let report = self
            .store
            .blocking_dependencies(attribute)
            .map(DependencyReport::from_refs)?;
        for dep in &report.advisory {
            warn!(
                attribute = %attribute.qualified_name(),
                kind = %dep.kind,
                object = %dep.display_name,
                "advisory dependency, resolve manually"
            );
        }
        Ok(report)
    }
}

fn missing_slot(kind: StepKind, slot: &str) -> ColmigError {
    ColmigError::StateConflict(format!(
        "{}: {slot} attribute is not populated",
        kind.name()
    ))
}

fn pair<'s>(
    from: Option<&'s AttributeIdentity>,
    to: Option<&'s AttributeIdentity>,
    kind: StepKind,
) -> Result<(&'s AttributeIdentity, &'s AttributeIdentity), ColmigError> {
    match (from, to) {
        (Some(from), Some(to)) => Ok((from, to)),
        (None, _) => Err(missing_slot(kind, "source")),
        (_, None) => Err(missing_slot(kind, "destination")),
    }
}
