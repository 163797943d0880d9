use crate::error::ColmigError;
use crate::model::AttributeIdentity;
use crate::steps::{Action, Steps};
use crate::store::StoreClient;
use tracing::debug;

/// The three physical attributes a migration can touch. Constructed fresh per
/// run from live metadata, never persisted; a slot is populated only when its
/// schema name currently resolves to an existing attribute.
///
/// The state is an immutable value: the resolver produces it, the validator
/// borrows it, and each orchestrator step consumes it and returns a copy with
/// exactly one slot changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationState {
    pub old: Option<AttributeIdentity>,
    pub temp: Option<AttributeIdentity>,
    pub new: Option<AttributeIdentity>,
}

impl MigrationState {
    pub fn with_old(self, old: Option<AttributeIdentity>) -> Self {
        Self { old, ..self }
    }

    pub fn with_temp(self, temp: Option<AttributeIdentity>) -> Self {
        Self { temp, ..self }
    }

    pub fn with_new(self, new: Option<AttributeIdentity>) -> Self {
        Self { new, ..self }
    }

    /// The temp attribute's schema name for a given source name.
    pub fn temp_name(schema_name: &str, suffix: &str) -> String {
        format!("{schema_name}{suffix}")
    }

    /// Inspects live metadata to determine which of old/temp/new currently
    /// exist. One attribute-list fetch; absence is a `None` slot, not an
    /// error.
    pub fn resolve(
        store: &dyn StoreClient,
        attribute: &AttributeIdentity,
        new_schema_name: &str,
        temp_suffix: &str,
        action: Action,
        steps: Steps,
    ) -> Result<MigrationState, ColmigError> {
        let attributes = store.entity_attributes(&attribute.entity)?;
        let find = |name: &str| {
            attributes
                .iter()
                .find(|a| a.schema_name == name)
                .cloned()
        };

        let temp_name = Self::temp_name(&attribute.schema_name, temp_suffix);
        let state = MigrationState {
            old: find(&attribute.schema_name),
            temp: find(&temp_name),
            new: find(new_schema_name),
        };
        let state = disambiguate(state, attribute, new_schema_name, action, steps);
        debug!(
            entity = %attribute.entity,
            old = state.old.is_some(),
            temp = state.temp.is_some(),
            new = state.new.is_some(),
            "resolved migration state"
        );
        Ok(state)
    }
}

/// Pure type change with the name unchanged resolves old and new to the same
/// physical object; the store has no migration-in-progress flag, so whether
/// that object is the source or the already-created destination has to be
/// inferred from the temp attribute.
fn disambiguate(
    state: MigrationState,
    attribute: &AttributeIdentity,
    new_schema_name: &str,
    action: Action,
    steps: Steps,
) -> MigrationState {
    if !action.contains(Action::CHANGE_TYPE) || attribute.schema_name != new_schema_name {
        return state;
    }
    let same_object = match (&state.old, &state.new) {
        (Some(old), Some(new)) => old.metadata_id == new.metadata_id,
        _ => false,
    };
    if !same_object {
        return state;
    }

    let temp_type_matches = match (&state.old, &state.temp) {
        (Some(old), Some(temp)) => Some(temp.value_type == old.value_type),
        _ => None,
    };
    match temp_type_matches {
        // No temp: no evidence a migration has started.
        None => state.with_new(None),
        Some(true) => {
            // Type change under way. A request that (re)drives the temp
            // stage means the destination is still to be created; otherwise
            // the resolved object is the destination and old is gone.
            if steps.intersects(
                Steps::REMOVE_EXISTING_ATTRIBUTE
                    | Steps::CREATE_NEW_ATTRIBUTE
                    | Steps::MIGRATE_TO_TEMP,
            ) {
                state.with_new(None)
            } else {
                state.with_old(None)
            }
        }
        // Temp diverged from old's type: not safely resumable past the temp
        // stage, so the destination counts as not yet created.
        Some(false) => state.with_new(None),
    }
}
