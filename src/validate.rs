use crate::error::ColmigError;
use crate::model::DependencyReport;
use crate::state::MigrationState;
use crate::steps::{Action, Steps};
use crate::store::StoreClient;
use tracing::warn;

fn conflict(rule: &str, message: &str) -> ColmigError {
    warn!(rule, message, "precondition validation failed");
    ColmigError::StateConflict(format!("{rule}: {message}"))
}

/// Proves the requested steps are executable against the resolved state.
/// Runs every rule group in order regardless of action (each guards a
/// different step bit) and fails closed on the first violation, before any
/// mutation happens. Dependency-probe failures inside rules 3 and 6 are
/// converted into the same state-conflict error.
pub fn validate(
    store: &dyn StoreClient,
    state: &MigrationState,
    steps: Steps,
    action: Action,
    old_name: &str,
    new_name: &str,
) -> Result<(), ColmigError> {
    let temp_present_or_created = state.temp.is_some() || steps.contains(Steps::CREATE_TEMP);
    let new_present_or_created = state.new.is_some() || steps.contains(Steps::CREATE_NEW_ATTRIBUTE);
    // The pending migration into temp/new is covered by this run's request.
    let migration_satisfied = if steps.contains(Steps::MIGRATION_TO_TEMP_REQUIRED) {
        steps.contains(Steps::MIGRATE_TO_TEMP)
    } else {
        steps.contains(Steps::MIGRATE_TO_NEW_ATTRIBUTE)
    };

    // 1. Creating temp requires that it does not already exist.
    if steps.contains(Steps::CREATE_TEMP) && state.temp.is_some() {
        return Err(conflict("create_temp", "temp attribute already exists"));
    }

    // 2. Migrating into temp requires a source and a destination.
    if steps.contains(Steps::MIGRATE_TO_TEMP) {
        if state.old.is_none() {
            return Err(conflict("migrate_to_temp", "source attribute does not exist"));
        }
        if !temp_present_or_created {
            return Err(conflict(
                "migrate_to_temp",
                "temp attribute does not exist and is not being created",
            ));
        }
    }

    // 3. Removing the existing attribute requires a source, somewhere for its
    //    data and references to have gone, and proof nothing still points at
    //    it unless this run migrates it away first.
    if steps.contains(Steps::REMOVE_EXISTING_ATTRIBUTE) {
        if state.old.is_none() {
            return Err(conflict(
                "remove_existing_attribute",
                "attribute to remove does not exist",
            ));
        }
        let renamed_destination = old_name != new_name && new_present_or_created;
        if !(temp_present_or_created || action.contains(Action::DELETE) || renamed_destination) {
            return Err(conflict(
                "remove_existing_attribute",
                "no destination attribute for the removed attribute's data",
            ));
        }
        if !(migration_satisfied || action.contains(Action::DELETE)) {
            let clear = match state.old.as_ref() {
                Some(attribute) => store
                    .blocking_dependencies(attribute)
                    .map(DependencyReport::from_refs)
                    .map(|report| report.is_clear())
                    .map_err(|e| {
                        conflict(
                            "remove_existing_attribute",
                            &format!("dependency probe failed: {e}"),
                        )
                    })?,
                None => true,
            };
            if !clear {
                return Err(conflict(
                    "remove_existing_attribute",
                    "attribute still has blocking dependencies and no migration step is requested",
                ));
            }
        }
    }

    // 4. Creating the destination: under a temp-staged topology the original
    //    must be out of the way first, and the destination must be fresh.
    if steps.contains(Steps::CREATE_NEW_ATTRIBUTE) {
        if steps.contains(Steps::MIGRATION_TO_TEMP_REQUIRED)
            && state.old.is_some()
            && !steps.contains(Steps::REMOVE_EXISTING_ATTRIBUTE)
        {
            return Err(conflict(
                "create_new_attribute",
                "existing attribute is still present and not scheduled for removal",
            ));
        }
        if state.new.is_some() {
            return Err(conflict("create_new_attribute", "new attribute already exists"));
        }
    }

    // 5. Migrating into the destination requires a source stage and the
    //    destination itself.
    if steps.contains(Steps::MIGRATE_TO_NEW_ATTRIBUTE) {
        let source_available = temp_present_or_created
            || (action.contains(Action::RENAME) && state.old.is_some());
        if !source_available {
            return Err(conflict(
                "migrate_to_new_attribute",
                "no source stage to migrate from",
            ));
        }
        if !new_present_or_created {
            return Err(conflict(
                "migrate_to_new_attribute",
                "new attribute does not exist and is not being created",
            ));
        }
    }

    // 6. Removing temp requires it to exist (or be created this run), the
    //    migration to have somewhere to land unless this is a standalone
    //    cleanup, and no lingering dependencies when this run does not also
    //    migrate them away.
    if steps.contains(Steps::REMOVE_TEMP) {
        if !temp_present_or_created {
            return Err(conflict(
                "remove_temp",
                "temp attribute does not exist and is not being created",
            ));
        }
        let standalone_cleanup = steps.is_exactly(Steps::REMOVE_TEMP);
        if !(new_present_or_created || standalone_cleanup) {
            return Err(conflict(
                "remove_temp",
                "new attribute does not exist and is not being created",
            ));
        }
        if !steps.contains(Steps::MIGRATE_TO_NEW_ATTRIBUTE)
            && let Some(temp) = &state.temp
        {
            let clear = store
                .blocking_dependencies(temp)
                .map(DependencyReport::from_refs)
                .map(|report| report.is_clear())
                .map_err(|e| {
                    conflict("remove_temp", &format!("dependency probe failed: {e}"))
                })?;
            if !clear {
                return Err(conflict(
                    "remove_temp",
                    "temp attribute still has blocking dependencies",
                ));
            }
        }
    }

    Ok(())
}
