use crate::error::ColmigError;
use serde::{Deserialize, Serialize};

/// Independent-bit set of migration steps. The caller requests any subset;
/// execution order is fixed by the topology, never by the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Steps(u8);

impl Steps {
    pub const NONE: Steps = Steps(0);
    pub const CREATE_TEMP: Steps = Steps(1 << 0);
    pub const MIGRATE_TO_TEMP: Steps = Steps(1 << 1);
    pub const REMOVE_EXISTING_ATTRIBUTE: Steps = Steps(1 << 2);
    pub const CREATE_NEW_ATTRIBUTE: Steps = Steps(1 << 3);
    pub const MIGRATE_TO_NEW_ATTRIBUTE: Steps = Steps(1 << 4);
    pub const REMOVE_TEMP: Steps = Steps(1 << 5);
    /// Marker bit consumed only by the validator: the action topology stages
    /// through a temp attribute. Never dispatched as a step.
    pub const MIGRATION_TO_TEMP_REQUIRED: Steps = Steps(1 << 6);
    /// All six executable steps; excludes the marker bit.
    pub const ALL: Steps = Steps(0b0011_1111);

    pub fn contains(self, other: Steps) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Steps) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The request with the marker bit stripped.
    pub fn executable(self) -> Steps {
        Steps(self.0 & Steps::ALL.0)
    }

    /// True when the executable request is exactly `step` and nothing else.
    pub fn is_exactly(self, step: Steps) -> bool {
        self.executable() == step
    }
}

impl std::ops::BitOr for Steps {
    type Output = Steps;
    fn bitor(self, rhs: Steps) -> Steps {
        Steps(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Steps {
    fn bitor_assign(&mut self, rhs: Steps) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Display for Steps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(Steps, &str); 7] = [
            (Steps::CREATE_TEMP, "create_temp"),
            (Steps::MIGRATE_TO_TEMP, "migrate_to_temp"),
            (Steps::REMOVE_EXISTING_ATTRIBUTE, "remove_existing_attribute"),
            (Steps::CREATE_NEW_ATTRIBUTE, "create_new_attribute"),
            (Steps::MIGRATE_TO_NEW_ATTRIBUTE, "migrate_to_new_attribute"),
            (Steps::REMOVE_TEMP, "remove_temp"),
            (Steps::MIGRATION_TO_TEMP_REQUIRED, "migration_to_temp_required"),
        ];
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

/// Independent-bit set of requested actions. Only the combinations listed in
/// `Topology::for_action` are meaningful.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Action(u8);

impl Action {
    pub const RENAME: Action = Action(1 << 0);
    pub const CHANGE_CASE: Action = Action(1 << 1);
    pub const REMOVE_TEMP: Action = Action(1 << 2);
    pub const CHANGE_TYPE: Action = Action(1 << 3);
    pub const DELETE: Action = Action(1 << 4);

    pub fn contains(self, other: Action) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Action {
    type Output = Action;
    fn bitor(self, rhs: Action) -> Action {
        Action(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(Action, &str); 5] = [
            (Action::RENAME, "rename"),
            (Action::CHANGE_CASE, "change_case"),
            (Action::REMOVE_TEMP, "remove_temp"),
            (Action::CHANGE_TYPE, "change_type"),
            (Action::DELETE, "delete"),
        ];
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

/// One executable step, in the vocabulary the orchestrator dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CreateTemp,
    MigrateToTemp,
    RemoveExisting,
    CreateNew,
    MigrateToNew,
    RemoveTemp,
}

impl StepKind {
    pub fn bit(self) -> Steps {
        match self {
            StepKind::CreateTemp => Steps::CREATE_TEMP,
            StepKind::MigrateToTemp => Steps::MIGRATE_TO_TEMP,
            StepKind::RemoveExisting => Steps::REMOVE_EXISTING_ATTRIBUTE,
            StepKind::CreateNew => Steps::CREATE_NEW_ATTRIBUTE,
            StepKind::MigrateToNew => Steps::MIGRATE_TO_NEW_ATTRIBUTE,
            StepKind::RemoveTemp => Steps::REMOVE_TEMP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StepKind::CreateTemp => "create_temp",
            StepKind::MigrateToTemp => "migrate_to_temp",
            StepKind::RemoveExisting => "remove_existing_attribute",
            StepKind::CreateNew => "create_new_attribute",
            StepKind::MigrateToNew => "migrate_to_new_attribute",
            StepKind::RemoveTemp => "remove_temp",
        }
    }
}

/// Closed set of execution topologies, one per legal action combination.
/// Classified once per run; call sites never re-derive the combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Clear references, then remove the existing attribute.
    Delete,
    /// Remove a leftover temp attribute; standalone cleanup run.
    CleanupTemp,
    /// New is created directly from Old; no temp stage.
    Direct { change_type: bool },
    /// Old and New cannot coexist under the target name (case-only rename)
    /// or the type is changing in place, so data stages through a temp.
    ViaTemp { change_type: bool },
}

impl Topology {
    /// Maps an action combination to its topology. Combinations outside the
    /// four documented ones are rejected, never guessed.
    pub fn for_action(action: Action) -> Result<Topology, ColmigError> {
        let topology = if action == Action::DELETE {
            Topology::Delete
        } else if action == Action::REMOVE_TEMP {
            Topology::CleanupTemp
        } else if action == Action::RENAME {
            Topology::Direct { change_type: false }
        } else if action == Action::RENAME | Action::CHANGE_TYPE {
            Topology::Direct { change_type: true }
        } else if action == Action::CHANGE_CASE {
            Topology::ViaTemp { change_type: false }
        } else if action == Action::CHANGE_CASE | Action::CHANGE_TYPE
            || action == Action::CHANGE_TYPE
        {
            Topology::ViaTemp { change_type: true }
        } else {
            return Err(ColmigError::UnsupportedAction(action.to_string()));
        };
        Ok(topology)
    }

    pub fn requires_temp_stage(self) -> bool {
        matches!(self, Topology::ViaTemp { .. })
    }

    pub fn changes_type(self) -> bool {
        matches!(
            self,
            Topology::Direct { change_type: true } | Topology::ViaTemp { change_type: true }
        )
    }

    /// The fixed step order for this topology.
    pub fn sequence(self) -> &'static [StepKind] {
        match self {
            Topology::Delete => &[StepKind::RemoveExisting],
            Topology::CleanupTemp => &[StepKind::RemoveTemp],
            Topology::Direct { .. } => &[
                StepKind::CreateNew,
                StepKind::MigrateToNew,
                StepKind::RemoveExisting,
            ],
            Topology::ViaTemp { .. } => &[
                StepKind::CreateTemp,
                StepKind::MigrateToTemp,
                StepKind::RemoveExisting,
                StepKind::CreateNew,
                StepKind::MigrateToNew,
                StepKind::RemoveTemp,
            ],
        }
    }
}
