use crate::model::DependencyReport;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColmigErrorCode {
    StateConflict,
    DependencyBlocked,
    AttributeExists,
    AttributeNotFound,
    EntityNotFound,
    ArtifactNotFound,
    UnsupportedAction,
    InvalidConfig,
    Store,
    Fault,
}

impl ColmigErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColmigErrorCode::StateConflict => "state_conflict",
            ColmigErrorCode::DependencyBlocked => "dependency_blocked",
            ColmigErrorCode::AttributeExists => "attribute_exists",
            ColmigErrorCode::AttributeNotFound => "attribute_not_found",
            ColmigErrorCode::EntityNotFound => "entity_not_found",
            ColmigErrorCode::ArtifactNotFound => "artifact_not_found",
            ColmigErrorCode::UnsupportedAction => "unsupported_action",
            ColmigErrorCode::InvalidConfig => "invalid_config",
            ColmigErrorCode::Store => "store",
            ColmigErrorCode::Fault => "fault",
        }
    }
}

#[derive(Debug, Error)]
pub enum ColmigError {
    /// The requested steps are illegal given current schema state. Fatal,
    /// never retried; raised before any mutation happens.
    #[error("state conflict: {0}")]
    StateConflict(String),
    /// Other schema objects still reference the attribute being removed.
    /// The report lists them so an operator can resolve them by hand.
    #[error("attribute '{attribute}' is blocked by {} dependent object(s)", .report.blocking.len())]
    DependencyBlocked {
        attribute: String,
        report: DependencyReport,
    },
    #[error("attribute '{schema_name}' already exists")]
    AttributeExists { schema_name: String },
    #[error("attribute '{schema_name}' not found")]
    AttributeNotFound { schema_name: String },
    #[error("entity '{entity}' not found")]
    EntityNotFound { entity: String },
    #[error("artifact '{artifact_id}' not found")]
    ArtifactNotFound { artifact_id: String },
    #[error("unsupported action combination: {0}")]
    UnsupportedAction(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("store error: {0}")]
    Store(String),
    #[error("fault: {message}")]
    Fault {
        message: String,
        trace: Option<String>,
    },
}

impl ColmigError {
    pub fn code(&self) -> ColmigErrorCode {
        match self {
            ColmigError::StateConflict(_) => ColmigErrorCode::StateConflict,
            ColmigError::DependencyBlocked { .. } => ColmigErrorCode::DependencyBlocked,
            ColmigError::AttributeExists { .. } => ColmigErrorCode::AttributeExists,
            ColmigError::AttributeNotFound { .. } => ColmigErrorCode::AttributeNotFound,
            ColmigError::EntityNotFound { .. } => ColmigErrorCode::EntityNotFound,
            ColmigError::ArtifactNotFound { .. } => ColmigErrorCode::ArtifactNotFound,
            ColmigError::UnsupportedAction(_) => ColmigErrorCode::UnsupportedAction,
            ColmigError::InvalidConfig { .. } => ColmigErrorCode::InvalidConfig,
            ColmigError::Store(_) => ColmigErrorCode::Store,
            ColmigError::Fault { .. } => ColmigErrorCode::Fault,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

/// Unwraps a nested fault chain to its innermost cause and combines it with
/// whatever trace text the intermediate layers carried. Store clients wrap
/// transport exceptions this way before surfacing them.
pub fn fault_root(err: &(dyn std::error::Error + 'static)) -> ColmigError {
    let mut trace = Vec::new();
    let mut current = err;
    while let Some(source) = current.source() {
        trace.push(current.to_string());
        current = source;
    }
    ColmigError::Fault {
        message: current.to_string(),
        trace: if trace.is_empty() {
            None
        } else {
            Some(trace.join(" <- "))
        },
    }
}
