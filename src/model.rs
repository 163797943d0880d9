use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Lookup,
    Choice,
    Memo,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AttributeType::Text => "text",
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::Boolean => "boolean",
            AttributeType::Timestamp => "timestamp",
            AttributeType::Lookup => "lookup",
            AttributeType::Choice => "choice",
            AttributeType::Memo => "memo",
        };
        write!(f, "{name}")
    }
}

/// Opaque handle to a physical attribute as materialized in the store.
/// Immutable once retrieved; a rename or retype produces a new identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeIdentity {
    pub entity: String,
    pub schema_name: String,
    pub value_type: AttributeType,
    pub metadata_id: Uuid,
}

impl AttributeIdentity {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.entity, self.schema_name)
    }
}

/// Definition for an attribute about to be created. All fields are explicit
/// constructor input; cloning an existing attribute under a new name goes
/// through `from_existing`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeDraft {
    pub schema_name: String,
    pub value_type: AttributeType,
    pub display_name: String,
    pub required: bool,
}

impl AttributeDraft {
    pub fn new(
        schema_name: impl Into<String>,
        value_type: AttributeType,
        display_name: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            value_type,
            display_name: display_name.into(),
            required,
        }
    }

    /// Clones `source`'s definition under a different schema name, optionally
    /// changing the value type.
    pub fn from_existing(
        source: &AttributeIdentity,
        schema_name: impl Into<String>,
        value_type: Option<AttributeType>,
    ) -> Self {
        let schema_name = schema_name.into();
        Self {
            display_name: schema_name.clone(),
            schema_name,
            value_type: value_type.unwrap_or(source.value_type),
            required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(i64),
    Reference(Uuid),
    Null,
}

impl Value {
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Float(_) => 4,
            Value::Text(_) => 5,
            Value::Reference(_) => 6,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Reference(a), Value::Reference(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: Uuid,
    pub values: BTreeMap<String, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordUpdate {
    pub record_id: Uuid,
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    SavedQuery,
    Chart,
    Form,
    Workflow,
    EventFilter,
    CalculatedField,
    Relationship,
    Mapping,
}

impl DependencyKind {
    /// Advisory kinds are reported for manual resolution and never
    /// auto-rewritten.
    pub fn is_advisory(self) -> bool {
        matches!(self, DependencyKind::Relationship | DependencyKind::Mapping)
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DependencyKind::SavedQuery => "saved query",
            DependencyKind::Chart => "chart",
            DependencyKind::Form => "form",
            DependencyKind::Workflow => "workflow",
            DependencyKind::EventFilter => "event filter",
            DependencyKind::CalculatedField => "calculated field",
            DependencyKind::Relationship => "relationship",
            DependencyKind::Mapping => "mapping",
        };
        write!(f, "{name}")
    }
}

/// One schema object that would break if the probed attribute were deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyRef {
    pub kind: DependencyKind,
    pub object_id: Uuid,
    pub display_name: String,
}

/// Probe result split for operator display: blocking entries must be cleared
/// before removal can proceed, advisory entries are resolved by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyReport {
    pub blocking: Vec<DependencyRef>,
    pub advisory: Vec<DependencyRef>,
}

impl DependencyReport {
    pub fn from_refs(refs: Vec<DependencyRef>) -> Self {
        let (advisory, blocking) = refs.into_iter().partition(|r| r.kind.is_advisory());
        Self { blocking, advisory }
    }

    pub fn is_clear(&self) -> bool {
        self.blocking.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }
}

impl std::fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for dep in &self.blocking {
            writeln!(f, "blocking: {} '{}' ({})", dep.kind, dep.display_name, dep.object_id)?;
        }
        for dep in &self.advisory {
            writeln!(
                f,
                "advisory: {} '{}' ({}) - resolve manually",
                dep.kind, dep.display_name, dep.object_id
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Form,
    SavedView,
    Chart,
    Workflow,
    EventFilter,
    CalculatedField,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Form,
        ArtifactKind::SavedView,
        ArtifactKind::Chart,
        ArtifactKind::Workflow,
        ArtifactKind::EventFilter,
        ArtifactKind::CalculatedField,
    ];
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::Form => "form",
            ArtifactKind::SavedView => "saved view",
            ArtifactKind::Chart => "chart",
            ArtifactKind::Workflow => "workflow",
            ArtifactKind::EventFilter => "event filter",
            ArtifactKind::CalculatedField => "calculated field",
        };
        write!(f, "{name}")
    }
}

/// A referencing artifact. The payload is opaque to the orchestrator;
/// rewriters own its format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub id: Uuid,
    pub name: String,
    pub entity: String,
    pub payload: String,
}
