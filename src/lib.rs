//! Attribute migration orchestrator for metadata-driven object stores.
//!
//! Renames, retypes, or deletes a schema attribute while preserving
//! referential integrity across every artifact that references it by name.
//! The store forbids in-place renames and retypes of referenced attributes,
//! so a migration stages the change through at most three physical
//! attributes (original, optional temp, final target) in a fixed order, and
//! every run re-derives its state from live metadata so a partially failed
//! run can be resumed by re-invoking with the same arguments.

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod rewrite;
pub mod state;
pub mod steps;
pub mod store;
pub mod validate;

pub use crate::batch::{CopyStats, copy_attribute_data};
pub use crate::config::ColmigConfig;
pub use crate::error::{ColmigError, ColmigErrorCode, fault_root};
pub use crate::model::{
    Artifact, ArtifactKind, AttributeDraft, AttributeIdentity, AttributeType, DependencyKind,
    DependencyRef, DependencyReport, Record, RecordUpdate, Value,
};
pub use crate::orchestrator::{MigrationOutcome, Migrator};
pub use crate::rewrite::{ReferenceRewriter, SchemaNameRewriter};
pub use crate::state::MigrationState;
pub use crate::steps::{Action, StepKind, Steps, Topology};
pub use crate::store::StoreClient;
pub use crate::store::memory::MemoryStore;
pub use crate::validate::validate;
