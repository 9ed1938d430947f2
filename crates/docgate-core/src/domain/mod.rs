//! Domain types shared by every pipeline stage.

pub mod error;
pub mod revision;
pub mod target;
pub mod trigger;

pub use error::{PipelineError, Result};
pub use revision::{normalize_path, ChangeSet, RevisionPair};
pub use target::{PublishSummary, PublishTarget};
pub use trigger::{evaluate_trigger, EventKind, TriggerDecision, TriggerEvent};
