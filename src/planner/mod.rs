//! Planning module for reconcile operations.
//!
//! This module compares desired and current VRF state, turns the
//! differences into an ordered plan, and executes it against the
//! controller.

mod diff;
mod plan;
mod executor;

pub use diff::{AttachAction, AttachmentDiff, DiffDetail, DiffEngine, DiffResult, VrfAction, VrfDiff};
pub use plan::{IntentKind, PlannedIntent, ReconcilePlan};
pub use executor::{ExecutionResult, IntentResult, IntentStatus, RequestExecutor};
