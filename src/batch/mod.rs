//! Batch orchestration.
//!
//! Turns one batch request (explicit nodes and/or groups, an action, a
//! requesting user) into one execution per resolved target node, tracks the
//! aggregate, and answers status and cancellation for the batch as a unit:
//!
//! 1. [`target`] resolves the request's targets: group expansion, order-
//!    preserving dedup, all-or-nothing validation against inventory.
//! 2. [`BatchOrchestrator::create_batch`] admits one unit per node through
//!    the admission queue, then persists the execution and batch records.
//! 3. [`BatchOrchestrator::get_batch_status`] recomputes aggregate stats
//!    from the underlying execution records on every query.
//! 4. [`BatchOrchestrator::cancel_batch`] force-fails running executions
//!    and terminally marks the batch cancelled.

pub mod orchestrator;
pub mod target;

pub use orchestrator::{
    BatchCreated, BatchOrchestrator, BatchRequest, BatchStatusReport, CancelOutcome,
    ExecutionView,
};
