//! Execution admission control.
//!
//! This module bounds how many executions are in flight at once:
//! - **Admission**: [`AdmissionQueue::acquire`] grants a slot immediately
//!   when capacity allows, parks the caller in a FIFO backlog otherwise,
//!   and rejects outright when the backlog is also full.
//! - **Release**: [`AdmissionQueue::release`] frees a slot and promotes the
//!   oldest waiting unit.
//!
//! Queue state is in-memory and per-instance; there is no cross-process
//! coordination. Multiple independent queues can coexist.

pub mod queue;
pub mod unit;

pub use queue::{AdmissionQueue, QueueStatus};
pub use unit::QueuedUnit;
