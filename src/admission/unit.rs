use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::ExecutionKind;

/// A unit of work tracked by the admission queue while pending or running.
///
/// The queue does not interpret `kind`, `target`, or `action`; they are
/// carried for observability and for the status snapshot. `enqueued_at` is
/// used only for FIFO ordering among waiters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedUnit {
    pub id: Uuid,
    pub kind: ExecutionKind,
    pub target: String,
    pub action: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedUnit {
    pub fn new(id: Uuid, kind: ExecutionKind, target: String, action: String) -> Self {
        Self {
            id,
            kind,
            target,
            action,
            enqueued_at: Utc::now(),
        }
    }
}
