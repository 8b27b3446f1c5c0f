//! Persistence contract for execution and batch records.
//!
//! The orchestrator owns record creation and cancellation edits; everything
//! else (driving executions to completion) happens through the same trait
//! from outside this crate. Individual create/read/update calls are assumed
//! atomic; no cross-record transactions are imposed.

pub mod memory;
pub mod record;

pub use memory::MemoryStore;
pub use record::{
    BatchRecord, BatchStats, BatchStatus, ExecutionKind, ExecutionRecord, ExecutionStatus,
    NodeResult,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;

/// Partial update for an execution record; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPatch {
    pub status: Option<ExecutionStatus>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Option<Vec<NodeResult>>,
}

/// Partial update for a batch record; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BatchPatch {
    pub status: Option<BatchStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: Option<BatchStats>,
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, record: ExecutionRecord) -> Result<Uuid>;

    async fn get_execution(&self, id: Uuid) -> Result<Option<ExecutionRecord>>;

    /// All executions belonging to `batch_id`, ordered by `batch_position`.
    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ExecutionRecord>>;

    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<()>;

    async fn create_batch(&self, record: BatchRecord) -> Result<Uuid>;

    async fn get_batch(&self, batch_id: Uuid) -> Result<Option<BatchRecord>>;

    async fn update_batch(&self, batch_id: Uuid, patch: BatchPatch) -> Result<()>;
}
