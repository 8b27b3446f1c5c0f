use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MusterError, Result};
use crate::store::record::{BatchRecord, ExecutionRecord};
use crate::store::{BatchPatch, ExecutionPatch, ExecutionStore};

/// In-memory execution record store.
///
/// Backs the server binary and the test suites; a deployment against a real
/// database implements [`ExecutionStore`] over the same contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    executions: RwLock<HashMap<Uuid, ExecutionRecord>>,
    batches: RwLock<HashMap<Uuid, BatchRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of execution records currently held.
    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }

    /// Number of batch records currently held.
    pub async fn batch_count(&self) -> usize {
        self.batches.read().await.len()
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(&self, record: ExecutionRecord) -> Result<Uuid> {
        let id = record.id;
        self.executions.write().await.insert(id, record);
        Ok(id)
    }

    async fn get_execution(&self, id: Uuid) -> Result<Option<ExecutionRecord>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<ExecutionRecord>> {
        let executions = self.executions.read().await;
        let mut records: Vec<ExecutionRecord> = executions
            .values()
            .filter(|e| e.batch_id == Some(batch_id))
            .cloned()
            .collect();
        records.sort_by_key(|e| e.batch_position);
        Ok(records)
    }

    async fn update_execution(&self, id: Uuid, patch: ExecutionPatch) -> Result<()> {
        let mut executions = self.executions.write().await;
        let record = executions
            .get_mut(&id)
            .ok_or(MusterError::ExecutionNotFound(id))?;

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(error) = patch.error {
            record.error = Some(error);
        }
        if let Some(completed_at) = patch.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(results) = patch.results {
            record.results = results;
        }
        Ok(())
    }

    async fn create_batch(&self, record: BatchRecord) -> Result<Uuid> {
        let id = record.id;
        self.batches.write().await.insert(id, record);
        Ok(id)
    }

    async fn get_batch(&self, batch_id: Uuid) -> Result<Option<BatchRecord>> {
        Ok(self.batches.read().await.get(&batch_id).cloned())
    }

    async fn update_batch(&self, batch_id: Uuid, patch: BatchPatch) -> Result<()> {
        let mut batches = self.batches.write().await;
        let record = batches
            .get_mut(&batch_id)
            .ok_or(MusterError::BatchNotFound(batch_id))?;

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(completed_at) = patch.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(stats) = patch.stats {
            record.stats = stats;
        }
        Ok(())
    }
}
