use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admission::{AdmissionQueue, QueuedUnit};
use crate::batch::target;
use crate::error::{MusterError, Result};
use crate::inventory::InventoryProvider;
use crate::store::{
    BatchPatch, BatchRecord, BatchStats, BatchStatus, ExecutionKind, ExecutionPatch,
    ExecutionRecord, ExecutionStatus, ExecutionStore, NodeResult,
};

/// A batch request as received from callers.
///
/// `target_node_ids` and `target_group_ids` may each be empty; their union
/// (after expansion and dedup) must resolve to at least the nodes that will
/// be validated. `parameters` is carried opaquely to the execution records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub kind: ExecutionKind,
    pub action: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub target_node_ids: Vec<String>,
    #[serde(default)]
    pub target_group_ids: Vec<String>,
}

/// Result of a successful batch creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreated {
    pub batch_id: Uuid,
    /// Ordered 1:1 with the expanded node list.
    pub execution_ids: Vec<Uuid>,
    pub target_count: usize,
    /// Deduplicated expansion result, in resolution order.
    pub expanded_node_ids: Vec<String>,
}

/// One execution in a status report, enriched for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionView {
    #[serde(flatten)]
    pub execution: ExecutionRecord,
    /// Display name from inventory; omitted when the node has left it.
    pub node_name: Option<String>,
    /// The record's single per-node outcome, flattened.
    pub result: Option<NodeResult>,
}

/// Aggregate view of a batch with stats recomputed from its executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusReport {
    pub batch: BatchRecord,
    /// Percentage of executions in a terminal state, rounded to nearest.
    pub progress: u32,
    pub executions: Vec<ExecutionView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub cancelled_count: usize,
}

/// Orchestrates batches over the admission queue, the execution record
/// store, and the inventory provider.
pub struct BatchOrchestrator {
    queue: Arc<AdmissionQueue>,
    store: Arc<dyn ExecutionStore>,
    inventory: Arc<dyn InventoryProvider>,
}

impl BatchOrchestrator {
    pub fn new(
        queue: Arc<AdmissionQueue>,
        store: Arc<dyn ExecutionStore>,
        inventory: Arc<dyn InventoryProvider>,
    ) -> Self {
        Self {
            queue,
            store,
            inventory,
        }
    }

    pub fn queue(&self) -> &Arc<AdmissionQueue> {
        &self.queue
    }

    /// Create a batch: resolve and validate targets, admit one unit per
    /// node, persist one execution record per node plus the batch record.
    ///
    /// Target processing is strictly sequential in resolution order; that
    /// order determines `batch_position` and which node a partial failure
    /// names. If any per-node admission fails, slots already acquired for
    /// this batch are released and the whole call fails — nothing is
    /// persisted on any failure path.
    pub async fn create_batch(&self, request: BatchRequest, user_id: &str) -> Result<BatchCreated> {
        let targets = target::resolve_targets(
            self.inventory.as_ref(),
            &request.target_node_ids,
            &request.target_group_ids,
        )
        .await?;

        let batch_id = Uuid::new_v4();
        tracing::info!(
            batch_id = %batch_id,
            user_id = %user_id,
            kind = %request.kind,
            action = %request.action,
            targets = targets.len(),
            "Creating batch"
        );

        // Admit every target before any record exists, so a failed create
        // leaves both the queue and the store untouched.
        let mut admitted: Vec<Uuid> = Vec::with_capacity(targets.len());
        for node_id in &targets {
            let execution_id = Uuid::new_v4();
            let unit = QueuedUnit::new(
                execution_id,
                request.kind,
                node_id.clone(),
                request.action.clone(),
            );
            if let Err(e) = self.queue.acquire(unit).await {
                tracing::warn!(
                    batch_id = %batch_id,
                    node_id = %node_id,
                    error = %e,
                    "Admission failed, rolling back batch"
                );
                self.rollback_admissions(&admitted).await;
                return Err(MusterError::Enqueue {
                    node: node_id.clone(),
                    reason: e.to_string(),
                });
            }
            admitted.push(execution_id);
        }

        let created_at = Utc::now();
        let parameters = request.parameters.unwrap_or(serde_json::Value::Null);

        for (position, (node_id, execution_id)) in
            targets.iter().zip(admitted.iter()).enumerate()
        {
            let record = ExecutionRecord {
                id: *execution_id,
                kind: request.kind,
                action: request.action.clone(),
                parameters: parameters.clone(),
                target_nodes: vec![node_id.clone()],
                status: ExecutionStatus::Queued,
                started_at: created_at,
                completed_at: None,
                results: Vec::new(),
                error: None,
                batch_id: Some(batch_id),
                batch_position: Some(position),
            };
            if let Err(e) = self.store.create_execution(record).await {
                tracing::error!(
                    batch_id = %batch_id,
                    execution_id = %execution_id,
                    error = %e,
                    "Failed to persist execution record, rolling back batch"
                );
                self.rollback_admissions(&admitted).await;
                return Err(e);
            }
        }

        let batch = BatchRecord {
            id: batch_id,
            kind: request.kind,
            action: request.action,
            parameters,
            target_nodes: targets.clone(),
            target_groups: request.target_group_ids,
            status: BatchStatus::Running,
            created_at,
            started_at: Some(created_at),
            completed_at: None,
            user_id: user_id.to_string(),
            execution_ids: admitted.clone(),
            stats: BatchStats::all_queued(targets.len()),
        };
        self.store.create_batch(batch).await?;

        tracing::info!(
            batch_id = %batch_id,
            executions = admitted.len(),
            "Batch created"
        );

        Ok(BatchCreated {
            batch_id,
            target_count: targets.len(),
            execution_ids: admitted,
            expanded_node_ids: targets,
        })
    }

    /// Aggregate status for a batch.
    ///
    /// Stats are recomputed from the execution records on every call; the
    /// persisted snapshot is never trusted. `status_filter` narrows the
    /// `executions` list but never the stats.
    pub async fn get_batch_status(
        &self,
        batch_id: Uuid,
        status_filter: Option<ExecutionStatus>,
    ) -> Result<BatchStatusReport> {
        let mut batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or(MusterError::BatchNotFound(batch_id))?;

        let executions = self.store.list_by_batch(batch_id).await?;
        let stats = recompute_stats(&executions);
        batch.stats = stats;

        let completed = stats.success + stats.failed;
        let progress = if stats.total == 0 {
            0
        } else {
            ((completed as f64 / stats.total as f64) * 100.0).round() as u32
        };

        // Name enrichment is best-effort; a missing node or a provider
        // failure only drops the display name.
        let inventory = match self.inventory.aggregated_inventory().await {
            Ok(inventory) => Some(inventory),
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, error = %e, "Inventory lookup failed, omitting node names");
                None
            }
        };

        let executions = executions
            .into_iter()
            .filter(|e| status_filter.map_or(true, |f| e.status == f))
            .map(|execution| {
                let node_id = execution.target_nodes.first();
                let node_name = node_id.and_then(|id| {
                    inventory
                        .as_ref()
                        .and_then(|inv| inv.node_name(id))
                        .map(str::to_string)
                });
                let result = node_id
                    .and_then(|id| execution.results.iter().find(|r| &r.node_id == id))
                    .or_else(|| execution.results.first())
                    .cloned();
                ExecutionView {
                    execution,
                    node_name,
                    result,
                }
            })
            .collect();

        Ok(BatchStatusReport {
            batch,
            progress,
            executions,
        })
    }

    /// Cancel a batch.
    ///
    /// Every execution still in `running` is force-failed with
    /// `"Cancelled by user"`; terminal executions are untouched. The batch
    /// itself becomes `cancelled` unconditionally, even when nothing was
    /// running. Acts purely on persisted state — units still holding
    /// admission slots are the external executor's to release.
    pub async fn cancel_batch(&self, batch_id: Uuid) -> Result<CancelOutcome> {
        self.store
            .get_batch(batch_id)
            .await?
            .ok_or(MusterError::BatchNotFound(batch_id))?;

        let now = Utc::now();
        let mut cancelled_count = 0usize;

        for execution in self.store.list_by_batch(batch_id).await? {
            if execution.status != ExecutionStatus::Running {
                continue;
            }
            self.store
                .update_execution(
                    execution.id,
                    ExecutionPatch {
                        status: Some(ExecutionStatus::Failed),
                        error: Some("Cancelled by user".to_string()),
                        completed_at: Some(now),
                        results: None,
                    },
                )
                .await?;
            cancelled_count += 1;
        }

        self.store
            .update_batch(
                batch_id,
                BatchPatch {
                    status: Some(BatchStatus::Cancelled),
                    completed_at: Some(now),
                    stats: None,
                },
            )
            .await?;

        tracing::info!(batch_id = %batch_id, cancelled_count, "Batch cancelled");
        Ok(CancelOutcome { cancelled_count })
    }

    async fn rollback_admissions(&self, execution_ids: &[Uuid]) {
        for id in execution_ids {
            self.queue.release(*id).await;
        }
    }
}

fn recompute_stats(executions: &[ExecutionRecord]) -> BatchStats {
    let mut stats = BatchStats {
        total: executions.len(),
        ..Default::default()
    };
    for execution in executions {
        match execution.status {
            ExecutionStatus::Queued => stats.queued += 1,
            ExecutionStatus::Running => stats.running += 1,
            ExecutionStatus::Success => stats.success += 1,
            ExecutionStatus::Failed => stats.failed += 1,
        }
    }
    stats
}
