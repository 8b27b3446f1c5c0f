use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution type tag: an ad-hoc command or a named task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionKind {
    Command,
    Task,
}

impl std::fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionKind::Command => write!(f, "command"),
            ExecutionKind::Task => write!(f, "task"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    /// Terminal states are sticky; the orchestrator never reverts them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Queued => write!(f, "queued"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ExecutionStatus::Queued),
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Running,
    Success,
    Partial,
    Cancelled,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Running => write!(f, "running"),
            BatchStatus::Success => write!(f, "success"),
            BatchStatus::Partial => write!(f, "partial"),
            BatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-node outcome stored on an execution record.
///
/// Command executions carry exit code and captured output; task executions
/// carry their payload in `output`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

/// One execution against one node.
///
/// A batch fans out to one record per resolved target node; `batch_id` and
/// `batch_position` back-reference the owning batch and are assigned at
/// creation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub kind: ExecutionKind,
    pub action: String,
    pub parameters: serde_json::Value,
    pub target_nodes: Vec<String>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<NodeResult>,
    pub error: Option<String>,
    pub batch_id: Option<Uuid>,
    pub batch_position: Option<usize>,
}

/// Aggregate counters carried on a batch record.
///
/// Invariant: `total == queued + running + success + failed`, and `total`
/// equals the batch's execution count. Status queries recompute these from
/// the execution records rather than trusting the persisted snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
}

impl BatchStats {
    /// Initial counters for a freshly created batch: everything queued.
    pub fn all_queued(total: usize) -> Self {
        Self {
            total,
            queued: total,
            running: 0,
            success: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: Uuid,
    pub kind: ExecutionKind,
    pub action: String,
    pub parameters: serde_json::Value,
    /// Deduplicated, order-preserving target expansion result.
    pub target_nodes: Vec<String>,
    /// Group ids as requested, unexpanded.
    pub target_groups: Vec<String>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub user_id: String,
    /// Ordered 1:1 with `target_nodes`.
    pub execution_ids: Vec<Uuid>,
    pub stats: BatchStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_status_display_round_trips() {
        for status in [
            ExecutionStatus::Queued,
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
        ] {
            let parsed: ExecutionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
    }

    #[test]
    fn batch_stats_all_queued() {
        let stats = BatchStats::all_queued(4);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.queued, 4);
        assert_eq!(stats.running + stats.success + stats.failed, 0);
    }
}
