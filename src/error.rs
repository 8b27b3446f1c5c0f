use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MusterError {
    #[error("Execution queue is full ({queued} queued, limit {limit}): cannot admit {id}")]
    QueueFull { id: Uuid, queued: usize, limit: usize },

    #[error("Execution {0} was cancelled while queued")]
    Cancelled(Uuid),

    #[error("Execution {0} was removed when the queue was cleared")]
    QueueCleared(Uuid),

    #[error("Invalid target nodes: {0}")]
    InvalidNodes(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(Uuid),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(Uuid),

    #[error("Failed to enqueue execution for node {node}: {reason}")]
    Enqueue { node: String, reason: String },

    #[error("Inventory provider error: {0}")]
    Inventory(String),

    #[error("Execution store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MusterError>;
