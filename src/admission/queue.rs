use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use crate::admission::unit::QueuedUnit;
use crate::error::{MusterError, Result};

/// A backlog entry: the parked unit plus the channel that resumes its
/// suspended `acquire` call.
struct Waiter {
    unit: QueuedUnit,
    tx: oneshot::Sender<Result<()>>,
}

struct QueueState {
    running: HashMap<Uuid, QueuedUnit>,
    backlog: VecDeque<Waiter>,
}

/// Point-in-time snapshot of queue occupancy.
///
/// `queue` lists backlog units oldest-first.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub running: usize,
    pub queued: usize,
    pub limit: usize,
    pub queue: Vec<QueuedUnit>,
}

/// Bounded-concurrency admission gate for executions.
///
/// At most `limit` units run concurrently. Units that cannot start
/// immediately wait in a FIFO backlog of at most `max_queue_size`; beyond
/// that, `acquire` fails fast with a queue-full error as a backpressure
/// signal. `release` promotes exactly the oldest waiter.
///
/// All state lives behind a single mutex that is never held across an
/// await point; each mutating operation is one atomic step.
pub struct AdmissionQueue {
    limit: usize,
    max_queue_size: usize,
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    pub fn new(limit: usize, max_queue_size: usize) -> Self {
        Self {
            limit,
            max_queue_size,
            state: Mutex::new(QueueState {
                running: HashMap::new(),
                backlog: VecDeque::new(),
            }),
        }
    }

    /// Maximum number of concurrently running units.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Acquire an admission slot for `unit`.
    ///
    /// Returns immediately when fewer than `limit` units are running.
    /// Otherwise the unit is appended to the backlog and this call suspends
    /// until a `release` promotes it, a `cancel` removes it, or the queue is
    /// cleared. When the backlog is already at capacity the call fails with
    /// [`MusterError::QueueFull`] without parking the unit — admission is
    /// decided at call time only.
    pub async fn acquire(&self, unit: QueuedUnit) -> Result<()> {
        let id = unit.id;
        let rx = {
            let mut state = self.state.lock().await;

            if state.running.len() < self.limit {
                tracing::debug!(id = %id, target = %unit.target, "Execution admitted immediately");
                state.running.insert(id, unit);
                return Ok(());
            }

            if state.backlog.len() >= self.max_queue_size {
                tracing::warn!(
                    id = %id,
                    queued = state.backlog.len(),
                    limit = self.limit,
                    "Execution rejected, queue full"
                );
                return Err(MusterError::QueueFull {
                    id,
                    queued: state.backlog.len(),
                    limit: self.limit,
                });
            }

            let (tx, rx) = oneshot::channel();
            tracing::debug!(
                id = %id,
                position = state.backlog.len(),
                "Execution parked in backlog"
            );
            state.backlog.push_back(Waiter { unit, tx });
            rx
        };

        // Suspend until release/cancel/clear resolves this waiter.
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(MusterError::Internal(format!(
                "admission queue dropped waiter {} without resolving it",
                id
            ))),
        }
    }

    /// Mark the unit with `id` as no longer running and promote the oldest
    /// backlog waiter, if any.
    ///
    /// Returns whether `id` was actually running; releasing an unknown or
    /// already-released id is a no-op.
    pub async fn release(&self, id: Uuid) -> bool {
        let mut state = self.state.lock().await;

        if state.running.remove(&id).is_none() {
            tracing::warn!(id = %id, "Release for unit that is not running");
            return false;
        }
        tracing::debug!(id = %id, "Execution slot released");

        // Promote the oldest waiter whose acquire call is still suspended.
        // A send can only fail if the acquire future was dropped; such
        // waiters are discarded and the next one gets the slot.
        while let Some(waiter) = state.backlog.pop_front() {
            let unit_id = waiter.unit.id;
            let unit = waiter.unit;
            if waiter.tx.send(Ok(())).is_ok() {
                state.running.insert(unit_id, unit);
                tracing::debug!(id = %unit_id, "Execution promoted from backlog");
                break;
            }
            tracing::debug!(id = %unit_id, "Discarding abandoned waiter");
        }

        true
    }

    /// Remove the unit with `id` from the backlog and fail its suspended
    /// `acquire` call with a cancelled error.
    ///
    /// Returns whether a backlog entry was found and removed. Running units
    /// are not affected by this call.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let mut state = self.state.lock().await;

        let Some(pos) = state.backlog.iter().position(|w| w.unit.id == id) else {
            return false;
        };

        // Position came from the same locked state, so remove cannot miss.
        if let Some(waiter) = state.backlog.remove(pos) {
            tracing::info!(id = %id, "Queued execution cancelled");
            let _ = waiter.tx.send(Err(MusterError::Cancelled(id)));
            true
        } else {
            false
        }
    }

    /// Remove every backlog unit, failing each suspended `acquire` call with
    /// a queue-cleared error. Running units are unaffected.
    ///
    /// Returns the number of units removed.
    pub async fn clear_queue(&self) -> usize {
        let mut state = self.state.lock().await;

        let cleared = state.backlog.len();
        for waiter in state.backlog.drain(..) {
            let id = waiter.unit.id;
            let _ = waiter.tx.send(Err(MusterError::QueueCleared(id)));
        }
        if cleared > 0 {
            tracing::info!(cleared, "Execution backlog cleared");
        }
        cleared
    }

    /// Whether the unit with `id` currently holds a running slot.
    pub async fn is_running(&self, id: Uuid) -> bool {
        self.state.lock().await.running.contains_key(&id)
    }

    /// Whether the unit with `id` is currently parked in the backlog.
    pub async fn is_queued(&self, id: Uuid) -> bool {
        self.state
            .lock()
            .await
            .backlog
            .iter()
            .any(|w| w.unit.id == id)
    }

    /// Snapshot of current occupancy; the backlog is listed oldest-first.
    pub async fn status(&self) -> QueueStatus {
        let state = self.state.lock().await;
        QueueStatus {
            running: state.running.len(),
            queued: state.backlog.len(),
            limit: self.limit,
            queue: state.backlog.iter().map(|w| w.unit.clone()).collect(),
        }
    }
}
