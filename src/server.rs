use std::sync::Arc;

use crate::admission::AdmissionQueue;
use crate::api::{self, ApiState};
use crate::batch::BatchOrchestrator;
use crate::config::ServerConfig;
use crate::error::{MusterError, Result};
use crate::inventory::MemoryInventory;
use crate::shutdown::install_shutdown_handler;
use crate::store::MemoryStore;

/// The muster server: admission queue, stores, orchestrator, and the HTTP
/// API wired together.
pub struct Server {
    config: ServerConfig,
    orchestrator: Arc<BatchOrchestrator>,
}

impl Server {
    /// Build all components from configuration.
    ///
    /// The inventory is seeded from `config.inventory_path` when set,
    /// otherwise starts empty (and can be replaced at runtime by whatever
    /// aggregates the real integrations).
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let inventory = match &config.inventory_path {
            Some(path) => MemoryInventory::from_file(path).await?,
            None => MemoryInventory::new(),
        };

        let queue = Arc::new(AdmissionQueue::new(
            config.queue.limit,
            config.queue.max_queue_size,
        ));
        let orchestrator = Arc::new(BatchOrchestrator::new(
            queue,
            Arc::new(MemoryStore::new()),
            Arc::new(inventory),
        ));

        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator> {
        &self.orchestrator
    }

    /// Run the HTTP API until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let app = api::router(ApiState {
            orchestrator: self.orchestrator.clone(),
        });

        tracing::info!(
            listen_addr = %self.config.listen_addr,
            limit = self.config.queue.limit,
            max_queue_size = self.config.queue.max_queue_size,
            "Starting muster server"
        );

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| {
                MusterError::Internal(format!(
                    "failed to bind {}: {}",
                    self.config.listen_addr, e
                ))
            })?;

        let token = install_shutdown_handler();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(|e| MusterError::Internal(format!("server failed: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
