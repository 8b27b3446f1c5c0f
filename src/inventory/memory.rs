use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{MusterError, Result};
use crate::inventory::{AggregatedInventory, GroupEntry, InventoryProvider, NodeEntry};

/// In-memory inventory, seedable from a JSON file.
///
/// The file format matches [`AggregatedInventory`]'s serde shape:
///
/// ```json
/// {
///   "nodes": [{"id": "web-01", "name": "web-01.example.com"}],
///   "groups": [{"id": "web", "name": "Web servers", "source": "static",
///               "nodes": ["web-01"]}]
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryInventory {
    inventory: RwLock<AggregatedInventory>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inventory(inventory: AggregatedInventory) -> Self {
        Self {
            inventory: RwLock::new(inventory),
        }
    }

    /// Load inventory from a JSON file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            MusterError::Inventory(format!("failed to read {}: {}", path.display(), e))
        })?;
        let inventory: AggregatedInventory = serde_json::from_slice(&data).map_err(|e| {
            MusterError::Inventory(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!(
            path = %path.display(),
            nodes = inventory.nodes.len(),
            groups = inventory.groups.len(),
            "Inventory loaded"
        );
        Ok(Self::with_inventory(inventory))
    }

    pub async fn add_node(&self, id: impl Into<String>, name: impl Into<String>) {
        self.inventory.write().await.nodes.push(NodeEntry {
            id: id.into(),
            name: name.into(),
        });
    }

    pub async fn add_group(&self, group: GroupEntry) {
        self.inventory.write().await.groups.push(group);
    }

    /// Replace the whole inventory (e.g. after re-aggregation).
    pub async fn replace(&self, inventory: AggregatedInventory) {
        *self.inventory.write().await = inventory;
    }
}

#[async_trait]
impl InventoryProvider for MemoryInventory {
    async fn aggregated_inventory(&self) -> Result<AggregatedInventory> {
        Ok(self.inventory.read().await.clone())
    }
}
