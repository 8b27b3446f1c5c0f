//! Node and group inventory.
//!
//! The orchestrator resolves batch targets against an aggregated inventory:
//! node ids are validated against it and group ids expand to their member
//! nodes. Aggregation itself (pulling from integrations) happens outside
//! this crate; [`MemoryInventory`] stands in for it here.

pub mod memory;

pub use memory::MemoryInventory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: String,
    pub name: String,
    /// Which integration this group came from (e.g. "puppetdb").
    pub source: String,
    /// Member node ids.
    pub nodes: Vec<String>,
}

/// Aggregated view over every integration's nodes and groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedInventory {
    pub nodes: Vec<NodeEntry>,
    pub groups: Vec<GroupEntry>,
}

impl AggregatedInventory {
    pub fn find_group(&self, group_id: &str) -> Option<&GroupEntry> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    /// Display name for a node id, if the node is still in inventory.
    pub fn node_name(&self, node_id: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.id == node_id)
            .map(|n| n.name.as_str())
    }
}

/// Resolves group membership and validates node ids.
///
/// Must be callable repeatedly and cheaply; the orchestrator may call it
/// once per group during expansion.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn aggregated_inventory(&self) -> Result<AggregatedInventory>;
}
