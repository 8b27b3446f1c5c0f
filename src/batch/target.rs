use std::collections::HashSet;

use crate::error::{MusterError, Result};
use crate::inventory::InventoryProvider;

/// Remove duplicate ids, keeping the first occurrence of each in place.
///
/// Idempotent: applying it twice yields the same result as once.
pub fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Expand group ids to their member node ids.
///
/// A group id that is not in inventory is skipped; a provider failure for
/// one group is logged and the remaining groups are still attempted. Neither
/// fails the batch.
pub async fn expand_groups(
    provider: &dyn InventoryProvider,
    group_ids: &[String],
) -> Vec<String> {
    let mut expanded = Vec::new();

    for group_id in group_ids {
        match provider.aggregated_inventory().await {
            Ok(inventory) => match inventory.find_group(group_id) {
                Some(group) => {
                    tracing::debug!(
                        group_id = %group_id,
                        members = group.nodes.len(),
                        "Group expanded"
                    );
                    expanded.extend(group.nodes.iter().cloned());
                }
                None => {
                    tracing::warn!(group_id = %group_id, "Group not found in inventory, skipping");
                }
            },
            Err(e) => {
                tracing::error!(
                    group_id = %group_id,
                    error = %e,
                    "Inventory lookup failed for group, skipping"
                );
            }
        }
    }

    expanded
}

/// Validate that every id exists in the provider's current node list.
///
/// Fails with a single error enumerating all invalid ids, comma-joined.
pub async fn validate_nodes(provider: &dyn InventoryProvider, node_ids: &[String]) -> Result<()> {
    let inventory = provider
        .aggregated_inventory()
        .await
        .map_err(|e| MusterError::Inventory(e.to_string()))?;

    let invalid: Vec<&str> = node_ids
        .iter()
        .filter(|id| !inventory.contains_node(id))
        .map(|id| id.as_str())
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(MusterError::InvalidNodes(invalid.join(", ")))
    }
}

/// Resolve a batch's targets: explicit nodes first, then group-expanded
/// nodes, deduplicated preserving first occurrence, then validated.
pub async fn resolve_targets(
    provider: &dyn InventoryProvider,
    explicit_node_ids: &[String],
    group_ids: &[String],
) -> Result<Vec<String>> {
    let mut combined = explicit_node_ids.to_vec();
    combined.extend(expand_groups(provider, group_ids).await);

    let targets = dedup_preserving_order(combined);
    validate_nodes(provider, &targets).await?;
    Ok(targets)
}
