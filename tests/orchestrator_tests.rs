//! Integration tests for batch creation and status reporting.


use muster::error::MusterError;
use muster::store::{BatchStatus, ExecutionStatus, ExecutionStore};
use test_harness::{command_request, drive_execution, ids, test_env};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_batch_with_explicit_nodes() {
    let env = test_env(10, 10).await;

    let created = env
        .orchestrator
        .create_batch(command_request(&["web-01", "db-01"], &[]), "ops")
        .await
        .unwrap();

    assert_eq!(created.target_count, 2);
    assert_eq!(created.expanded_node_ids, ids(&["web-01", "db-01"]));
    assert_eq!(created.execution_ids.len(), 2);

    let batch = env
        .store
        .get_batch(created.batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.status, BatchStatus::Running);
    assert_eq!(batch.user_id, "ops");
    assert_eq!(batch.stats.total, 2);
    assert_eq!(batch.stats.queued, 2);
    assert_eq!(batch.execution_ids, created.execution_ids);

    // One execution per node, position following the resolved order, and a
    // held admission slot for each.
    let executions = env.store.list_by_batch(created.batch_id).await.unwrap();
    assert_eq!(executions.len(), 2);
    for (position, execution) in executions.iter().enumerate() {
        assert_eq!(execution.batch_position, Some(position));
        assert_eq!(execution.status, ExecutionStatus::Queued);
        assert_eq!(execution.batch_id, Some(created.batch_id));
        assert!(env.queue.is_running(execution.id).await);
    }
}

#[tokio::test]
async fn test_create_batch_deduplicates_group_overlap() {
    let env = test_env(10, 10).await;

    // web-02 is explicit and also a member of the "web" group; the union is
    // deduplicated, keeping first positions.
    let created = env
        .orchestrator
        .create_batch(command_request(&["web-02", "db-01"], &["web"]), "ops")
        .await
        .unwrap();

    assert_eq!(created.target_count, 4);
    assert_eq!(
        created.expanded_node_ids,
        ids(&["web-02", "db-01", "web-01", "web-03"])
    );
}

#[tokio::test]
async fn test_create_batch_skips_unknown_group() {
    let env = test_env(10, 10).await;

    let created = env
        .orchestrator
        .create_batch(command_request(&[], &["db", "no-such-group"]), "ops")
        .await
        .unwrap();

    assert_eq!(created.expanded_node_ids, ids(&["db-01", "db-02"]));
}

#[tokio::test]
async fn test_create_batch_rejects_invalid_nodes_and_creates_nothing() {
    let env = test_env(10, 10).await;

    let err = env
        .orchestrator
        .create_batch(
            command_request(&["web-01", "ghost-1", "ghost-2"], &[]),
            "ops",
        )
        .await
        .unwrap_err();

    match err {
        MusterError::InvalidNodes(list) => assert_eq!(list, "ghost-1, ghost-2"),
        other => panic!("expected InvalidNodes, got {:?}", other),
    }

    assert_eq!(env.store.batch_count().await, 0);
    assert_eq!(env.store.execution_count().await, 0);
    assert_eq!(env.queue.status().await.running, 0);
}

#[tokio::test]
async fn test_create_batch_enqueue_failure_names_node_and_rolls_back() {
    // limit 2, no backlog; one slot pre-filled by an earlier batch.
    let env = test_env(2, 0).await;
    env.orchestrator
        .create_batch(command_request(&["db-01"], &[]), "ops")
        .await
        .unwrap();

    // web-01 takes the last free slot, web-02 hits queue-full; the whole
    // create fails naming web-02 and web-01's slot is released again.
    let err = env
        .orchestrator
        .create_batch(command_request(&["web-01", "web-02"], &[]), "ops")
        .await
        .unwrap_err();

    match &err {
        MusterError::Enqueue { node, .. } => assert_eq!(node, "web-02"),
        other => panic!("expected Enqueue, got {:?}", other),
    }

    // All-or-nothing: only the first batch's records and slot remain.
    assert_eq!(env.store.batch_count().await, 1);
    assert_eq!(env.store.execution_count().await, 1);
    assert_eq!(env.queue.status().await.running, 1);
}

// ---------------------------------------------------------------------------
// Status & progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_status_recomputes_stats_and_progress() {
    let env = test_env(10, 10).await;
    let created = env
        .orchestrator
        .create_batch(command_request(&["web-01", "web-02", "web-03"], &[]), "ops")
        .await
        .unwrap();

    drive_execution(&env.store, created.execution_ids[0], ExecutionStatus::Success).await;
    drive_execution(&env.store, created.execution_ids[1], ExecutionStatus::Failed).await;
    drive_execution(&env.store, created.execution_ids[2], ExecutionStatus::Running).await;

    let report = env
        .orchestrator
        .get_batch_status(created.batch_id, None)
        .await
        .unwrap();

    // 2 of 3 terminal → round(2/3 * 100) == 67.
    assert_eq!(report.progress, 67);
    let stats = report.batch.stats;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.queued, 0);

    // The persisted snapshot still says all-queued; the report must not.
    let persisted = env
        .store
        .get_batch(created.batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.stats.queued, 3);

    // Executions come back in batch position order, enriched with names.
    let nodes: Vec<Option<String>> = report
        .executions
        .iter()
        .map(|v| v.node_name.clone())
        .collect();
    assert_eq!(
        nodes,
        vec![
            Some("web-01.example.com".to_string()),
            Some("web-02.example.com".to_string()),
            Some("web-03.example.com".to_string())
        ]
    );
}

#[tokio::test]
async fn test_status_filter_narrows_executions_not_stats() {
    let env = test_env(10, 10).await;
    let created = env
        .orchestrator
        .create_batch(command_request(&["web-01", "web-02", "web-03"], &[]), "ops")
        .await
        .unwrap();

    drive_execution(&env.store, created.execution_ids[0], ExecutionStatus::Success).await;
    drive_execution(&env.store, created.execution_ids[1], ExecutionStatus::Running).await;

    let report = env
        .orchestrator
        .get_batch_status(created.batch_id, Some(ExecutionStatus::Running))
        .await
        .unwrap();

    assert_eq!(report.executions.len(), 1);
    assert_eq!(report.executions[0].execution.id, created.execution_ids[1]);
    // Stats reflect all executions, filtered or not.
    assert_eq!(report.batch.stats.total, 3);
    assert_eq!(report.batch.stats.success, 1);
    assert_eq!(report.batch.stats.queued, 1);
}

#[tokio::test]
async fn test_status_unknown_batch_is_not_found() {
    let env = test_env(10, 10).await;
    let missing = Uuid::new_v4();

    let err = env
        .orchestrator
        .get_batch_status(missing, None)
        .await
        .unwrap_err();
    match err {
        MusterError::BatchNotFound(id) => assert_eq!(id, missing),
        other => panic!("expected BatchNotFound, got {:?}", other),
    }
}
