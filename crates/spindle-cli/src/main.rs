//! Demo binary: wires a manager together, submits work, exercises cancel
//! and retry, then shuts down gracefully.
//!
//! A real deployment would sit an HTTP layer in front of the manager;
//! this binary plays that caller's role so the core can be watched end to
//! end. Durations are scaled down so a run finishes in a few seconds, and
//! Ctrl-C at any point drains in-flight work before exiting.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spindle_core::manager::{ManagerConfig, TaskManager};
use spindle_core::task::{TaskId, TaskStatus};
use spindle_core::workload::SimulatedWorkload;

/// Poll until every task has left the pending states.
async fn wait_until_settled(manager: &TaskManager) {
    loop {
        let settled = manager
            .list()
            .await
            .values()
            .all(|record| !record.status.is_pending());
        if settled {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
}

async fn run_demo(manager: &TaskManager) {
    let mut ids: Vec<TaskId> = Vec::new();
    for _ in 0..5 {
        ids.push(manager.submit().await.expect("queue is open"));
    }
    info!(submitted = ids.len(), "tasks submitted");

    // Cancel the newest one while it is still queued or just starting.
    let doomed = *ids.last().expect("submitted above");
    manager
        .cancel(doomed)
        .await
        .expect("fresh task is cancellable");

    wait_until_settled(manager).await;

    // Revive whatever failed.
    let failed: Vec<TaskId> = manager
        .list()
        .await
        .values()
        .filter(|record| record.status == TaskStatus::Failed)
        .map(|record| record.id)
        .collect();
    for id in failed {
        info!(task = %id, "retrying failed task");
        manager
            .retry(id)
            .await
            .expect("failed task below the ceiling");
    }

    wait_until_settled(manager).await;

    for record in manager.list().await.values() {
        info!(
            task = %record.id,
            status = %record.status,
            retries = record.retry_count,
            error = record.last_error.as_deref().unwrap_or("-"),
            "final state"
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&manager.counts().await).expect("counts serialize")
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ManagerConfig {
        workers: 3,
        queue_capacity: 16,
        max_retries: 2,
        attempt_timeout_ms: 500,
        retry_delay_ms: 100,
    };

    // Injected workload: 150ms of simulated work, first invocation fails
    // so the explicit retry path has something to revive.
    let workload = Arc::new(SimulatedWorkload::new(Duration::from_millis(150)).with_failures(1));
    let manager = TaskManager::new(config, workload);

    tokio::select! {
        _ = run_demo(&manager) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down early");
        }
    }

    // Drains in-flight attempts either way.
    manager.stop().await;
    info!("goodbye");
}
