//! Batch runner.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::{panic_message, CallbackBus};
use crate::feed::FeedClient;
use crate::filter::filter_table;
use crate::metrics::{BATCHES_TOTAL, BATCH_TASKS};

use super::plan::plan_batch;
use super::types::{BatchReport, FetchRequest, FetchTask, TaskOutcome, ValidationError};

/// Runs fetch batches against a feed client and dispatches the results.
pub struct TaskOrchestrator {
    client: Arc<dyn FeedClient>,
    bus: Arc<CallbackBus>,
}

impl TaskOrchestrator {
    pub fn new(client: Arc<dyn FeedClient>, bus: Arc<CallbackBus>) -> Self {
        Self { client, bus }
    }

    pub fn bus(&self) -> &Arc<CallbackBus> {
        &self.bus
    }

    /// Validate, expand and run a batch.
    ///
    /// Nothing is fetched when validation fails. Otherwise every task runs
    /// concurrently and the report is returned once all of them finished.
    pub async fn run_batch(&self, requests: &[FetchRequest]) -> Result<BatchReport, ValidationError> {
        let tasks = match plan_batch(requests) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(errors = ?e.errors, "Batch rejected");
                BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(e);
            }
        };
        Ok(self.run_tasks(tasks).await)
    }

    /// Run already-expanded tasks concurrently.
    pub async fn run_tasks(&self, tasks: Vec<FetchTask>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(batch_id = %batch_id, tasks = tasks.len(), "Starting batch");
        BATCH_TASKS.observe(tasks.len() as f64);

        let handles: Vec<_> = tasks
            .iter()
            .cloned()
            .map(|task| {
                let client = Arc::clone(&self.client);
                let bus = Arc::clone(&self.bus);
                tokio::spawn(run_task(client, bus, task))
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let results: Vec<TaskOutcome> = tasks
            .iter()
            .zip(joined)
            .map(|(task, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = if e.is_panic() {
                        format!("task panicked: {}", panic_message(e.into_panic().as_ref()))
                    } else {
                        format!("task cancelled: {}", e)
                    };
                    error!(batch_id = %batch_id, key = %task.key(), error = %message, "Task aborted");
                    TaskOutcome::failed(task, message)
                }
            })
            .collect();

        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        let report = BatchReport {
            batch_id,
            started_at,
            completed_at: Utc::now(),
            total,
            succeeded,
            results,
        };

        let label = if report.all_succeeded() { "complete" } else { "partial" };
        BATCHES_TOTAL.with_label_values(&[label]).inc();
        info!(
            batch_id = %batch_id,
            succeeded,
            total,
            elapsed_ms = (report.completed_at - report.started_at).num_milliseconds(),
            "Batch finished"
        );

        report
    }
}

/// Fetch → filter → dispatch for one task.
async fn run_task(client: Arc<dyn FeedClient>, bus: Arc<CallbackBus>, task: FetchTask) -> TaskOutcome {
    let key = task.key();
    debug!(key = %key, client = client.name(), "Running task");

    let response = client
        .fetch(task.kind, task.class, task.stage_id.as_deref())
        .await;

    if !response.succeeded() {
        let detail = response
            .failure_detail()
            .unwrap_or("fetch failed")
            .to_string();
        error!(key = %key, error = %detail, "Fetch failed");
        return TaskOutcome::failed(&task, detail);
    }

    let filtered = filter_table(&response);
    let dispatch = bus.dispatch(&filtered).await;

    let error = dispatch.error_summary();
    if error.is_none() {
        debug!(key = %key, rows = filtered.data_row_count(), "Task complete");
    }

    TaskOutcome {
        key,
        kind: task.kind,
        class: task.class,
        stage: task.stage_id,
        success: error.is_none(),
        error,
        rows: filtered.data_row_count(),
        sinks: dispatch.outcomes,
    }
}
