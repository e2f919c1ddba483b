//! Types for the batch orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::bus::SinkOutcome;
use crate::feed::{resource_key, DataKind, RallyClass};

/// One caller-supplied request, before validation.
///
/// Fields stay raw strings so unknown values surface as validation errors
/// instead of deserialization failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub class_id: String,
    /// Kind name (`stage_results`) or feed endpoint code (`3`).
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_ids: Option<Vec<String>>,
}

impl FetchRequest {
    pub fn new(class: RallyClass, kind: DataKind, stage_ids: Option<Vec<String>>) -> Self {
        Self {
            class_id: class.id().to_string(),
            kind: kind.name().to_string(),
            stage_ids,
        }
    }
}

/// One unit of work: a single fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTask {
    pub kind: DataKind,
    pub class: RallyClass,
    pub stage_id: Option<String>,
}

impl FetchTask {
    /// `<file_stem>_<class>[_<stage>]`.
    pub fn key(&self) -> String {
        resource_key(self.kind, self.class, self.stage_id.as_deref())
    }
}

/// A batch rejected before any fetch ran.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid batch: {}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub key: String,
    pub kind: DataKind,
    pub class: RallyClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Data rows delivered after filtering.
    pub rows: usize,
    /// Per-sink results; empty when the fetch failed.
    pub sinks: Vec<SinkOutcome>,
}

impl TaskOutcome {
    pub(crate) fn failed(task: &FetchTask, error: String) -> Self {
        Self {
            key: task.key(),
            kind: task.kind,
            class: task.class,
            stage: task.stage_id.clone(),
            success: false,
            error: Some(error),
            rows: 0,
            sinks: Vec::new(),
        }
    }
}

/// Aggregated outcome of a batch, one entry per expanded task in
/// expansion order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub results: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    /// Outcome for the task with `key`.
    pub fn outcome(&self, key: &str) -> Option<&TaskOutcome> {
        self.results.iter().find(|r| r.key == key)
    }
}
