//! Per-kind subscription bus delivering fetched tables to sinks.

mod dispatch;

pub use dispatch::{CallbackBus, DispatchReport, SinkOutcome};

use async_trait::async_trait;
use std::any::Any;
use thiserror::Error;

use crate::feed::TabularResponse;
use crate::workbook::WorkbookError;

/// Errors a sink can report for one delivery.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("blocking task failed: {0}")]
    Blocking(String),

    #[error("{0}")]
    Rejected(String),
}

/// Receives every successfully fetched table of the kinds it is
/// subscribed to.
///
/// The same table is handed to every sink of a dispatch; sinks only read
/// it.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Name used in logs, metrics and reports.
    fn name(&self) -> &str;

    /// Persist or forward one table.
    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError>;
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
