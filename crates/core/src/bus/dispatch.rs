//! Subscription registry and sequential, isolated dispatch.

use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

use crate::feed::{DataKind, TabularResponse};
use crate::metrics::SINK_DELIVERIES;

use super::{panic_message, Sink};

/// Outcome of delivering one table to one sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub sink: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-sink outcomes of one dispatch, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    /// Failed outcomes joined into one message, `None` if every sink succeeded.
    pub fn error_summary(&self) -> Option<String> {
        let failures: Vec<String> = self
            .outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| format!("{}: {}", o.sink, o.error.as_deref().unwrap_or("failed")))
            .collect();

        if failures.is_empty() {
            None
        } else {
            Some(format!("sink failure: {}", failures.join("; ")))
        }
    }
}

type Subscriptions = HashMap<DataKind, Vec<Arc<dyn Sink>>>;

/// Routes tables to the sinks subscribed to their kind.
#[derive(Default)]
pub struct CallbackBus {
    subscriptions: RwLock<Subscriptions>,
}

impl std::fmt::Debug for CallbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBus")
            .field("subscriptions", &self.subscription_counts())
            .finish()
    }
}

impl CallbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` for `kind`. Sinks run in registration order.
    pub fn subscribe(&self, kind: DataKind, sink: Arc<dyn Sink>) {
        debug!(kind = %kind, sink = sink.name(), "Sink subscribed");
        self.subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(kind)
            .or_default()
            .push(sink);
    }

    /// Number of sinks per kind, for every kind that has at least one.
    pub fn subscription_counts(&self) -> HashMap<DataKind, usize> {
        self.subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(kind, sinks)| (*kind, sinks.len()))
            .collect()
    }

    fn sinks_for(&self, kind: DataKind) -> Vec<Arc<dyn Sink>> {
        self.subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver `table` to every sink subscribed to its kind.
    ///
    /// Sinks run one after another. An error or panic in one sink is logged
    /// and recorded against it; later sinks still run. Returns once every
    /// sink has finished.
    pub async fn dispatch(&self, table: &TabularResponse) -> DispatchReport {
        let kind = table.kind();
        let sinks = self.sinks_for(kind);
        let mut outcomes = Vec::with_capacity(sinks.len());

        for sink in sinks {
            let name = sink.name().to_string();
            let result = AssertUnwindSafe(sink.deliver(table)).catch_unwind().await;

            let outcome = match result {
                Ok(Ok(())) => {
                    debug!(kind = %kind, sink = %name, key = %table.resource_key(), "Sink delivered");
                    SinkOutcome {
                        sink: name,
                        success: true,
                        error: None,
                    }
                }
                Ok(Err(e)) => {
                    error!(kind = %kind, sink = %name, key = %table.resource_key(), error = %e, "Sink failed");
                    SinkOutcome {
                        sink: name,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(kind = %kind, sink = %name, key = %table.resource_key(), panic = %message, "Sink panicked");
                    SinkOutcome {
                        sink: name,
                        success: false,
                        error: Some(format!("panicked: {}", message)),
                    }
                }
            };

            let label = if outcome.success { "success" } else { "failed" };
            SINK_DELIVERIES
                .with_label_values(&[outcome.sink.as_str(), label])
                .inc();
            outcomes.push(outcome);
        }

        DispatchReport { outcomes }
    }
}
