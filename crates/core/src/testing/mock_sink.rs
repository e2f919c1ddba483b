//! Sinks for testing dispatch.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bus::{Sink, SinkError};
use crate::feed::TabularResponse;

/// Sink that records every table it receives.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    name: String,
    delivered: Arc<RwLock<Vec<TabularResponse>>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delivered: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Tables received so far, in delivery order.
    pub async fn delivered(&self) -> Vec<TabularResponse> {
        self.delivered.read().await.clone()
    }

    /// Resource keys of the tables received so far, sorted.
    pub async fn delivered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .delivered
            .read()
            .await
            .iter()
            .map(TabularResponse::resource_key)
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError> {
        self.delivered.write().await.push(table.clone());
        Ok(())
    }
}

/// Sink that rejects every table with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingSink {
    name: String,
    message: String,
}

impl FailingSink {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Sink for FailingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, _table: &TabularResponse) -> Result<(), SinkError> {
        Err(SinkError::Rejected(self.message.clone()))
    }
}
