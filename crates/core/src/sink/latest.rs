//! In-memory store of the newest table per resource key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::bus::{Sink, SinkError};
use crate::feed::TabularResponse;

/// Keeps the most recently delivered table for every resource key, so the
/// API can serve what was fetched last without touching the exports.
#[derive(Debug, Default)]
pub struct LatestTableSink {
    tables: RwLock<HashMap<String, TabularResponse>>,
}

impl LatestTableSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest table stored under `key`.
    pub async fn get(&self, key: &str) -> Option<TabularResponse> {
        self.tables.read().await.get(key).cloned()
    }

    /// Resource keys with a stored table, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tables.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Fetch time of the newest stored table.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.tables
            .read()
            .await
            .values()
            .map(TabularResponse::fetched_at)
            .max()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }
}

#[async_trait]
impl Sink for LatestTableSink {
    fn name(&self) -> &str {
        "latest"
    }

    async fn deliver(&self, table: &TabularResponse) -> Result<(), SinkError> {
        let key = table.resource_key();
        let mut tables = self.tables.write().await;
        // An older fetch finishing late must not replace a newer one.
        if let Some(stored) = tables.get(&key) {
            if stored.fetched_at() > table.fetched_at() {
                debug!(key = %key, "Kept newer stored table");
                return Ok(());
            }
        }
        tables.insert(key, table.clone());
        Ok(())
    }
}
