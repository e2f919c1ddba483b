//! Mock feed client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::feed::{resource_key, DataKind, FeedClient, RallyClass, TabularResponse};

use super::fixtures;

/// A recorded fetch for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub kind: DataKind,
    pub class: RallyClass,
    pub stage_id: Option<String>,
}

#[derive(Debug, Clone)]
enum MockResponse {
    Rows(Vec<Vec<String>>),
    Failure(String),
}

/// Mock implementation of the FeedClient trait.
///
/// Responses are keyed by resource key (`stage_results_1_2`). Keys without
/// a configured response get [`fixtures::default_rows`]. Provides:
/// - per-key rows or failures
/// - per-key delays to shuffle completion order
/// - per-key panics to exercise task isolation
/// - a log of every fetch
#[derive(Debug, Clone, Default)]
pub struct MockFeedClient {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    panics: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl MockFeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `rows` for `key`.
    pub async fn set_rows(&self, key: &str, rows: Vec<Vec<String>>) {
        self.responses
            .write()
            .await
            .insert(key.to_string(), MockResponse::Rows(rows));
    }

    /// Fail fetches for `key` with `detail`.
    pub async fn set_failure(&self, key: &str, detail: &str) {
        self.responses
            .write()
            .await
            .insert(key.to_string(), MockResponse::Failure(detail.to_string()));
    }

    /// Sleep before answering fetches for `key`.
    pub async fn set_delay(&self, key: &str, delay: Duration) {
        self.delays.write().await.insert(key.to_string(), delay);
    }

    /// Panic inside fetches for `key`.
    pub async fn set_panic(&self, key: &str) {
        self.panics.write().await.insert(key.to_string());
    }

    /// Get recorded fetches, in call order.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl FeedClient for MockFeedClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<&str>,
    ) -> TabularResponse {
        self.fetches.write().await.push(RecordedFetch {
            kind,
            class,
            stage_id: stage_id.map(str::to_string),
        });

        let key = resource_key(kind, class, stage_id);

        let delay = self.delays.read().await.get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.read().await.contains(&key) {
            panic!("mock feed panic for {}", key);
        }

        let stage = stage_id.map(str::to_string);
        let response = self.responses.read().await.get(&key).cloned();
        match response {
            Some(MockResponse::Rows(rows)) => TabularResponse::success(kind, class, stage, rows),
            Some(MockResponse::Failure(detail)) => TabularResponse::failure(kind, class, stage, detail),
            None => TabularResponse::success(kind, class, stage, fixtures::default_rows()),
        }
    }
}
