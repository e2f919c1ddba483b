//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with a mock feed and an in-memory workbook, so batches and registry
//! refreshes can be exercised without the network.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use stagefeed_core::{
    load_config_from_str,
    testing::{MockFeedClient, RecordingSink},
    CallbackBus, CsvFileSink, DataKind, LatestTableSink, MemoryWorkbook, RacingNumberViewSink, RegistryStore,
    SpreadsheetSink, TaskOrchestrator,
};
use stagefeed_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use stagefeed_core::testing::fixtures;

/// Test fixture wiring the router to a mock feed.
///
/// Every kind goes to a CSV sink, a spreadsheet sink, the latest-table
/// store and a recording sink; `enhanced_current` also gets the racing
/// number view.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_trigger() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/trigger", json!({
///         "requests": [{ "class_id": "1", "kind": "entry_list" }]
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock feed - configure rows, failures and delays per resource key
    pub feed: MockFeedClient,
    /// Shared workbook behind the sheet sinks and the registry
    pub workbook: Arc<MemoryWorkbook>,
    pub registry: Arc<RegistryStore>,
    /// Backs `/status` and `/data/{key}`
    pub latest: Arc<LatestTableSink>,
    /// Sees every delivered table
    pub recorder: Arc<RecordingSink>,
    /// Temporary directory holding CSV output
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().join("output");

        let config = load_config_from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 8080

[feed]
base_url = "http://127.0.0.1:1/live.php"
access_code = "secret"

[export]
output_dir = "{}"

[workbook]
clean_rows = 5
clean_cols = 2
"#,
            output_dir.display()
        ))
        .expect("Failed to parse test config");

        let workbook = Arc::new(MemoryWorkbook::new("test"));
        let registry = Arc::new(RegistryStore::new());
        let recorder = Arc::new(RecordingSink::new("recorder"));
        let latest = Arc::new(LatestTableSink::new());
        let writer = config
            .workbook
            .region_writer()
            .expect("Failed to build region writer");

        let bus = Arc::new(CallbackBus::new());
        let csv_sink = Arc::new(CsvFileSink::new(&output_dir, config.export.delimiter_byte()));
        let sheet_sink = Arc::new(SpreadsheetSink::new(workbook.clone(), writer));
        for kind in DataKind::ALL {
            bus.subscribe(kind, csv_sink.clone());
            bus.subscribe(kind, sheet_sink.clone());
            bus.subscribe(kind, latest.clone());
            bus.subscribe(kind, recorder.clone());
        }
        bus.subscribe(
            DataKind::EnhancedCurrent,
            Arc::new(RacingNumberViewSink::new(
                registry.clone(),
                workbook.clone(),
                writer,
            )),
        );

        let feed = MockFeedClient::new();
        let orchestrator = Arc::new(TaskOrchestrator::new(Arc::new(feed.clone()), bus));
        let state = Arc::new(AppState::new(
            config,
            orchestrator,
            registry.clone(),
            workbook.clone(),
            latest.clone(),
        ));

        Self {
            router: create_router(state),
            feed,
            workbook,
            registry,
            latest,
            recorder,
            temp_dir,
        }
    }

    /// Directory the CSV sink writes into.
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
