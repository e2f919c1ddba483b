//! API tests driving the router in-process with a mock feed.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use stagefeed_core::{CellRef, RallyClass, Workbook};

use common::{fixtures, TestFixture};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_redacts_access_code() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["feed"]["access_code_configured"], true);
    assert!(response.body["feed"].get("access_code").is_none());
    assert!(!response.text.contains("secret"));
    assert_eq!(response.body["workbook"]["clean_rows"], 5);
}

#[tokio::test]
async fn test_status_lists_subscriptions_per_kind() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/status").await;

    assert_status!(response, StatusCode::OK);
    let subs = &response.body["subscriptions"];
    assert_eq!(subs["entry_list"], 4);
    assert_eq!(subs["enhanced_current"], 5);
    assert_eq!(response.body["registry_entries"], 0);
    assert_eq!(response.body["available_data"], json!([]));
    assert!(response.body["last_update"].is_null());
}

#[tokio::test]
async fn test_status_lists_fetched_data() {
    let fixture = TestFixture::new();
    fixture
        .post(
            "/api/v1/trigger",
            json!({
                "requests": [
                    { "class_id": "2", "kind": "start_list" },
                    { "class_id": "1", "kind": "stage_results", "stage_ids": ["4"] }
                ]
            }),
        )
        .await;

    let response = fixture.get("/api/v1/status").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.body["available_data"],
        json!(["stage_results_1_4", "start_list_2"])
    );
    let newest = fixture.latest.last_update().await.unwrap();
    assert_eq!(response.body["last_update"], json!(newest));
}

#[tokio::test]
async fn test_data_returns_latest_table() {
    let fixture = TestFixture::new();
    fixture
        .post(
            "/api/v1/trigger",
            json!({ "requests": [{ "class_id": "1", "kind": "stage_results", "stage_ids": ["4"] }] }),
        )
        .await;

    let response = fixture.get("/api/v1/data/stage_results_1_4").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["key"], "stage_results_1_4");
    assert_eq!(response.body["kind"], "stage_results");
    assert_eq!(response.body["class_id"], "1");
    assert_eq!(response.body["stage_id"], "4");
    assert_eq!(response.body["rows"][0][1], "RSz");
    assert_eq!(response.body["rows"][1][1], "7");
    assert!(response.body["fetched_at"].is_string());
}

#[tokio::test]
async fn test_data_unknown_key() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/data/entry_list_1").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "no data fetched for 'entry_list_1'");
}

#[tokio::test]
async fn test_trigger_runs_every_task() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/trigger",
            json!({
                "requests": [
                    { "class_id": "1", "kind": "stage_results", "stage_ids": ["1", "2"] },
                    { "class_id": "2", "kind": "entry_list" }
                ]
            }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["succeeded"], 3);
    let keys: Vec<&str> = response.body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["stage_results_1_1", "stage_results_1_2", "entry_list_2"]);
    assert_eq!(response.body["results"][0]["rows"], 2);
    assert_eq!(response.body["results"][0]["sinks"].as_array().unwrap().len(), 4);

    assert!(fixture.output_dir().join("stage_results_1_2.csv").exists());
    assert!(fixture.output_dir().join("entry_list_2.csv").exists());
    assert_eq!(fixture.workbook.cell("Results_1_1", "B2").as_deref(), Some("7"));
    assert_eq!(fixture.recorder.delivered().await.len(), 3);
}

#[tokio::test]
async fn test_trigger_rejects_invalid_batch_without_fetching() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/trigger",
            json!({
                "requests": [
                    { "class_id": "1", "kind": "entry_list" },
                    { "class_id": "1", "kind": "stage_results" },
                    { "class_id": "7", "kind": "start_list" }
                ]
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid batch");
    let details = response.body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(
        details[0],
        "request 1: stage_results requires at least one stage id"
    );
    assert!(details[1].as_str().unwrap().starts_with("request 2: unknown class '7'"));
    assert_eq!(fixture.feed.fetch_count().await, 0);
    assert!(fixture.recorder.delivered().await.is_empty());
}

#[tokio::test]
async fn test_trigger_rejects_stage_escaping_output_dir() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/trigger",
            json!({
                "requests": [
                    { "class_id": "1", "kind": "stage_results", "stage_ids": ["../../escaped"] }
                ]
            }),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["details"][0]
        .as_str()
        .unwrap()
        .starts_with("request 0: stage id '../../escaped'"));
    assert_eq!(fixture.feed.fetch_count().await, 0);
    assert!(!fixture.temp_dir.path().join("escaped.csv").exists());
}

#[tokio::test]
async fn test_trigger_rejects_duplicate_tasks() {
    let fixture = TestFixture::new();
    let requests: Vec<_> = (0..64)
        .map(|_| json!({ "class_id": "1", "kind": "entry_list" }))
        .collect();

    let response = fixture
        .post("/api/v1/trigger", json!({ "requests": requests }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"].as_array().unwrap().len(), 63);
    assert_eq!(response.body["details"][0], "request 1: duplicate task entry_list_1");
    assert_eq!(fixture.feed.fetch_count().await, 0);
}

#[tokio::test]
async fn test_trigger_empty_batch_rejected() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/trigger", json!({ "requests": [] }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0], "batch contains no requests");
}

#[tokio::test]
async fn test_trigger_malformed_body() {
    let fixture = TestFixture::new();

    let response = fixture.post_raw("/api/v1/trigger", "{ not json").await;

    assert!(response.status.is_client_error());
    assert_eq!(fixture.feed.fetch_count().await, 0);
}

#[tokio::test]
async fn test_trigger_reports_failed_fetch() {
    let fixture = TestFixture::new();
    fixture
        .feed
        .set_failure("start_list_3", "HTTP 503: maintenance")
        .await;

    let response = fixture
        .post(
            "/api/v1/trigger",
            json!({
                "requests": [
                    { "class_id": "3", "kind": "start_list" },
                    { "class_id": "1", "kind": "start_list" }
                ]
            }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["succeeded"], 1);
    let failed = &response.body["results"][0];
    assert_eq!(failed["success"], false);
    assert_eq!(failed["error"], "HTTP 503: maintenance");
    assert!(failed["sinks"].as_array().unwrap().is_empty());
    assert!(!fixture.output_dir().join("start_list_3.csv").exists());
    assert_eq!(fixture.recorder.delivered_keys().await, vec!["start_list_1"]);
}

#[tokio::test]
async fn test_registry_refresh_without_control_sheet() {
    let fixture = TestFixture::new();

    let response = fixture.post_empty("/api/v1/registry/refresh").await;

    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"].as_str().unwrap().contains("Control!A1:C3"));
    assert_eq!(fixture.feed.fetch_count().await, 0);
}

#[tokio::test]
async fn test_registry_refresh_runs_follow_up_batch() {
    let fixture = TestFixture::new();
    fixture
        .workbook
        .write_range(
            "Control",
            CellRef::default(),
            &fixtures::rows(&[&["1", "2", "x"], &["12", "", "5"], &["4", "", "1"]]),
        )
        .unwrap();

    let response = fixture.post_empty("/api/v1/registry/refresh").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["refreshed"], true);
    assert_eq!(response.body["entries"]["1"]["racing_number"], "12");
    assert_eq!(response.body["entries"]["1"]["active_stage"], "4");
    assert!(response.body["entries"].get("2").is_none());
    assert_eq!(response.body["report"]["total"], 1);
    assert_eq!(
        response.body["report"]["results"][0]["key"],
        "enhanced_current_1_4"
    );

    assert_eq!(
        fixture.registry.racing_number(RallyClass::Class1).as_deref(),
        Some("12")
    );
    assert_eq!(fixture.workbook.cell("Live_1_4_RSz", "B2").as_deref(), Some("12"));
    assert_eq!(fixture.workbook.cell("Live_1_4_RSz", "B3"), None);

    let snapshot = fixture.get("/api/v1/registry").await;
    assert_status!(snapshot, StatusCode::OK);
    assert_eq!(snapshot.body["entries"]["1"]["racing_number"], "12");
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_registry() {
    let fixture = TestFixture::new();
    fixture
        .workbook
        .write_range(
            "Control",
            CellRef::default(),
            &fixtures::rows(&[&["2"], &["33"], &[""]]),
        )
        .unwrap();
    let first = fixture.post_empty("/api/v1/registry/refresh").await;
    assert_status!(first, StatusCode::OK);
    assert!(first.body.get("report").is_none());

    fixture
        .workbook
        .write_range("Control", CellRef::default(), &fixtures::rows(&[&[""], &[""]]))
        .unwrap();
    let second = fixture.post_empty("/api/v1/registry/refresh").await;

    assert_status!(second, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        fixture.registry.racing_number(RallyClass::Rallye2).as_deref(),
        Some("33")
    );
}

#[tokio::test]
async fn test_refresh_with_unusable_active_stage() {
    let fixture = TestFixture::new();
    fixture
        .workbook
        .write_range(
            "Control",
            CellRef::default(),
            &fixtures::rows(&[&["1"], &["12"], &["../4"]]),
        )
        .unwrap();

    let response = fixture.post_empty("/api/v1/registry/refresh").await;

    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"].as_str().unwrap().contains("stage id '../4'"));
    assert_eq!(fixture.feed.fetch_count().await, 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture
        .post(
            "/api/v1/trigger",
            json!({ "requests": [{ "class_id": "1", "kind": "route_sheet" }] }),
        )
        .await;

    let response = fixture.get("/api/v1/metrics").await;

    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("stagefeed_http_requests_total"));
    assert!(response.text.contains("stagefeed_batches_total"));
    assert!(response.text.contains("stagefeed_sink_subscriptions"));
}
