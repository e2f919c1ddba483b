//! Batch lifecycle integration tests.
//!
//! These tests run batches through the full export fan-out with a mock feed
//! and real sinks:
//! - CSV files and workbook sheets per kind, class and stage
//! - Registry refresh from the workbook driving the racing number view
//! - Failure isolation between tasks

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use stagefeed_core::{
    orchestrator::follow_up_requests,
    testing::{fixtures, MockFeedClient},
    CallbackBus, CellRef, CsvDirWorkbook, CsvFileSink, DataKind, FetchRequest,
    RacingNumberViewSink, RallyClass, RegionWriter, RegistryStore, SpreadsheetSink,
    TaskOrchestrator, Workbook,
};

/// Test helper wiring a mock feed to CSV, sheet and view sinks.
struct TestHarness {
    orchestrator: TaskOrchestrator,
    feed: MockFeedClient,
    registry: Arc<RegistryStore>,
    workbook: Arc<CsvDirWorkbook>,
    output_dir: TempDir,
    _workbook_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let output_dir = TempDir::new().expect("Failed to create output dir");
        let workbook_dir = TempDir::new().expect("Failed to create workbook dir");
        let workbook = Arc::new(CsvDirWorkbook::open(workbook_dir.path()).expect("Failed to open workbook"));
        let registry = Arc::new(RegistryStore::new());
        let writer = RegionWriter::new(CellRef::default(), 5, 2);

        let bus = Arc::new(CallbackBus::new());
        let csv_sink = Arc::new(CsvFileSink::new(output_dir.path(), b','));
        let sheet_sink = Arc::new(SpreadsheetSink::new(workbook.clone(), writer));
        let view_sink = Arc::new(RacingNumberViewSink::new(registry.clone(), workbook.clone(), writer));
        for kind in DataKind::ALL {
            bus.subscribe(kind, csv_sink.clone());
            bus.subscribe(kind, sheet_sink.clone());
        }
        bus.subscribe(DataKind::EnhancedCurrent, view_sink);

        let feed = MockFeedClient::new();
        let orchestrator = TaskOrchestrator::new(Arc::new(feed.clone()), bus);

        Self {
            orchestrator,
            feed,
            registry,
            workbook,
            output_dir,
            _workbook_dir: workbook_dir,
        }
    }

    fn csv(&self, name: &str) -> String {
        fs::read_to_string(self.output_dir.path().join(name)).expect("CSV file missing")
    }
}

fn request(class: &str, kind: &str, stages: Option<Vec<&str>>) -> FetchRequest {
    FetchRequest {
        class_id: class.to_string(),
        kind: kind.to_string(),
        stage_ids: stages.map(|s| s.iter().map(|x| x.to_string()).collect()),
    }
}

#[tokio::test]
async fn test_batch_exports_every_task() {
    let harness = TestHarness::new();
    harness
        .feed
        .set_delay("stage_results_1_1", Duration::from_millis(30))
        .await;

    let report = harness
        .orchestrator
        .run_batch(&[
            request("1", "stage_results", Some(vec!["1", "2"])),
            request("2", "entry_list", None),
        ])
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    for outcome in &report.results {
        assert_eq!(outcome.sinks.len(), 2, "{}", outcome.key);
        assert_eq!(outcome.rows, 2);
    }

    let content = harness.csv("stage_results_1_2.csv");
    assert!(content.starts_with("Hely,RSz,Név,Idő\n"));
    assert!(!content.contains("Course car"));
    assert!(harness.output_dir.path().join("entry_list_2.csv").exists());

    let sheets = harness.workbook.sheet_names().unwrap();
    assert_eq!(sheets, vec!["Entry_2", "Results_1_1", "Results_1_2"]);
    assert!(harness.workbook.sheet_path("Results_1_1").exists());
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_output() {
    let harness = TestHarness::new();
    harness
        .feed
        .set_failure("start_list_3", "request timed out")
        .await;

    let report = harness
        .orchestrator
        .run_batch(&[request("3", "start_list", None), request("1", "start_list", None)])
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(!harness.output_dir.path().join("start_list_3.csv").exists());
    assert!(harness.output_dir.path().join("start_list_1.csv").exists());
    assert_eq!(harness.workbook.sheet_names().unwrap(), vec!["Start_1"]);
}

#[tokio::test]
async fn test_smaller_refetch_clears_previous_rows() {
    let harness = TestHarness::new();
    let many: Vec<Vec<String>> = std::iter::once(vec!["RSz".to_string(), "Név".to_string(), "Idő".to_string()])
        .chain((1..=6).map(|n| vec![n.to_string(), format!("Crew {}", n), "5:00.0".to_string()]))
        .collect();
    harness.feed.set_rows("route_sheet_1", many).await;
    harness
        .orchestrator
        .run_batch(&[request("1", "route_sheet", None)])
        .await
        .unwrap();

    harness
        .feed
        .set_rows("route_sheet_1", fixtures::rows(&[&["RSz", "Név"], &["1", "Crew 1"]]))
        .await;
    harness
        .orchestrator
        .run_batch(&[request("1", "route_sheet", None)])
        .await
        .unwrap();

    let range = "A1:C7".parse().unwrap();
    let rows = harness.workbook.read_range("Route_1", &range).unwrap();
    assert_eq!(rows[0], vec!["RSz", "Név", ""]);
    assert_eq!(rows[1], vec!["1", "Crew 1", ""]);
    assert!(rows[2..].iter().all(|r| r.iter().all(String::is_empty)));
}

#[tokio::test]
async fn test_registry_refresh_drives_follow_up_view() {
    let harness = TestHarness::new();
    harness
        .workbook
        .write_range(
            "Control",
            CellRef::default(),
            &fixtures::rows(&[&["1", "2", "x"], &["12", "", "5"], &["4", "", "1"]]),
        )
        .unwrap();

    let range = "A1:C3".parse().unwrap();
    assert!(harness.registry.refresh(harness.workbook.as_ref(), "Control", &range));

    let requests = follow_up_requests(&harness.registry.active_stages(), &[DataKind::EnhancedCurrent]);
    assert_eq!(requests.len(), 1);

    let report = harness.orchestrator.run_batch(&requests).await.unwrap();
    assert!(report.all_succeeded());
    let outcome = report.outcome("enhanced_current_1_4").unwrap();
    let sinks: Vec<&str> = outcome.sinks.iter().map(|s| s.sink.as_str()).collect();
    assert_eq!(sinks, vec!["csv_file", "spreadsheet", "racing_number_view"]);

    let view = harness
        .workbook
        .read_range("Live_1_4_RSz", &"A1:D3".parse().unwrap())
        .unwrap();
    assert_eq!(view[0][1], "RSz");
    assert_eq!(view[1], vec!["2", "12", "Nagy Anna", "5:14.9"]);
    assert!(view[2].iter().all(String::is_empty));
    assert_eq!(harness.registry.racing_number(RallyClass::Class1).as_deref(), Some("12"));
}

#[tokio::test]
async fn test_control_sheet_edited_on_disk_retargets_view() {
    let harness = TestHarness::new();
    harness
        .workbook
        .write_range(
            "Control",
            CellRef::default(),
            &fixtures::rows(&[&["1"], &["12"], &["4"]]),
        )
        .unwrap();
    let range = "A1:A3".parse().unwrap();
    assert!(harness.registry.refresh(harness.workbook.as_ref(), "Control", &range));

    // Someone else saves the control sheet: new number, new stage.
    fs::write(harness.workbook.sheet_path("Control"), "1\n7\n5\n").unwrap();
    assert!(harness.registry.refresh(harness.workbook.as_ref(), "Control", &range));

    let requests = follow_up_requests(&harness.registry.active_stages(), &[DataKind::EnhancedCurrent]);
    let report = harness.orchestrator.run_batch(&requests).await.unwrap();

    assert!(report.outcome("enhanced_current_1_5").is_some());
    let view = harness
        .workbook
        .read_range("Live_1_5_RSz", &"A1:D2".parse().unwrap())
        .unwrap();
    assert_eq!(view[1], vec!["1", "7", "Kiss Péter", "5:12.3"]);
}
