//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the feed and for sinks so batches can be run end
//! to end without a network or a workbook.
//!
//! # Example
//!
//! ```rust,ignore
//! use stagefeed_core::testing::{fixtures, MockFeedClient, RecordingSink};
//!
//! let feed = MockFeedClient::new();
//! feed.set_failure("stage_results_1_2", "HTTP 503").await;
//!
//! let sink = RecordingSink::new("recorder");
//! // Subscribe the sink, run a batch, then:
//! assert_eq!(sink.delivered().await.len(), 1);
//! ```

mod mock_feed;
mod mock_sink;

pub use mock_feed::{MockFeedClient, RecordedFetch};
pub use mock_sink::{FailingSink, RecordingSink};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::feed::{DataKind, RallyClass, TabularResponse};

    /// Turn string literals into owned rows.
    pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    /// Rows the mock feed returns by default: two crews and one course car
    /// above the racing number threshold.
    pub fn default_rows() -> Vec<Vec<String>> {
        rows(&[
            &["Hely", "RSz", "Név", "Idő"],
            &["1", "7", "Kiss Péter", "5:12.3"],
            &["2", "12", "Nagy Anna", "5:14.9"],
            &["", "950", "Course car", ""],
        ])
    }

    /// Successful table with [`default_rows`].
    pub fn table(kind: DataKind, class: RallyClass, stage_id: Option<&str>) -> TabularResponse {
        TabularResponse::success(kind, class, stage_id.map(str::to_string), default_rows())
    }

    /// Successful entry list for `class`.
    pub fn entry_list(class: RallyClass) -> TabularResponse {
        table(DataKind::EntryList, class, None)
    }

    /// Successful stage results for `class` on `stage`.
    pub fn stage_results(class: RallyClass, stage: &str) -> TabularResponse {
        table(DataKind::StageResults, class, Some(stage))
    }
}
