//! Types shared by the feed client and everything downstream of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Competition class (the feed's `oszt` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RallyClass {
    /// Class 1, national and international (ERC) entries.
    #[serde(rename = "1")]
    Class1,
    /// Rallye2.
    #[serde(rename = "2")]
    Rallye2,
    /// Historic.
    #[serde(rename = "3")]
    Historic,
}

impl RallyClass {
    /// Every class, in feed order.
    pub const ALL: [RallyClass; 3] = [RallyClass::Class1, RallyClass::Rallye2, RallyClass::Historic];

    /// Identifier used by the feed and in output names.
    pub fn id(&self) -> &'static str {
        match self {
            RallyClass::Class1 => "1",
            RallyClass::Rallye2 => "2",
            RallyClass::Historic => "3",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            RallyClass::Class1 => "Class 1 (national + international/ERC)",
            RallyClass::Rallye2 => "Rallye2",
            RallyClass::Historic => "Historic",
        }
    }
}

impl fmt::Display for RallyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when a string is not a member of a closed identifier set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {what} '{value}' (valid: {valid})")]
pub struct UnknownIdentifier {
    pub what: &'static str,
    pub value: String,
    pub valid: String,
}

impl FromStr for RallyClass {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RallyClass::ALL
            .into_iter()
            .find(|c| c.id() == trimmed)
            .ok_or_else(|| UnknownIdentifier {
                what: "class",
                value: s.to_string(),
                valid: RallyClass::ALL
                    .iter()
                    .map(|c| c.id())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Static properties of one data kind.
#[derive(Debug, Clone, Copy)]
struct KindSpec {
    name: &'static str,
    code: &'static str,
    stage_scoped: bool,
    file_stem: &'static str,
    sheet_stem: &'static str,
}

/// Which data product is fetched from the feed (the feed's `a` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    EntryList,
    StartList,
    RouteSheet,
    StageResults,
    CurrentStage,
    EnhancedCurrent,
}

impl DataKind {
    /// Every kind, in declaration order.
    pub const ALL: [DataKind; 6] = [
        DataKind::EntryList,
        DataKind::StartList,
        DataKind::RouteSheet,
        DataKind::StageResults,
        DataKind::CurrentStage,
        DataKind::EnhancedCurrent,
    ];

    fn spec(&self) -> KindSpec {
        match self {
            DataKind::EntryList => KindSpec {
                name: "entry_list",
                code: "8",
                stage_scoped: false,
                file_stem: "entry_list",
                sheet_stem: "Entry",
            },
            DataKind::StartList => KindSpec {
                name: "start_list",
                code: "9",
                stage_scoped: false,
                file_stem: "start_list",
                sheet_stem: "Start",
            },
            DataKind::RouteSheet => KindSpec {
                name: "route_sheet",
                code: "10",
                stage_scoped: false,
                file_stem: "route_sheet",
                sheet_stem: "Route",
            },
            DataKind::StageResults => KindSpec {
                name: "stage_results",
                code: "3",
                stage_scoped: true,
                file_stem: "stage_results",
                sheet_stem: "Results",
            },
            DataKind::CurrentStage => KindSpec {
                name: "current_stage",
                code: "4",
                stage_scoped: true,
                file_stem: "current_stage",
                sheet_stem: "OnStage",
            },
            DataKind::EnhancedCurrent => KindSpec {
                name: "enhanced_current",
                code: "104",
                stage_scoped: true,
                file_stem: "enhanced_current",
                sheet_stem: "Live",
            },
        }
    }

    /// snake_case name used in requests and logs.
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Endpoint code understood by the feed.
    pub fn code(&self) -> &'static str {
        self.spec().code
    }

    /// Whether requests of this kind target individual stages.
    pub fn is_stage_scoped(&self) -> bool {
        self.spec().stage_scoped
    }

    /// Stem for flat-file names.
    pub fn file_stem(&self) -> &'static str {
        self.spec().file_stem
    }

    /// Stem for workbook sheet names.
    pub fn sheet_stem(&self) -> &'static str {
        self.spec().sheet_stem
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = UnknownIdentifier;

    /// Accepts either the snake_case name or the feed endpoint code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DataKind::ALL
            .into_iter()
            .find(|k| k.name() == trimmed || k.code() == trimmed)
            .ok_or_else(|| UnknownIdentifier {
                what: "kind",
                value: s.to_string(),
                valid: DataKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Result of one feed fetch.
///
/// Immutable once built. A successful response always has at least the
/// header row; a failed one has no rows and carries a failure detail.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResponse {
    kind: DataKind,
    class: RallyClass,
    stage_id: Option<String>,
    rows: Vec<Vec<String>>,
    failure_detail: Option<String>,
    fetched_at: DateTime<Utc>,
}

impl TabularResponse {
    /// Build a successful response. Returns a failure instead if `rows` is
    /// empty, since a successful fetch must at least carry its header.
    pub fn success(
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        if rows.is_empty() {
            return Self::failure(kind, class, stage_id, "empty payload: no header row");
        }
        Self {
            kind,
            class,
            stage_id,
            rows,
            failure_detail: None,
            fetched_at: Utc::now(),
        }
    }

    /// Build a failed response.
    pub fn failure(
        kind: DataKind,
        class: RallyClass,
        stage_id: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            class,
            stage_id,
            rows: Vec::new(),
            failure_detail: Some(detail.into()),
            fetched_at: Utc::now(),
        }
    }

    /// Copy of this response carrying different rows (used by the row filter).
    pub fn with_rows(&self, rows: Vec<Vec<String>>) -> Self {
        Self {
            kind: self.kind,
            class: self.class,
            stage_id: self.stage_id.clone(),
            rows,
            failure_detail: self.failure_detail.clone(),
            fetched_at: self.fetched_at,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn class(&self) -> RallyClass {
        self.class
    }

    pub fn stage_id(&self) -> Option<&str> {
        self.stage_id.as_deref()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Header row, if any.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Number of rows below the header.
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn succeeded(&self) -> bool {
        self.failure_detail.is_none()
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.failure_detail.as_deref()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Stable name for outputs derived from this table:
    /// `<file_stem>_<class>[_<stage>]`.
    pub fn resource_key(&self) -> String {
        resource_key(self.kind, self.class, self.stage_id.as_deref())
    }
}

/// `<file_stem>_<class>[_<stage>]`, shared by tasks, files and reports.
pub fn resource_key(kind: DataKind, class: RallyClass, stage_id: Option<&str>) -> String {
    match stage_id {
        Some(stage) => format!("{}_{}_{}", kind.file_stem(), class.id(), stage),
        None => format!("{}_{}", kind.file_stem(), class.id()),
    }
}

/// Whether `stage` can go into file and sheet names as is: ASCII letters,
/// digits, `-`, `_` and `.`, but never `.` or `..` alone.
pub fn is_safe_stage_id(stage: &str) -> bool {
    !stage.is_empty()
        && stage != "."
        && stage != ".."
        && stage
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Errors raised inside the feed client. `fetch` folds them into a failed
/// [`TabularResponse`]; only client construction returns them directly.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to parse payload: {0}")]
    Parse(String),
}
