use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::feed::DataKind;
use crate::sink::RegionWriter;
use crate::workbook::{CellRange, WorkbookError};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub workbook: WorkbookConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Results feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Feed endpoint, without query string.
    pub base_url: String,
    /// Access code sent as the `error` query parameter.
    pub access_code: String,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Idle connections kept per host (default: 10)
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

fn default_user_agent() -> String {
    format!("stagefeed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_max_idle() -> usize {
    10
}

/// Flat-file export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Single ASCII character.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            delimiter: default_delimiter(),
        }
    }
}

impl ExportConfig {
    /// Delimiter as a byte; `,` when unset.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Workbook backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkbookBackend {
    /// In-process grid; contents are lost on exit.
    Memory,
    /// Directory with one CSV file per sheet.
    CsvDir,
}

/// Shared workbook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkbookConfig {
    #[serde(default = "default_backend")]
    pub backend: WorkbookBackend,
    #[serde(default = "default_workbook_path")]
    pub path: PathBuf,
    /// Top-left cell of every exported region.
    #[serde(default = "default_anchor")]
    pub anchor: String,
    /// Rows cleared below each written region.
    #[serde(default)]
    pub clean_rows: u32,
    /// Columns cleared right of each written region.
    #[serde(default)]
    pub clean_cols: u32,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_workbook_path(),
            anchor: default_anchor(),
            clean_rows: 0,
            clean_cols: 0,
        }
    }
}

impl WorkbookConfig {
    /// Region writer for the configured anchor and clean margins.
    pub fn region_writer(&self) -> Result<RegionWriter, WorkbookError> {
        Ok(RegionWriter::new(
            self.anchor.parse()?,
            self.clean_rows,
            self.clean_cols,
        ))
    }
}

fn default_backend() -> WorkbookBackend {
    WorkbookBackend::Memory
}

fn default_workbook_path() -> PathBuf {
    PathBuf::from("workbook")
}

fn default_anchor() -> String {
    "A1".to_string()
}

/// Racing-number registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Sheet holding the control range.
    #[serde(default = "default_registry_sheet")]
    pub sheet: String,
    /// Three-row range: classes, racing numbers, active stages.
    #[serde(default = "default_registry_range")]
    pub range: String,
    /// Kinds fetched for every class's active stage after a refresh.
    #[serde(default = "default_follow_up_kinds")]
    pub follow_up_kinds: Vec<DataKind>,
    /// Kinds that also get the racing-number filtered view.
    #[serde(default = "default_view_kinds")]
    pub view_kinds: Vec<DataKind>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sheet: default_registry_sheet(),
            range: default_registry_range(),
            follow_up_kinds: default_follow_up_kinds(),
            view_kinds: default_view_kinds(),
        }
    }
}

impl RegistryConfig {
    pub fn cell_range(&self) -> Result<CellRange, WorkbookError> {
        self.range.parse()
    }
}

fn default_registry_sheet() -> String {
    "Control".to_string()
}

fn default_registry_range() -> String {
    "A1:C3".to_string()
}

fn default_follow_up_kinds() -> Vec<DataKind> {
    vec![DataKind::EnhancedCurrent]
}

fn default_view_kinds() -> Vec<DataKind> {
    vec![DataKind::EnhancedCurrent]
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub feed: SanitizedFeedConfig,
    pub export: ExportConfig,
    pub workbook: WorkbookConfig,
    pub registry: RegistryConfig,
}

/// Sanitized feed config (access code hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFeedConfig {
    pub base_url: String,
    pub access_code_configured: bool,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_idle_per_host: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            feed: SanitizedFeedConfig {
                base_url: config.feed.base_url.clone(),
                access_code_configured: !config.feed.access_code.is_empty(),
                user_agent: config.feed.user_agent.clone(),
                timeout_secs: config.feed.timeout_secs,
                max_idle_per_host: config.feed.max_idle_per_host,
            },
            export: config.export.clone(),
            workbook: config.workbook.clone(),
            registry: config.registry.clone(),
        }
    }
}
