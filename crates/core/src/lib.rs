pub mod bus;
pub mod config;
pub mod feed;
pub mod filter;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod sink;
pub mod testing;
pub mod workbook;

pub use bus::{CallbackBus, DispatchReport, Sink, SinkError, SinkOutcome};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    WorkbookBackend,
};
pub use feed::{DataKind, FeedClient, HttpFeedClient, RallyClass, TabularResponse};
pub use filter::{filter_rows, RACING_NUMBER_COLUMN, RACING_NUMBER_THRESHOLD};
pub use orchestrator::{BatchReport, FetchRequest, FetchTask, TaskOrchestrator, ValidationError};
pub use registry::{RegistryEntry, RegistryRefreshError, RegistryStore};
pub use sink::{CsvFileSink, LatestTableSink, RacingNumberViewSink, RegionWriter, SpreadsheetSink};
pub use workbook::{column_letter, CellRange, CellRef, CsvDirWorkbook, MemoryWorkbook, Workbook};
