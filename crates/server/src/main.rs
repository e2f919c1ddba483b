use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagefeed_core::{
    load_config, validate_config, CallbackBus, Config, CsvDirWorkbook, CsvFileSink, DataKind,
    HttpFeedClient, LatestTableSink, MemoryWorkbook, RacingNumberViewSink, RegistryStore, SpreadsheetSink,
    TaskOrchestrator, Workbook, WorkbookBackend,
};
use stagefeed_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stagefeed v{}", VERSION);

    let config_path = std::env::var("STAGEFEED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Feed endpoint: {}", config.feed.base_url);
    info!("CSV output directory: {:?}", config.export.output_dir);

    let workbook = open_workbook(&config)?;
    let registry = Arc::new(RegistryStore::new());
    let latest = Arc::new(LatestTableSink::new());
    let bus = Arc::new(build_bus(
        &config,
        Arc::clone(&registry),
        Arc::clone(&workbook),
        Arc::clone(&latest),
    )?);

    let client = HttpFeedClient::new(config.feed.clone()).context("Failed to create feed client")?;
    let orchestrator = Arc::new(TaskOrchestrator::new(Arc::new(client), bus));

    // Pick up whatever the control range already holds; a blank workbook is fine.
    let range = config
        .registry
        .cell_range()
        .context("Invalid registry range")?;
    {
        let registry = Arc::clone(&registry);
        let workbook = Arc::clone(&workbook);
        let sheet = config.registry.sheet.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            registry.refresh(workbook.as_ref(), &sheet, &range)
        })
        .await
        .context("Initial registry refresh panicked")?;
        if !loaded {
            warn!("Registry is empty until the control range is filled in");
        }
    }

    let state = Arc::new(AppState::new(
        config.clone(),
        orchestrator,
        registry,
        workbook,
        latest,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

fn open_workbook(config: &Config) -> Result<Arc<dyn Workbook>> {
    match config.workbook.backend {
        WorkbookBackend::Memory => {
            info!("Using in-memory workbook");
            Ok(Arc::new(MemoryWorkbook::new("stagefeed")))
        }
        WorkbookBackend::CsvDir => {
            info!("Opening workbook directory {:?}", config.workbook.path);
            let workbook = CsvDirWorkbook::open(&config.workbook.path).with_context(|| {
                format!("Failed to open workbook at {:?}", config.workbook.path)
            })?;
            Ok(Arc::new(workbook))
        }
    }
}

/// Subscribe the CSV, sheet and latest-table sinks to every kind, and the
/// racing number view to the configured view kinds.
fn build_bus(
    config: &Config,
    registry: Arc<RegistryStore>,
    workbook: Arc<dyn Workbook>,
    latest: Arc<LatestTableSink>,
) -> Result<CallbackBus> {
    let writer = config
        .workbook
        .region_writer()
        .context("Invalid workbook anchor")?;

    let csv_sink = Arc::new(CsvFileSink::new(
        &config.export.output_dir,
        config.export.delimiter_byte(),
    ));
    let sheet_sink = Arc::new(SpreadsheetSink::new(Arc::clone(&workbook), writer));
    let view_sink = Arc::new(RacingNumberViewSink::new(registry, workbook, writer));

    let bus = CallbackBus::new();
    for kind in DataKind::ALL {
        bus.subscribe(kind, csv_sink.clone());
        bus.subscribe(kind, sheet_sink.clone());
        bus.subscribe(kind, latest.clone());
    }
    for kind in &config.registry.view_kinds {
        bus.subscribe(*kind, view_sink.clone());
    }
    info!(
        view_kinds = config.registry.view_kinds.len(),
        "Sinks subscribed"
    );

    Ok(bus)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
