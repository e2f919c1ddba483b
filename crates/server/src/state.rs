use std::sync::Arc;
use stagefeed_core::{
    CallbackBus, Config, LatestTableSink, RegistryStore, SanitizedConfig, TaskOrchestrator,
    Workbook,
};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<TaskOrchestrator>,
    registry: Arc<RegistryStore>,
    workbook: Arc<dyn Workbook>,
    /// Newest table per resource key; subscribed to every kind.
    latest: Arc<LatestTableSink>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<TaskOrchestrator>,
        registry: Arc<RegistryStore>,
        workbook: Arc<dyn Workbook>,
        latest: Arc<LatestTableSink>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            registry,
            workbook,
            latest,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    pub fn bus(&self) -> &Arc<CallbackBus> {
        self.orchestrator.bus()
    }

    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    pub fn workbook(&self) -> &Arc<dyn Workbook> {
        &self.workbook
    }

    pub fn latest(&self) -> &Arc<LatestTableSink> {
        &self.latest
    }
}
