use super::{types::Config, ConfigError};
use crate::workbook::{CellRange, CellRef};

/// Rows the registry control range must span: classes, racing numbers, stages.
const REGISTRY_ROWS: u32 = 3;

/// Validate configuration
/// Currently validates:
/// - Feed section exists (enforced by serde) and its URL parses
/// - Server port is not 0, feed timeout is not 0
/// - Export delimiter is a single ASCII character
/// - Workbook anchor and registry range are valid cell references
/// - Follow-up kinds are stage-scoped
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    reqwest::Url::parse(&config.feed.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "feed.base_url '{}' is not a valid URL: {}",
            config.feed.base_url, e
        ))
    })?;

    if config.feed.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "feed.timeout_secs cannot be 0".to_string(),
        ));
    }

    let delimiter = config.export.delimiter.as_bytes();
    if delimiter.len() != 1 || !delimiter[0].is_ascii() {
        return Err(ConfigError::ValidationError(format!(
            "export.delimiter must be a single ASCII character, got '{}'",
            config.export.delimiter
        )));
    }

    config
        .workbook
        .anchor
        .parse::<CellRef>()
        .map_err(|e| ConfigError::ValidationError(format!("workbook.anchor: {}", e)))?;

    let range = config
        .registry
        .range
        .parse::<CellRange>()
        .map_err(|e| ConfigError::ValidationError(format!("registry.range: {}", e)))?;
    if range.height() < REGISTRY_ROWS {
        return Err(ConfigError::ValidationError(format!(
            "registry.range '{}' must span at least {} rows",
            config.registry.range, REGISTRY_ROWS
        )));
    }

    if let Some(kind) = config
        .registry
        .follow_up_kinds
        .iter()
        .find(|k| !k.is_stage_scoped())
    {
        return Err(ConfigError::ValidationError(format!(
            "registry.follow_up_kinds: '{}' is not stage-scoped",
            kind
        )));
    }

    Ok(())
}
