use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `STAGEFEED_FEED__ACCESS_CODE`.
const ENV_PREFIX: &str = "STAGEFEED_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[feed]
base_url = "http://localhost:9999/live.php"
access_code = "abc"

[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.feed.access_code, "abc");
    }

    #[test]
    fn test_load_config_from_str_missing_feed() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/stagefeed.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[feed]
base_url = "http://localhost:9999/live.php"
access_code = "abc"

[server]
host = "127.0.0.1"
port = 3000

[workbook]
clean_rows = 4
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.workbook.clean_rows, 4);
    }

    #[test]
    fn test_env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "stagefeed.toml",
                r#"
[feed]
base_url = "http://localhost:9999/live.php"
access_code = "from-file"

[workbook]
clean_rows = 4
clean_cols = 3
"#,
            )?;
            jail.set_env("STAGEFEED_WORKBOOK__CLEAN_ROWS", "12");
            jail.set_env("STAGEFEED_FEED__ACCESS_CODE", "from-env");
            jail.set_env("STAGEFEED_REGISTRY__SHEET", "Setup");
            // Not a config key; the binary reads it to find the file.
            jail.set_env("STAGEFEED_CONFIG", "stagefeed.toml");

            let config = load_config(Path::new("stagefeed.toml")).map_err(|e| e.to_string())?;

            assert_eq!(config.workbook.clean_rows, 12);
            assert_eq!(config.workbook.clean_cols, 3);
            assert_eq!(config.feed.access_code, "from-env");
            assert_eq!(config.registry.sheet, "Setup");
            assert_eq!(config.server.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn test_env_can_supply_missing_section() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("stagefeed.toml", "[server]\nport = 9100\n")?;
            jail.set_env("STAGEFEED_FEED__BASE_URL", "http://localhost:9999/live.php");
            jail.set_env("STAGEFEED_FEED__ACCESS_CODE", "abc");

            let config = load_config(Path::new("stagefeed.toml")).map_err(|e| e.to_string())?;

            assert_eq!(config.server.port, 9100);
            assert_eq!(config.feed.base_url, "http://localhost:9999/live.php");
            Ok(())
        });
    }

    #[test]
    fn test_env_override_with_wrong_type_fails() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "stagefeed.toml",
                r#"
[feed]
base_url = "http://localhost:9999/live.php"
access_code = "abc"
"#,
            )?;
            jail.set_env("STAGEFEED_WORKBOOK__CLEAN_ROWS", "lots");

            let err = load_config(Path::new("stagefeed.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }
}
