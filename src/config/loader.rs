//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Router;

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("arcade_gateway_loader_test.toml");
        fs::write(
            &path,
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[routes]]
            name = "matches"
            path_prefix = "/api/matches"
            upstream = "http://127.0.0.1:4000"
            rate_limit = { limit = 5, window_seconds = 10 }
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.routes.len(), 1);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("listener = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_malformed_policies_still_load() {
        let config = parse_config(
            r#"
            [[routes]]
            name = "missing-window"
            path_prefix = "/api/a"
            upstream = "127.0.0.1:4000"
            rate_limit = { limit = 5 }

            [[routes]]
            name = "negative-limit"
            path_prefix = "/api/b"
            upstream = "127.0.0.1:4000"
            rate_limit = { limit = -1, window_seconds = 60 }

            [[routes]]
            name = "wrong-type"
            path_prefix = "/api/c"
            upstream = "127.0.0.1:4000"
            rate_limit = { limit = "ten", window_seconds = 60 }
            "#,
        )
        .unwrap();

        let routes = Router::from_config(config.routes);
        assert_eq!(routes.routes().len(), 3);
        for route in routes.routes() {
            assert_eq!(route.rate_limit, None, "route {}", route.name);
        }
    }

    #[test]
    fn test_validation_errors_reported_together() {
        let err = parse_config(
            r#"
            [listener]
            bind_address = "nowhere"

            [rate_limit]
            sweep_probability = 2.0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
