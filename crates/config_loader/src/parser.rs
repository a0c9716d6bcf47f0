//! Configuration parsing
//!
//! TOML (primary) and JSON formats.

use contracts::{ContractError, MediaSyncConfig};
use std::path::Path;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Format of a config file, from its extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

/// Serialize a configuration in `format`
pub fn render(config: &MediaSyncConfig, format: ConfigFormat) -> Result<String, ContractError> {
    match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}"))),
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}"))),
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<MediaSyncConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<MediaSyncConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<MediaSyncConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReadyState, ScriptedEvent};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[engine]
tolerance_ms = 40.0
poll_interval_ms = 1000
min_ready_state = "have_current_data"

[correlation]
master_time = 1000.0
other_time = 500.0

[simulation]
master_start = 1000.0
follower_skew = 1.01
duration_ms = 5000

[[simulation.events]]
type = "master_stall"
at_ms = 1000
until_ms = 3000

[[simulation.events]]
type = "speed_change"
at_ms = 4000
speed = 0.0
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.engine.poll_interval_ms, 1000);
        assert_eq!(config.engine.min_ready_state, ReadyState::HaveCurrentData);
        assert_eq!(config.correlation.offset(), -500.0);
        assert_eq!(config.simulation.events.len(), 2);
        assert_eq!(
            config.simulation.events[1],
            ScriptedEvent::SpeedChange {
                at_ms: 4000,
                speed: 0.0
            }
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "engine": { "tolerance_ms": 50.0 },
            "correlation": { "master_time": 0.0, "other_time": 2.5 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().correlation.other_time, 2.5);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let content = r#"
[[simulation.events]]
type = "teleport"
at_ms = 10
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("session.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("media-sync")).is_err());
    }
}
