//! Client configuration
//!
//! Three layers, merged in order:
//! 1. Built-in defaults
//! 2. Config file (`wps-client.toml`, or the path given with `--config`)
//! 3. CLI overrides
//!
//! The merged value is deserialized into [`ClientConfig`] and validated.

mod defaults;
mod merge;

pub use defaults::BuiltinDefaults;
pub use merge::{deep_merge, merge_layers, toml_to_json};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::HttpTransportConfig;
use crate::map::PublishSettings;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "wps-client.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `wps_client=debug`
    pub level: String,
    /// Log file; stderr only when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// `[data]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Where complex outputs are stored; also the map's shape path
    pub artifacts_path: PathBuf,
}

/// `[mapserver]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapServerConfig {
    pub map_server_url: String,
    pub map_files_path: PathBuf,
    pub epsg: String,
    #[serde(default)]
    pub other_projs: Vec<String>,
    #[serde(default)]
    pub map_template: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// `[transport]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub timeout_seconds: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// `[polling]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// Give up after this many polls; unbounded when absent
    #[serde(default)]
    pub max_polls: Option<u32>,
}

/// Merged and validated client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub logging: LoggingConfig,
    pub data: DataConfig,
    pub mapserver: MapServerConfig,
    pub transport: TransportConfig,
    pub polling: PollingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            logging: LoggingConfig {
                level: defaults.log_level,
                file: None,
            },
            data: DataConfig {
                artifacts_path: PathBuf::from(defaults.artifacts_path),
            },
            mapserver: MapServerConfig {
                map_server_url: defaults.map_server_url,
                map_files_path: PathBuf::from(defaults.map_files_path),
                epsg: defaults.epsg,
                other_projs: Vec::new(),
                map_template: None,
                image_path: None,
                image_url: None,
            },
            transport: TransportConfig {
                timeout_seconds: defaults.timeout_seconds,
                user_agent: None,
            },
            polling: PollingConfig {
                interval_seconds: defaults.poll_interval_seconds,
                max_polls: None,
            },
        }
    }
}

impl ClientConfig {
    /// Merge defaults, an optional config file and CLI overrides.
    ///
    /// A missing file given explicitly is an error; the default file is
    /// optional.
    pub fn load(path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];

        match path {
            Some(path) => layers.push(load_toml_file(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    layers.push(load_toml_file(default)?);
                }
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
        }

        Self::from_value(merge_layers(layers))
    }

    /// Parse TOML text layered over the defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml: toml::Value = toml::from_str(text)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
        Self::from_value(merge_layers([
            BuiltinDefaults::default().to_value(),
            toml_to_json(toml),
        ]))
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.to_ascii_lowercase();
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.transport.timeout_seconds == 0 || self.transport.timeout_seconds > 3600 {
            return Err(ConfigError::ValidationError(
                "transport.timeout_seconds must be in (0, 3600]".to_string(),
            ));
        }

        if self.polling.interval_seconds > 3600 {
            return Err(ConfigError::ValidationError(
                "polling.interval_seconds must be in [0, 3600]".to_string(),
            ));
        }

        for code in std::iter::once(&self.mapserver.epsg).chain(&self.mapserver.other_projs) {
            if !is_epsg_code(code) {
                return Err(ConfigError::ValidationError(format!(
                    "not an EPSG code: {:?}",
                    code
                )));
            }
        }

        Ok(())
    }

    /// Map publication settings
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            shape_path: self.data.artifacts_path.clone(),
            epsg: strip_epsg_prefix(&self.mapserver.epsg).to_string(),
            other_projs: self.mapserver.other_projs.clone(),
            map_template: self.mapserver.map_template.clone(),
            image_path: self.mapserver.image_path.clone(),
            image_url: self.mapserver.image_url.clone(),
            map_server_url: self.mapserver.map_server_url.clone(),
            map_files_path: self.mapserver.map_files_path.clone(),
        }
    }

    /// HTTP transport settings
    pub fn transport_config(&self) -> HttpTransportConfig {
        let defaults = HttpTransportConfig::default();
        HttpTransportConfig {
            timeout_seconds: self.transport.timeout_seconds,
            user_agent: self.transport.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

/// Load and parse a TOML file
fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
    let toml: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
    Ok(toml_to_json(toml))
}

fn strip_epsg_prefix(code: &str) -> &str {
    let code = code.trim();
    code.strip_prefix("EPSG:")
        .or_else(|| code.strip_prefix("epsg:"))
        .unwrap_or(code)
}

fn is_epsg_code(code: &str) -> bool {
    let digits = strip_epsg_prefix(code);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mapserver.epsg, "4326");
        assert!(config.mapserver.other_projs.is_empty());
        assert_eq!(config.polling.max_polls, None);
        assert!(config.validate().is_ok());
        assert_eq!(
            ClientConfig::from_toml_str("").unwrap(),
            config
        );
    }

    #[test]
    fn test_from_toml_overrides_sections() {
        let config = ClientConfig::from_toml_str(
            r#"
            [logging]
            level = "debug"
            file = "/var/log/wps-client.log"

            [mapserver]
            epsg = "EPSG:3035"
            other_projs = ["EPSG:4326", "28992"]
            image_url = "http://host/ms_tmp/"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/wps-client.log")));
        assert_eq!(config.mapserver.other_projs.len(), 2);
        // untouched keys keep their defaults
        assert_eq!(config.mapserver.map_server_url, "http://localhost/cgi-bin/mapserv");

        let settings = config.publish_settings();
        assert_eq!(settings.epsg, "3035");
        assert_eq!(settings.image_url.as_deref(), Some("http://host/ms_tmp/"));
        assert_eq!(settings.shape_path, config.data.artifacts_path);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("[transport]\ntimeout_seconds = 0"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("[mapserver]\nepsg = \"WGS84\""),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("[logging]\nlevel = \"loud\""),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("[logging"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_file_then_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport]\ntimeout_seconds = 90\n[polling]\ninterval_seconds = 2").unwrap();

        let config = ClientConfig::load(
            Some(file.path()),
            Some(json!({"polling": {"max_polls": 10}})),
        )
        .unwrap();

        assert_eq!(config.transport.timeout_seconds, 90);
        assert_eq!(config.polling.interval_seconds, 2);
        assert_eq!(config.polling.max_polls, Some(10));
        assert_eq!(config.transport_config().timeout_seconds, 90);
    }

    #[test]
    fn test_missing_explicit_file() {
        assert!(matches!(
            ClientConfig::load(Some(Path::new("/nonexistent/wps-client.toml")), None),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_filter_directive_accepted() {
        let config = ClientConfig::from_toml_str("[logging]\nlevel = \"wps_client=debug\"").unwrap();
        assert_eq!(config.logging.level, "wps_client=debug");
    }
}
