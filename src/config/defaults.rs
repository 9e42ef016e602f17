//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Log level filter (default: "info")
    pub log_level: String,

    /// Directory for downloaded artifacts (default: "/tmp/wps-client/data")
    pub artifacts_path: String,

    /// MapServer CGI URL (default: "http://localhost/cgi-bin/mapserv")
    pub map_server_url: String,

    /// Directory mapfiles are written to (default: "/tmp/wps-client/maps")
    pub map_files_path: String,

    /// Primary EPSG code of published maps (default: "4326")
    pub epsg: String,

    /// Transport timeout in seconds (default: 60)
    pub timeout_seconds: u64,

    /// Delay between status polls in seconds (default: 5)
    pub poll_interval_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            artifacts_path: "/tmp/wps-client/data".to_string(),
            map_server_url: "http://localhost/cgi-bin/mapserv".to_string(),
            map_files_path: "/tmp/wps-client/maps".to_string(),
            epsg: "4326".to_string(),
            timeout_seconds: 60,
            poll_interval_seconds: 5,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "logging": {
                "level": self.log_level
            },
            "data": {
                "artifacts_path": self.artifacts_path
            },
            "mapserver": {
                "map_server_url": self.map_server_url,
                "map_files_path": self.map_files_path,
                "epsg": self.epsg,
                "other_projs": []
            },
            "transport": {
                "timeout_seconds": self.timeout_seconds
            },
            "polling": {
                "interval_seconds": self.poll_interval_seconds
            }
        })
    }
}
