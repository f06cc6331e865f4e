//! Configuration system.
//!
//! Loads engine configuration from JSON strings/files.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration of the resource layer and the demo host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory all asset paths are resolved against.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Assets loaded at startup and held for the whole run.
    #[serde(default)]
    pub preload: Vec<String>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Treat resources still referenced at shutdown as a failure.
    #[serde(default)]
    pub strict_shutdown: bool,
}

fn default_data_root() -> String {
    "data".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            preload: Vec::new(),
            log_filter: default_log_filter(),
            strict_shutdown: false,
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn explicit_fields_override() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "data_root": "assets", "preload": ["sky/day.cube"], "strict_shutdown": true }"#,
        )
        .unwrap();
        assert_eq!(cfg.data_root, "assets");
        assert_eq!(cfg.preload, vec!["sky/day.cube".to_string()]);
        assert!(cfg.strict_shutdown);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn from_file_reports_path() {
        let err = EngineConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(format!("{:#}", err).contains("not/here.json"));
    }
}
