//! Server configuration
//!
//! Loaded from an optional TOML file; command-line flags override it.
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//! log_filter = "sheetflow=debug,info"
//! json_logs = true
//!
//! [engine]
//! freeze_locked_value_sets = true
//!
//! [[sheets]]
//! id = 1
//! account = 1
//! status = "Draft"
//! ```

use serde::{Deserialize, Serialize};
use sheetflow_core::config::load_toml;
use sheetflow_core::{
    AccountId, ConfigError, EngineConfig, InMemoryDirectory, SheetId, SheetLayout, SheetStatus,
};
use std::net::SocketAddr;
use std::path::Path;

/// Sheet registered in the in-memory directory at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSeed {
    pub id: SheetId,
    pub account: AccountId,
    #[serde(default = "draft")]
    pub status: SheetStatus,
    #[serde(default)]
    pub layout: Option<SheetLayout>,
}

fn draft() -> SheetStatus {
    SheetStatus::Draft
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// `EnvFilter` directive string
    pub log_filter: String,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Engine settings
    pub engine: EngineConfig,
    /// Sheets known to the standalone directory
    pub sheets: Vec<SheetSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_filter: "info".to_string(),
            json_logs: false,
            engine: EngineConfig::default(),
            sheets: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or defaults when no path is given
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => load_toml(path),
            None => Ok(Self::default()),
        }
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With JSON logging toggled
    #[inline]
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Directory holding the configured sheets
    #[must_use]
    pub fn directory(&self) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        for seed in &self.sheets {
            directory.register_sheet(seed.id, seed.account, seed.status);
            if let Some(layout) = &seed.layout {
                directory.set_layout(seed.id, layout.clone());
            }
        }
        directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
        assert!(config.engine.audit_enabled);
    }

    #[test]
    fn file_values_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "0.0.0.0:9000"
json_logs = true

[engine]
freeze_locked_value_sets = true

[[sheets]]
id = 7
account = 3
status = "Verified"

[[sheets.layout.subsheets]]
id = 1
name = "Process"
fields = [{{ infoTemplateId = 101, label = "Flow", dataType = "Number" }}]
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path()))
            .unwrap()
            .with_log_filter("debug");
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.log_filter, "debug");
        assert!(config.json_logs);
        assert!(config.engine.freeze_locked_value_sets);
        assert_eq!(config.sheets.len(), 1);
        assert_eq!(config.sheets[0].status, SheetStatus::Verified);

        let layout = config.sheets[0].layout.as_ref().unwrap();
        assert_eq!(layout.subsheets[0].fields.len(), 1);
    }

    #[test]
    fn seed_status_defaults_to_draft() {
        let config: ServerConfig = toml::from_str(
            r#"
[[sheets]]
id = 1
account = 1
"#,
        )
        .unwrap();
        assert_eq!(config.sheets[0].status, SheetStatus::Draft);
        assert!(config.sheets[0].layout.is_none());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/sheetflow.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
