//! Engine configuration

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Refuse field writes to value sets that have left Draft
    pub freeze_locked_value_sets: bool,
    /// Record mutations in the audit trail
    pub audit_enabled: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With value-set freeze enforcement
    #[inline]
    #[must_use]
    pub fn with_freeze_locked_value_sets(mut self, freeze: bool) -> Self {
        self.freeze_locked_value_sets = freeze;
        self
    }

    /// With audit trail toggled
    #[inline]
    #[must_use]
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freeze_locked_value_sets: false,
            audit_enabled: true,
        }
    }
}

/// Read a TOML file into any config shape
///
/// # Errors
/// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse` if it is
/// not valid for `T`.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert!(!config.freeze_locked_value_sets);
        assert!(config.audit_enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str("freeze_locked_value_sets = true").unwrap();
        assert!(config.freeze_locked_value_sets);
        assert!(config.audit_enabled);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audit_enabled = false").unwrap();

        let config: EngineConfig = load_toml(file.path()).unwrap();
        assert!(!config.audit_enabled);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result: Result<EngineConfig, _> = load_toml("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audit_enabled = \"sometimes\"").unwrap();

        let result: Result<EngineConfig, _> = load_toml(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
