use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Settings for the table store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Filler written when a cell past the end of a column is set
    pub default_value: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { default_value: 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Mirror copies to the system clipboard as plain text
    pub system: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { system: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Fixed number of decimals for text output; unset means shortest exact form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
}

/// Complete configuration, every section optional in the file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub clipboard: ClipboardConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TableError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TableError::Config(format!("failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TableError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.clipboard.system);
        assert_eq!(config.table.default_value, 0.0);
        assert_eq!(config.export.precision, None);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_str("[table]\ndefault_value = -1.5\n\n[export]\nprecision = 3\n").unwrap();
        assert_eq!(config.table.default_value, -1.5);
        assert_eq!(config.export.precision, Some(3));
        assert!(config.clipboard.system);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            Config::from_str("[table]\ndefault_value = \"zero\""),
            Err(TableError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[clipboard]").unwrap();
        writeln!(file, "system = false").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(!config.clipboard.system);

        let back = Config::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
