//! Tooling Configuration
//!
//! Manages the settings used when build scripts are rewritten:
//! - Indentation of inserted statements
//! - Quote style for Groovy strings
//! - Default dialect and declaration style

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::dialect::GradleDialect;
use crate::error::Result;

/// Quote character used for newly written Groovy strings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    pub fn as_char(&self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Settings for rewriting build scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DslConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Spaces per indentation level
    pub indent_width: usize,
    /// Indent with tabs instead of spaces
    pub use_tabs: bool,
    /// Quote style for Groovy strings (Kotlin always uses double quotes)
    pub groovy_quote: QuoteStyle,
    /// Dialect assumed when it cannot be derived from a file name
    pub default_dialect: GradleDialect,
    /// Use `=` for new Groovy properties in blocks with no other properties
    pub groovy_assignment_default: bool,
    /// Log level for the command line tool
    pub log_level: String,
}

impl Default for DslConfig {
    fn default() -> Self {
        Self {
            version: 1,
            indent_width: 4,
            use_tabs: false,
            groovy_quote: QuoteStyle::Single,
            default_dialect: GradleDialect::Groovy,
            groovy_assignment_default: false,
            log_level: "info".to_string(),
        }
    }
}

impl DslConfig {
    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.indent_width)
        }
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rdroid", "R-Droid")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("gradle-dsl.toml"))
    }

    /// Load configuration from the default location, writing defaults on first use
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| crate::error::RDroidError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            Self::load_from(&config_file).await
        } else {
            info!("Config file not found, using defaults");
            let config = DslConfig::default();
            config.save_to(&config_file).await?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        debug!("Loading config from {:?}", path.as_ref());
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: DslConfig = toml::from_str(contents)?;
        if config.indent_width == 0 && !config.use_tabs {
            return Err(crate::error::RDroidError::Config(
                "indent_width must be at least 1 when use_tabs is false".into(),
            ));
        }
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DslConfig::default();
        assert_eq!(config.indent_unit(), "    ");
        assert_eq!(config.groovy_quote, QuoteStyle::Single);
        assert_eq!(config.default_dialect, GradleDialect::Groovy);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DslConfig::from_toml("indent_width = 2\ngroovy_quote = \"double\"\n").unwrap();
        assert_eq!(config.indent_unit(), "  ");
        assert_eq!(config.groovy_quote.as_char(), '"');
        assert!(!config.use_tabs);
    }

    #[test]
    fn test_zero_indent_rejected() {
        assert!(DslConfig::from_toml("indent_width = 0").is_err());
        let tabs = DslConfig::from_toml("indent_width = 0\nuse_tabs = true").unwrap();
        assert_eq!(tabs.indent_unit(), "\t");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gradle-dsl.toml");

        let mut config = DslConfig::default();
        config.default_dialect = GradleDialect::Kotlin;
        config.save_to(&path).await.unwrap();

        let loaded = DslConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.default_dialect, GradleDialect::Kotlin);
    }
}
