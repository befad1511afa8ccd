//! `~/.config/inkmark/config.toml`

use std::path::{Path, PathBuf};

use inkmark_core::{HighlightConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where session records, exports and the log file live
    pub data_dir: PathBuf,
    /// Log filter used when `INKMARK_LOG` is unset
    pub log_level: String,
    pub session: SessionConfig,
    pub highlight: HighlightConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "warn".to_string(),
            session: SessionConfig::default(),
            highlight: HighlightConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("inkmark"))
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.inkmark").as_ref()))
}

impl Config {
    /// Load from `config_path`; a missing file yields the defaults
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.data_dir = Self::expand_path(&config.data_dir).unwrap_or(config.data_dir);

        Ok(config)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/inkmark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("inkmark.log")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkmark_core::HighlightColor;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/inkmark/config.toml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from_path(temp_dir.path().join("nonexistent.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            r#"
data_dir = "/tmp/inkmark-data"

[session]
default_color = "green"

[highlight]
wrapper_tag = "span"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/inkmark-data"));
        assert_eq!(config.session.default_color, HighlightColor::Green);
        assert_eq!(config.session.key_prefix, "inkmark:");
        assert_eq!(config.highlight.wrapper_tag, "span");
        assert_eq!(config.highlight.container_attribute, "data-container-id");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_tilde_in_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "data_dir = \"~/inkmark-test\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap();
        let data_dir = config.data_dir.to_string_lossy();
        assert!(!data_dir.starts_with('~'));
        assert!(data_dir.ends_with("inkmark-test"));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "data_dir = [").unwrap();

        let result = Config::load_from_path(&config_file);
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_derived_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data"),
            ..Config::default()
        };
        assert_eq!(config.sessions_dir(), PathBuf::from("/data/sessions"));
        assert_eq!(config.exports_dir(), PathBuf::from("/data/exports"));
        assert_eq!(config.log_path(), PathBuf::from("/data/inkmark.log"));
    }
}
