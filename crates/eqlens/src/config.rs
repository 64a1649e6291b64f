//! Configuration file support for eqlens.
//!
//! Loads configuration from `eqlens.toml` in the working directory, or from
//! an explicit `--config` path. Command-line flags (and the `EQLENS_*`
//! environment variables clap maps onto them) override file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use eqlens_core::MIN_WORDS_PER_RESPONSE;
use eqlens_db::Database;
use eqlens_logging::LogFormat;
use eqlens_model::{ModelBackend, ModelSettings};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "eqlens.toml";

/// Application configuration loaded from `eqlens.toml`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub model: ModelSettings,
    pub assessment: AssessmentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessmentConfig {
    pub min_words: usize,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            min_words: MIN_WORDS_PER_RESPONSE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "eqlens=debug"
    pub level: String,
    pub format: LogFormat,
    /// Daily-rolling diagnostic log
    pub file: Option<PathBuf>,
    /// JSON-lines file of assessment events
    pub events_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
            events_file: None,
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db: Option<PathBuf>,
    pub backend: Option<ModelBackend>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl AppConfig {
    /// Load configuration from a file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Resolve the configuration for this run.
    ///
    /// An explicit path must exist; otherwise `eqlens.toml` in `working_dir`
    /// is used when present, and defaults when not.
    pub fn resolve(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path)?
                .with_context(|| format!("Config file not found: {}", path.display())),
            None => Ok(Self::load(&working_dir.join(CONFIG_FILE_NAME))?.unwrap_or_default()),
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(db) = overrides.db {
            self.database.path = Some(db);
        }
        if let Some(backend) = overrides.backend {
            self.model.backend = backend;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Effective database file.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Database::default_path)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = AppConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(loaded.is_none());

        let resolved = AppConfig::resolve(None, dir.path()).unwrap();
        assert_eq!(resolved.server.port, 8000);
        assert_eq!(resolved.assessment.min_words, 10);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::resolve(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_parse_all_sections() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            cors_permissive = true

            [database]
            path = "/tmp/eq.db"

            [model]
            backend = "lexicon"
            inference_timeout = "45s"

            [assessment]
            min_words = 15

            [logging]
            level = "debug"
            format = "json"
            "#,
        );

        let config = AppConfig::resolve(None, dir.path()).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        assert!(config.server.cors_permissive);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/eq.db"));
        assert_eq!(config.model.backend, ModelBackend::Lexicon);
        assert_eq!(config.model.inference_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.assessment.min_words, 15);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_field_is_hard_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[server]\nhostname = \"x\"\n");
        assert!(AppConfig::resolve(None, dir.path()).is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[server]\nport = 9000\n\n[model]\nbackend = \"candle\"\n");

        let mut config = AppConfig::resolve(None, dir.path()).unwrap();
        config.apply(Overrides {
            port: Some(7000),
            backend: Some(ModelBackend::Lexicon),
            db: Some(PathBuf::from("cli.db")),
            ..Default::default()
        });

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.backend, ModelBackend::Lexicon);
        assert_eq!(config.database_path(), PathBuf::from("cli.db"));
    }
}
