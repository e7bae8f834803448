//! Server configuration from TOML, environment, and command line.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Config file read when no path is given, if present.
pub const DEFAULT_CONFIG_PATH: &str = "strictly_digits.toml";
/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "STRICTLY_DIGITS_DB_PATH";
/// Environment variable overriding the listen host.
pub const ENV_HOST: &str = "STRICTLY_DIGITS_HOST";
/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "STRICTLY_DIGITS_PORT";
/// Environment variable overriding the default log filter.
pub const ENV_LOG: &str = "STRICTLY_DIGITS_LOG";

/// Runtime configuration for the server and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// SQLite database file.
    db_path: String,

    /// Address the HTTP server binds to.
    host: String,

    /// Port the HTTP server binds to.
    port: u16,

    /// Tracing filter used when `RUST_LOG` is unset.
    log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "strictly_digits.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_filter: "info,strictly_digits=debug,strictly_digits_server=debug".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(db_path = %config.db_path, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path`, or [`DEFAULT_CONFIG_PATH`] if it exists when no path is
    /// given, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit path does not exist, a file is
    /// invalid, or an environment override cannot be parsed.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::new(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the port override is not a valid port.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            debug!(%db_path, "Database path overridden from environment");
            self.db_path = db_path;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid {} '{}': {}", ENV_PORT, port, e)))?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(self)
    }

    /// Replaces the database path.
    pub fn set_db_path(&mut self, db_path: String) {
        self.db_path = db_path;
    }

    /// Replaces the listen host.
    pub fn set_host(&mut self, host: String) {
        self.host = host;
    }

    /// Replaces the listen port.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "port = 8080").expect("write");

        let config = ServerConfig::from_file(file.path()).expect("load");
        assert_eq!(*config.port(), 8080);
        assert_eq!(config.db_path(), "strictly_digits.db");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "port = \"not a number\"").expect("write");
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_DB_PATH, "/tmp/game.db"), (ENV_PORT, "9000")]
            .into_iter()
            .collect();
        let config = ServerConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.db_path(), "/tmp/game.db");
        assert_eq!(*config.port(), 9000);
        assert_eq!(config.host(), "127.0.0.1");
    }

    #[test]
    fn test_bad_port_override() {
        let result = ServerConfig::default()
            .with_env_overrides(|key| (key == ENV_PORT).then(|| "99999".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/strictly_digits.toml")))
            .expect_err("missing file");
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "host = \"0.0.0.0\"").expect("write");

        let config = ServerConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.host(), "0.0.0.0");
    }
}
