//! Configuration for the Stratum Server
//!
//! Settings are layered: built-in defaults, then the section of the YAML
//! config file named after the environment, then environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Config file read when `STRATUM_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "/etc/stratum/stratum.yml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// State store connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `memory://...` for the in-memory store, `http(s)://host:port` for etcd
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Basic auth user
    #[serde(default)]
    pub user_name: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Deadline of every store call
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            user_name: None,
            password: None,
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Deployment environment, selects the config file section
    #[serde(default = "default_environment")]
    pub environment: String,

    /// State store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Deadline of monitoring API calls
    #[serde(default = "default_monitoring_timeout_ms")]
    pub monitoring_timeout_ms: u64,
}

fn default_port() -> u16 {
    9292
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_store_url() -> String {
    "http://127.0.0.1:2379".to_string()
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_monitoring_timeout_ms() -> u64 {
    2000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            environment: default_environment(),
            store: StoreConfig::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            monitoring_timeout_ms: default_monitoring_timeout_ms(),
        }
    }
}

/// Partial settings read from one section of the config file
#[derive(Debug, Default, Deserialize)]
struct FileSection {
    port: Option<u16>,
    bind_address: Option<String>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    monitoring_timeout_ms: Option<u64>,
    store: Option<FileStoreSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FileStoreSection {
    url: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
    timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from the config file and environment variables
    pub fn load() -> ServerResult<Self> {
        let mut config = Self::default();
        if let Ok(environment) = env::var("STRATUM_ENV") {
            config.environment = environment;
        }

        let (path, explicit) = match env::var("STRATUM_CONFIG") {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if explicit || path.exists() {
            config.apply_file(&path)?;
        }

        config.apply_env(|name| env::var(name).ok());
        config.validate()?;

        info!(environment = %config.environment, store_url = %config.store.url, "Loaded server configuration");
        Ok(config)
    }

    /// Apply the section of the YAML file at `path` named after the environment
    pub fn apply_file(&mut self, path: &Path) -> ServerResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServerError::ConfigurationError(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        self.apply_yaml(&contents)
    }

    /// Apply the section of a YAML document named after the environment.
    ///
    /// The document maps environment names to settings, for example
    /// `production: {store: {url: "http://etcd:2379"}}`.
    pub fn apply_yaml(&mut self, contents: &str) -> ServerResult<()> {
        let document: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let Some(section) = document.get(self.environment.as_str()) else {
            warn!(environment = %self.environment, "Config file has no section for environment");
            return Ok(());
        };
        let section: FileSection = serde_yaml::from_value(section.clone())?;

        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(bind_address) = section.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(log_level) = section.log_level {
            self.log_level = log_level;
        }
        if let Some(log_format) = section.log_format {
            self.log_format = log_format;
        }
        if let Some(timeout) = section.monitoring_timeout_ms {
            self.monitoring_timeout_ms = timeout;
        }
        if let Some(store) = section.store {
            if let Some(url) = store.url {
                self.store.url = url;
            }
            if store.user_name.is_some() {
                self.store.user_name = store.user_name;
            }
            if store.password.is_some() {
                self.store.password = store.password;
            }
            if let Some(timeout) = store.timeout_ms {
                self.store.timeout_ms = timeout;
            }
        }
        Ok(())
    }

    /// Override settings from environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SERVER_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Invalid SERVER_PORT value: {}", port),
            }
        }

        if let Some(host) = lookup("SERVER_HOST") {
            self.bind_address = host;
        }

        if let Some(url) = lookup("STORE_URL") {
            self.store.url = url;
        }

        if let Some(user_name) = lookup("STORE_USER_NAME") {
            self.store.user_name = Some(user_name);
        }

        if let Some(password) = lookup("STORE_PASSWORD") {
            self.store.password = Some(password);
        }

        if let Some(timeout) = lookup("STORE_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(timeout) => self.store.timeout_ms = timeout,
                Err(_) => warn!("Invalid STORE_TIMEOUT_MS value: {}", timeout),
            }
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => self.log_format = LogFormat::Json,
                "text" => self.log_format = LogFormat::Text,
                _ => warn!("Invalid LOG_FORMAT value: {}", format),
            }
        }
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> ServerResult<()> {
        let url = &self.store.url;
        if !(url.starts_with("memory://") || url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ServerError::ConfigurationError(format!(
                "Unsupported store URL: {}",
                url
            )));
        }
        if self.store.timeout_ms == 0 {
            return Err(ServerError::ConfigurationError(
                "Store timeout must be positive".to_string(),
            ));
        }
        if self.store.password.is_some() && self.store.user_name.is_none() {
            warn!("Store password given without a user name, basic auth disabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.store.timeout_ms, 5000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_section_for_environment() {
        let yaml = r#"
development:
  store:
    url: memory://dev
production:
  port: 8443
  store:
    url: https://etcd.internal:2379
    user_name: stratum
    password: secret
  log_format: json
"#;
        let mut config = ServerConfig {
            environment: "production".to_string(),
            ..Default::default()
        };
        config.apply_yaml(yaml).unwrap();

        assert_eq!(config.port, 8443);
        assert_eq!(config.store.url, "https://etcd.internal:2379");
        assert_eq!(config.store.user_name.as_deref(), Some("stratum"));
        assert_eq!(config.store.timeout_ms, 5000);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_section_keeps_defaults() {
        let mut config = ServerConfig::default();
        config.apply_yaml("production:\n  port: 1\n").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_PORT", "8081"),
            ("STORE_URL", "memory://test"),
            ("STORE_TIMEOUT_MS", "not-a-number"),
            ("LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.port, 8081);
        assert_eq!(config.store.url, "memory://test");
        assert_eq!(config.store.timeout_ms, 5000);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.store.url = "redis://localhost".to_string();
        assert!(matches!(config.validate(), Err(ServerError::ConfigurationError(_))));

        config.store.url = "memory://".to_string();
        config.store.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
