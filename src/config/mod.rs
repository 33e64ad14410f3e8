//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for `bayeux serve`)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BayeuxError, Result};
use crate::protocol::{BAYEUX_VERSION, MINIMUM_BAYEUX_VERSION};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP endpoint configuration
    #[serde(default)]
    pub server: HttpConfig,

    /// Protocol engine configuration
    #[serde(default)]
    pub bayeux: BayeuxConfig,

    /// Registered protocol variants
    #[serde(default = "default_protocols")]
    pub protocols: Vec<ProtocolConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpConfig::default(),
            bayeux: BayeuxConfig::default(),
            protocols: default_protocols(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BayeuxError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| BayeuxError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `BAYEUX_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("BAYEUX_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BAYEUX_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        // Long-poll overrides apply to every long-polling protocol
        if let Ok(val) = std::env::var("BAYEUX_LONG_POLL_TIMEOUT_MS") {
            if let Ok(val) = val.parse() {
                for protocol in self.protocols.iter_mut().filter(|p| p.long_polling) {
                    protocol.long_poll_timeout_ms = val;
                }
            }
        }
        if let Ok(val) = std::env::var("BAYEUX_LONG_POLL_INTERVAL_MS") {
            if let Ok(val) = val.parse() {
                for protocol in self.protocols.iter_mut().filter(|p| p.long_polling) {
                    protocol.long_poll_interval_ms = val;
                }
            }
        }
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else defaults. Environment overrides apply last.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path.or_else(|| Self::default_path().filter(|p| p.exists())) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.protocols.is_empty() {
            return Err(BayeuxError::Config(
                "At least one protocol must be configured".to_string(),
            ));
        }
        if !self.protocols.iter().any(|p| p.long_polling) {
            return Err(BayeuxError::Config(
                "The HTTP endpoint requires a long-polling protocol".to_string(),
            ));
        }
        if let Some(protocol) = self.protocols.iter().find(|p| p.transport_names.is_empty()) {
            return Err(BayeuxError::Config(format!(
                "Protocol '{}' advertises no transports",
                protocol.name
            )));
        }
        let max_idle = i64::try_from(self.bayeux.session_idle_timeout_ms).unwrap_or(i64::MAX);
        if let Some(protocol) = self
            .protocols
            .iter()
            .find(|p| p.long_polling && p.long_poll_timeout_ms >= max_idle)
        {
            return Err(BayeuxError::Config(format!(
                "Protocol '{}' long_poll_timeout_ms ({}) must be below session_idle_timeout_ms ({})",
                protocol.name, protocol.long_poll_timeout_ms, self.bayeux.session_idle_timeout_ms
            )));
        }
        if self.bayeux.max_queue_size == 0 {
            return Err(BayeuxError::Config(
                "max_queue_size must be greater than 0".to_string(),
            ));
        }
        if !self.server.path.starts_with('/') {
            return Err(BayeuxError::Config(format!(
                "Endpoint path must start with '/': {}",
                self.server.path
            )));
        }
        Ok(())
    }

    /// Default config file location (`<config dir>/bayeux/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bayeux").join("config.toml"))
    }
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path of the Bayeux endpoint
    pub path: String,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable permissive CORS
    pub cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/cometd".to_string(),
            max_body_size: 1024 * 1024, // 1 MB
            cors: true,
        }
    }
}

impl HttpConfig {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Protocol engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BayeuxConfig {
    /// Advertised protocol version
    pub version: String,

    /// Minimum accepted protocol version
    pub minimum_version: String,

    /// Packets queued per session before the oldest is dropped
    pub max_queue_size: usize,

    /// Sessions idle longer than this are reaped
    pub session_idle_timeout_ms: u64,

    /// How often the reaper runs
    pub reap_interval_ms: u64,
}

impl Default for BayeuxConfig {
    fn default() -> Self {
        Self {
            version: BAYEUX_VERSION.to_string(),
            minimum_version: MINIMUM_BAYEUX_VERSION.to_string(),
            max_queue_size: 1000,
            session_idle_timeout_ms: 60_000,
            reap_interval_ms: 10_000,
        }
    }
}

/// One protocol variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol name
    pub name: String,

    /// Accepted connection types
    pub transport_names: Vec<String>,

    /// Whether connects are held open
    #[serde(default)]
    pub long_polling: bool,

    /// Default long-poll timeout
    #[serde(default)]
    pub long_poll_timeout_ms: i64,

    /// Default long-poll interval
    #[serde(default)]
    pub long_poll_interval_ms: i64,
}

impl ProtocolConfig {
    /// Long-polling protocol with the given timeout and interval
    pub fn long_polling(name: &str, transports: &[&str], timeout_ms: i64, interval_ms: i64) -> Self {
        Self {
            name: name.to_string(),
            transport_names: transports.iter().map(|t| (*t).to_string()).collect(),
            long_polling: true,
            long_poll_timeout_ms: timeout_ms,
            long_poll_interval_ms: interval_ms,
        }
    }

    /// Streaming (non long-polling) protocol
    pub fn streaming(name: &str, transports: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            transport_names: transports.iter().map(|t| (*t).to_string()).collect(),
            long_polling: false,
            long_poll_timeout_ms: 0,
            long_poll_interval_ms: 0,
        }
    }
}

fn default_protocols() -> Vec<ProtocolConfig> {
    vec![
        ProtocolConfig::long_polling("long-polling", &["long-polling"], 30_000, 0),
        ProtocolConfig::streaming("websocket", &["websocket"]),
    ]
}
