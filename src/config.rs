//! Configuration for the gateway.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::WordOrder;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Controller connection and polling settings.
    pub controller: ControllerConfig,

    /// Register layout of the controller.
    #[serde(default)]
    pub registers: RegisterMap,

    /// Status server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Public bulletin sink.
    #[serde(default)]
    pub bulletin: BulletinConfig,

    /// Private cloud sink.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the register controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller IP address.
    pub host: String,

    /// Modbus/TCP port (default: 502).
    #[serde(default = "default_controller_port")]
    pub port: u16,

    /// Modbus unit/slave ID (default: 1).
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Connect and per-read timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Word order for 32-bit values.
    #[serde(default)]
    pub word_order: WordOrder,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_controller_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    10
}

/// A register range backing one logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSpec {
    /// Starting address.
    pub address: u16,

    /// Number of registers to read (default: 1).
    #[serde(default = "default_count")]
    pub count: u16,
}

fn default_count() -> u16 {
    1
}

/// Field name to register range mapping.
///
/// Loaded once at startup and shared read-only by the poller. Defaults match
/// the reference controller layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMap {
    #[serde(default = "default_temperature")]
    pub temperature: RegisterSpec,

    #[serde(default = "default_humidity")]
    pub humidity: RegisterSpec,

    #[serde(default = "default_pressure")]
    pub pressure: RegisterSpec,

    #[serde(default = "default_latitude")]
    pub latitude: RegisterSpec,

    #[serde(default = "default_longitude")]
    pub longitude: RegisterSpec,

    #[serde(default = "default_key_operation")]
    pub key_operation: RegisterSpec,
}

fn default_temperature() -> RegisterSpec {
    RegisterSpec { address: 1, count: 1 }
}

fn default_humidity() -> RegisterSpec {
    RegisterSpec { address: 2, count: 1 }
}

fn default_pressure() -> RegisterSpec {
    RegisterSpec { address: 3, count: 1 }
}

fn default_latitude() -> RegisterSpec {
    RegisterSpec { address: 4, count: 2 }
}

fn default_longitude() -> RegisterSpec {
    RegisterSpec { address: 6, count: 2 }
}

fn default_key_operation() -> RegisterSpec {
    RegisterSpec { address: 8, count: 8 }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            humidity: default_humidity(),
            pressure: default_pressure(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            key_operation: default_key_operation(),
        }
    }
}

/// Status server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: "0.0.0.0:9000").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Initial display message.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_listen() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_greeting() -> String {
    "Hello! Welcome!".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            greeting: default_greeting(),
        }
    }
}

/// Public bulletin sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinConfig {
    /// Whether readings are mirrored to the bulletin endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// URL scheme (default: "https").
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Bulletin server, optionally with a port ("dweet.io", "host:8080").
    #[serde(default)]
    pub host: String,

    /// Channel name the readings are published under.
    #[serde(default)]
    pub channel: String,

    /// Whether the non-numeric operator field is forwarded too.
    #[serde(default = "default_true")]
    pub include_text_fields: bool,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheme: default_scheme(),
            host: String::new(),
            channel: String::new(),
            include_text_fields: true,
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

/// Private cloud sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Whether readings are mirrored to the cloud endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// URL scheme (default: "https").
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Cloud server host.
    #[serde(default)]
    pub host: String,

    /// Cloud server port (default: 443).
    #[serde(default = "default_cloud_port")]
    pub port: u16,

    /// Ingest path, starting with "/".
    #[serde(default)]
    pub path: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheme: default_scheme(),
            host: String::new(),
            port: default_cloud_port(),
            path: String::new(),
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_cloud_port() -> u16 {
    443
}

fn default_true() -> bool {
    true
}

fn default_sink_timeout_ms() -> u64 {
    5000
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.host.is_empty() {
            return Err(ConfigError::Validation(
                "Controller host cannot be empty".to_string(),
            ));
        }

        if self.controller.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Poll interval must be at least 1 second".to_string(),
            ));
        }

        for (field, spec, count) in [
            ("temperature", &self.registers.temperature, 1),
            ("humidity", &self.registers.humidity, 1),
            ("pressure", &self.registers.pressure, 1),
            ("latitude", &self.registers.latitude, 2),
            ("longitude", &self.registers.longitude, 2),
        ] {
            if spec.count != count {
                return Err(ConfigError::Validation(format!(
                    "Field '{}' requires a register count of {}",
                    field, count
                )));
            }
        }

        if self.registers.key_operation.count == 0 {
            return Err(ConfigError::Validation(
                "Field 'key_operation' requires a register count of at least 1".to_string(),
            ));
        }

        if self.bulletin.enabled && (self.bulletin.host.is_empty() || self.bulletin.channel.is_empty())
        {
            return Err(ConfigError::Validation(
                "Enabled bulletin sink requires a host and a channel".to_string(),
            ));
        }

        if self.cloud.enabled {
            if self.cloud.host.is_empty() {
                return Err(ConfigError::Validation(
                    "Enabled cloud sink requires a host".to_string(),
                ));
            }
            if !self.cloud.path.starts_with('/') {
                return Err(ConfigError::Validation(
                    "Cloud sink path must start with '/'".to_string(),
                ));
            }
        }

        Ok(())
    }
}
