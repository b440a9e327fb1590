//! Configuration module
//!
//! Handles loading and validating client configuration from TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the Pulse client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where this client itself is reachable (used to derive fallback
    /// endpoint addresses)
    #[serde(default)]
    pub context: ContextConfig,

    /// Realtime channel settings
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Credential lookup settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Client context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Whether the client is served over a secure channel (https/wss)
    #[serde(default)]
    pub secure: bool,

    /// Hostname the client runs under
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Port the client runs under, if any
    #[serde(default)]
    pub port: Option<u16>,
}

/// Realtime channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Explicit configuration endpoint URL. When unset, the endpoint is
    /// derived from the client context (`<http base>/api/config`).
    #[serde(default)]
    pub config_url: Option<String>,

    /// Path of the realtime endpoint on the resolved base address
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Delay before a reconnection attempt, in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Capacity of the outbound message queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

/// Credential lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Key under which the authentication token is stored
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Directory holding credential files, one file per key. When unset,
    /// credentials are read from the process environment.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_reconnect_delay() -> u64 {
    3000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_token_key() -> String {
    "auth-token".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            secure: false,
            hostname: default_hostname(),
            port: None,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            config_url: None,
            ws_path: default_ws_path(),
            reconnect_delay_ms: default_reconnect_delay(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_key: default_token_key(),
            dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}
