//! Console configuration.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then environment variables prefixed with
//! `BIOMONITOR` and using `__` between path segments.
//!
//! ```toml
//! channels = [
//!     { id = 0, physical_channel = 0, description = "ECG" },
//!     { id = 1, physical_channel = 1, description = "Pulse" },
//! ]
//!
//! [server]
//! endpoint = "http://localhost:1492"
//! timeout = "10s"
//!
//! [polling]
//! status_interval = "2s"
//! stream_interval = "1s"
//! window_span = 1.0
//! ```
//!
//! `BIOMONITOR__SERVER__ENDPOINT=http://10.0.0.5:1492` overrides the endpoint.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use biomonitor_types::ChannelConfig;

use crate::data::duration::parse_duration;
use crate::source::DEFAULT_ENDPOINT;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub server: ServerConfig,
    /// Channel catalog the aggregator accepts chunks for.
    pub channels: Vec<ChannelConfig>,
    pub polling: PollingConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            channels: ChannelConfig::default_catalog(),
            polling: PollingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub endpoint: String,
    /// Per-request timeout, e.g. "10s".
    pub timeout: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: "10s".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.timeout).context("invalid server.timeout")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub status_interval: String,
    pub stream_interval: String,
    /// Seconds of data requested per stream window.
    pub window_span: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval: "2s".to_string(),
            stream_interval: "1s".to_string(),
            window_span: 1.0,
        }
    }
}

impl PollingConfig {
    pub fn status_interval(&self) -> Result<Duration> {
        parse_duration(&self.status_interval).context("invalid polling.status_interval")
    }

    pub fn stream_interval(&self) -> Result<Duration> {
        parse_duration(&self.stream_interval).context("invalid polling.stream_interval")
    }
}

impl ConsoleConfig {
    /// Load the configuration, reading `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(env)
            .build()
            .context("failed to read configuration")?;

        let config: ConsoleConfig = config
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.server.timeout()?;
        for (key, interval) in [
            ("status_interval", self.polling.status_interval()?),
            ("stream_interval", self.polling.stream_interval()?),
        ] {
            if interval.is_zero() {
                anyhow::bail!("polling.{} must be greater than zero", key);
            }
        }
        if !(self.polling.window_span.is_finite() && self.polling.window_span > 0.0) {
            anyhow::bail!(
                "polling.window_span must be a positive number of seconds, got {}",
                self.polling.window_span
            );
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("BIOMONITOR").separator("__")
}
