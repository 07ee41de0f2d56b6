use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, UtilifiError};

pub const APP_NAME: &str = "Utilifi";
pub const SUPPORT_URL: &str = "https://dev.itrypro.ru/utilifi";

/// Runtime settings. Every field has a default so a config file only needs
/// the keys it wants to override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub refresh_interval_ms: u64,
    pub ip_interval_ms: u64,
    pub ping_timeout_secs: u64,
    pub terminate_grace_secs: u64,
    pub default_ping_host: String,
    pub home_url: String,
    pub ip_probe: String,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 3000,
            ip_interval_ms: 5000,
            ping_timeout_secs: 5,
            terminate_grace_secs: 3,
            default_ping_host: "8.8.8.8".to_string(),
            home_url: "https://www.google.com".to_string(),
            ip_probe: "8.8.8.8:80".to_string(),
            window_width: 1200.0,
            window_height: 700.0,
        }
    }
}

impl Config {
    /// Defaults when `path` is `None`, otherwise the parsed toml file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| UtilifiError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| UtilifiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 || self.ip_interval_ms == 0 {
            return Err(UtilifiError::Config("intervals must be non-zero".to_string()));
        }
        if self.ping_timeout_secs == 0 {
            return Err(UtilifiError::Config("ping_timeout_secs must be non-zero".to_string()));
        }
        self.ip_probe_addr()?;
        Ok(())
    }

    pub fn ip_probe_addr(&self) -> Result<SocketAddr> {
        self.ip_probe
            .parse()
            .map_err(|_| UtilifiError::Config(format!("ip_probe '{}' is not a socket address", self.ip_probe)))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn ip_interval(&self) -> Duration {
        Duration::from_millis(self.ip_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_secs(self.terminate_grace_secs)
    }
}
