use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::ServiceError;

/// Default port when neither the config file nor `PORT` set one
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Caption retrieval settings
    pub captions: CaptionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Origin of the video platform, e.g. `https://www.youtube.com`
    pub base_url: String,

    /// Track language picked when several are offered
    pub preferred_language: String,

    /// User agent sent with every upstream request
    pub user_agent: String,

    /// Optional upper bound for a single upstream request
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            preferred_language: "en".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, `./config.yaml`, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match Self::config_path(path)? {
            Some(config_path) => {
                tracing::debug!("Loading configuration from {}", config_path.display());
                Self::from_file(&config_path)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Apply command line / environment overrides on top of the file values
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Result<Self> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }

        self.validate()?;
        Ok(self)
    }

    /// Resolve which file to read, if any
    fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        // Current directory for easy local runs
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        Ok(None)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ServiceError::InvalidConfig("server.host must not be empty".into()).into());
        }

        let base = Url::parse(&self.captions.base_url).map_err(|_| {
            ServiceError::InvalidConfig(format!(
                "captions.base_url is not a valid URL: {}",
                self.captions.base_url
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ServiceError::InvalidConfig(
                "captions.base_url must use HTTP or HTTPS protocol".into(),
            )
            .into());
        }

        if self.captions.preferred_language.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "captions.preferred_language must not be empty".into(),
            )
            .into());
        }

        if self.captions.request_timeout_secs == Some(0) {
            return Err(ServiceError::InvalidConfig(
                "captions.request_timeout_secs must be greater than zero".into(),
            )
            .into());
        }

        Ok(())
    }

    /// Address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}", self.bind_addr());
        println!("  Caption Origin: {}", self.captions.base_url);
        println!("  Preferred Language: {}", self.captions.preferred_language);
        if let Some(timeout) = self.captions.request_timeout_secs {
            println!("  Request Timeout: {}s", timeout);
        }
    }
}
