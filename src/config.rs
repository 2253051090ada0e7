use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration, from an optional TOML file with CLI overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub server_url: String,

    /// Seconds between poll ticks while tailing
    pub poll_interval_secs: u64,

    /// Maximum records held in the window
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            poll_interval_secs: 2,
            buffer_capacity: 100,
        }
    }
}

/// Load the config file if present and apply CLI overrides
///
/// A missing file is not an error; built-in defaults apply.
pub fn load(
    path: &Path,
    server: Option<&str>,
    interval: Option<u64>,
    capacity: Option<usize>,
) -> Result<Config> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")?
    } else {
        Config::default()
    };

    if let Some(server) = server {
        config.server_url = server.to_string();
    }
    if let Some(interval) = interval {
        config.poll_interval_secs = interval;
    }
    if let Some(capacity) = capacity {
        config.buffer_capacity = capacity;
    }

    Ok(config)
}
