// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "sitetack.json";
pub const URL_ENV: &str = "SITETACK_URL";

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub threshold: f64,
    pub out_dir: PathBuf,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            threshold: 0.5,
            out_dir: PathBuf::from("."),
            timeout_secs: 60,
            user_agent: format!("sitetack_client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Defaults, then `sitetack.json` under the project root, then the environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file_or_default(&project_root().join(CONFIG_FILE_NAME))?;
        if let Ok(url) = env::var(URL_ENV) {
            config.base_url = url;
        }
        Ok(config)
    }

    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
