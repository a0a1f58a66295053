//! Bridge configuration
//!
//! Settings that apply to the whole bridge rather than to one port. Read
//! once, the first time the C boundary is used, from an optional JSON file
//! named by `COMLINK_CONFIG` plus a few environment overrides:
//!
//!   COMLINK_CONFIG=/etc/comlink.json COMLINK_TIMEOUT_MS=500 COMLINK_MOCK=1

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{BridgeError, BridgeResult};

pub const CONFIG_PATH_ENV: &str = "COMLINK_CONFIG";
pub const TIMEOUT_ENV: &str = "COMLINK_TIMEOUT_MS";
pub const MOCK_ENV: &str = "COMLINK_MOCK";
pub const LOG_ENV: &str = "COMLINK_LOG";

fn default_list_delimiter() -> char {
    ','
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_mock_ports() -> Vec<String> {
    (0..4).map(|i| format!("MOCK{i}")).collect()
}

/// Bridge-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Read/write timeout applied to newly opened ports. `None` blocks
    /// until the driver returns.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Separator between names written by `comlink_list_ports`
    #[serde(default = "default_list_delimiter")]
    pub list_delimiter: char,
    /// Fallback log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Serve in-memory loopback ports instead of real hardware
    #[serde(default)]
    pub mock: bool,
    /// Port names offered when `mock` is set
    #[serde(default = "default_mock_ports")]
    pub mock_ports: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            list_delimiter: default_list_delimiter(),
            log_level: default_log_level(),
            mock: false,
            mock_ports: default_mock_ports(),
        }
    }
}

impl BridgeConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Settings(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            BridgeError::Settings(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> BridgeResult<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `COMLINK_*` overrides. `lookup` abstracts the environment so
    /// tests don't have to mutate process state.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> BridgeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let ms: i64 = raw.trim().parse().map_err(|_| {
                BridgeError::Settings(format!("{TIMEOUT_ENV} must be an integer, got '{raw}'"))
            })?;
            // Negative means "block", same as the C entry point
            self.timeout_ms = u64::try_from(ms).ok();
        }
        if let Some(raw) = lookup(MOCK_ENV) {
            self.mock = matches!(raw.trim(), "1" | "true" | "yes");
        }
        if let Some(level) = lookup(LOG_ENV) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
