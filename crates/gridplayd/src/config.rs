//! Daemon settings from `config.json`, with environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DaemonError;

pub const ADDR_ENV: &str = "GRIDPLAY_ADDR";

const MIN_REPLAY_INTERVAL_MS: u64 = 50;
const MAX_REPLAY_INTERVAL_MS: u64 = 10_000;

fn default_listen_addr() -> String {
    "127.0.0.1:9877".to_string()
}

fn default_replay_interval_ms() -> u64 {
    600
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Delay between automatic replay advances.
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            replay_interval_ms: default_replay_interval_ms(),
        }
    }
}

impl DaemonConfig {
    /// Reads `path` if it exists, then applies `GRIDPLAY_ADDR`.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {:?}; using defaults", path);
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                cfg.listen_addr = addr.trim().to_string();
            }
        }
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self, DaemonError> {
        let mut cfg: Self = serde_json::from_str(text)?;
        let clamped = cfg
            .replay_interval_ms
            .clamp(MIN_REPLAY_INTERVAL_MS, MAX_REPLAY_INTERVAL_MS);
        if clamped != cfg.replay_interval_ms {
            warn!(
                "replay_interval_ms {} out of range; using {}",
                cfg.replay_interval_ms, clamped
            );
            cfg.replay_interval_ms = clamped;
        }
        Ok(cfg)
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = DaemonConfig::from_json("{}").unwrap();
        assert_eq!(cfg, DaemonConfig::default());
        assert_eq!(cfg.replay_interval(), Duration::from_millis(600));
    }

    #[test]
    fn interval_is_clamped() {
        let fast = DaemonConfig::from_json(r#"{"replay_interval_ms": 1}"#).unwrap();
        assert_eq!(fast.replay_interval_ms, 50);
        let slow = DaemonConfig::from_json(r#"{"replay_interval_ms": 999999}"#).unwrap();
        assert_eq!(slow.replay_interval_ms, 10_000);
    }

    #[test]
    fn absent_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = DaemonConfig::load(&tmp.path().join("config.json")).unwrap();
        assert_eq!(cfg.replay_interval_ms, 600);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(DaemonConfig::load(&path), Err(DaemonError::Json(_))));
    }
}
