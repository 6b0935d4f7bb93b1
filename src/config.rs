use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::network::protocol;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.json";

/// Cấu hình node. Thiếu file hay thiếu khoá nào thì dùng mặc định,
/// nên file config chỉ cần ghi những gì muốn đổi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cổng chat cố định; 0 = để hệ điều hành chọn cổng trống lúc khởi động.
    #[serde(default)]
    pub local_port: u16,
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Peer im lặng quá ngưỡng này coi như đã offline.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: i64,
    #[serde(default = "default_archive_ttl_ms")]
    pub archive_ttl_ms: i64,
    #[serde(default = "default_archive_purge_interval_ms")]
    pub archive_purge_interval_ms: u64,
}

fn default_discovery_port() -> u16 {
    protocol::DISCOVERY_PORT
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_sweep_interval_ms() -> u64 {
    1000
}

fn default_liveness_timeout_ms() -> i64 {
    5000
}

fn default_archive_ttl_ms() -> i64 {
    120_000
}

fn default_archive_purge_interval_ms() -> u64 {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_port: 0,
            discovery_port: default_discovery_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            archive_ttl_ms: default_archive_ttl_ms(),
            archive_purge_interval_ms: default_archive_purge_interval_ms(),
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config.discovery_port, 8888);
        assert_eq!(config.liveness_timeout_ms, 5000);
        assert_eq!(config.archive_ttl_ms, 120_000);
        assert_eq!(config.local_port, 0);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "local_port": 7000 }"#).unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.local_port, 7000);
        assert_eq!(config.discovery_port, 8888);
        assert_eq!(config.archive_purge_interval_ms, 10_000);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let path_str = path.to_str().unwrap();

        let config = AppConfig {
            local_port: 6001,
            archive_purge_interval_ms: 30_000,
            ..AppConfig::default()
        };
        save_config(path_str, &config).unwrap();

        let loaded = load_config(path_str);
        assert_eq!(loaded.local_port, 6001);
        assert_eq!(loaded.archive_purge_interval_ms, 30_000);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json at all").unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.discovery_port, 8888);
    }
}
