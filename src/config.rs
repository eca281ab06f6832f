use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::channel::ChannelConfig;
use crate::domain::AppError;

/// Client settings, optionally read from a TOML file. Missing keys take
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin for the `/api/...` requests.
    pub base_url: String,
    /// Push channel endpoint.
    pub ws_url: String,
    pub heartbeat_interval_ms: u64,
    /// Fixed delay before every reconnect attempt. There is no backoff.
    pub reconnect_delay_ms: u64,
    pub heartbeat_token: String,
    /// Where exported reports are written.
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            ws_url: "ws://localhost:3000/ws".to_string(),
            heartbeat_interval_ms: 30_000,
            reconnect_delay_ms: 5_000,
            heartbeat_token: "ping".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
        }
    }

    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.ws_url.clone(),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms.max(1)),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            heartbeat_token: self.heartbeat_token.clone(),
        }
    }
}

/// Load configuration from `path`, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<ClientConfig, AppError> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };

    let data = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
    let cfg: ClientConfig =
        toml::from_str(&data).map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClientConfig::default();
        let channel = cfg.channel();
        assert_eq!(channel.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(channel.reconnect_delay, Duration::from_secs(5));
        assert_eq!(channel.heartbeat_token, "ping");
        assert_eq!(cfg.api().base_url, "http://localhost:3000");
    }

    #[test]
    fn config_toml_partial_values() {
        let toml = r#"
            base_url = "http://backend:8000"
            reconnect_delay_ms = 250
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.base_url, "http://backend:8000");
        assert_eq!(cfg.reconnect_delay_ms, 250);
        assert_eq!(cfg.ws_url, "ws://localhost:3000/ws");
        assert_eq!(cfg.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn load_without_path_uses_defaults() {
        assert_eq!(load(None).unwrap(), ClientConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dlsync.toml");
        fs::write(&path, "ws_url = \"ws://backend:8000/ws\"\n").unwrap();

        let cfg = load(Some(path.as_path())).unwrap();
        assert_eq!(cfg.ws_url, "ws://backend:8000/ws");
    }

    #[test]
    fn load_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dlsync.toml");
        fs::write(&path, "reconnect_delay_ms = \"soon\"\n").unwrap();

        assert!(matches!(load(Some(path.as_path())), Err(AppError::Config(_))));
        assert!(matches!(
            load(Some(dir.path().join("missing.toml").as_path())),
            Err(AppError::Config(_))
        ));
    }
}
