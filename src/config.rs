use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::EngineConfig;

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "dockdash.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub docker: DockerConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Unix socket path. When unset, `DOCKER_HOST` / the platform default is used.
    pub socket: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Minimum spacing between chart redraws triggered by new stats.
    pub publish_interval_ms: u64,
    /// Periodic full redraw (info bar totals, clock-driven refresh).
    pub redraw_interval_ms: u64,
    pub channel_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 500,
            redraw_interval_ms: 1000,
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("dockdash.log"),
        }
    }
}

impl AppConfig {
    /// Loads from `path`, else `CONFIG_FILE`, else `dockdash.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os("CONFIG_FILE").map(PathBuf::from).or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }),
        };
        match path {
            Some(path) => {
                let s = std::fs::read_to_string(&path)
                    .with_context(|| format!("read config {}", path.display()))?;
                Self::load_from_str(&s)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.docker.timeout_secs > 0,
            "docker.timeout_secs must be > 0, got {}",
            self.docker.timeout_secs
        );
        anyhow::ensure!(
            self.docker.socket.as_deref() != Some(""),
            "docker.socket must be non-empty when set"
        );
        anyhow::ensure!(
            self.dashboard.publish_interval_ms > 0,
            "dashboard.publish_interval_ms must be > 0, got {}",
            self.dashboard.publish_interval_ms
        );
        anyhow::ensure!(
            self.dashboard.redraw_interval_ms > 0,
            "dashboard.redraw_interval_ms must be > 0, got {}",
            self.dashboard.redraw_interval_ms
        );
        anyhow::ensure!(
            self.dashboard.channel_capacity > 0,
            "dashboard.channel_capacity must be > 0, got {}",
            self.dashboard.channel_capacity
        );
        anyhow::ensure!(
            !self.logging.file.as_os_str().is_empty(),
            "logging.file must be non-empty"
        );
        Ok(())
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            publish_interval: Duration::from_millis(self.dashboard.publish_interval_ms),
            channel_capacity: self.dashboard.channel_capacity,
        }
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.redraw_interval_ms)
    }
}
