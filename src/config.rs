use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::schedule::{Schedule, TimeOfDay};

/// Bumped whenever the on-disk layout changes.
const CONFIG_VERSION: u32 = 1;

/// Dashboard connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard server host
    pub host: String,
    /// Dashboard server port
    pub port: u16,
    /// Auth token identifying this controller to the dashboard
    pub token: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8442,
            token: String::new(),
        }
    }
}

/// Application configuration stored in ~/.config/roost/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub dashboard: DashboardConfig,
    pub schedule: Schedule,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            dashboard: DashboardConfig::default(),
            schedule: Schedule::default(),
        }
    }
}

/// Configuration manager for persistent storage. Schedule mutations are
/// written back to disk immediately so a restart never loses a remote
/// schedule update.
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new configuration manager and load config from disk
    pub async fn new() -> Result<Self> {
        Self::at_path(Self::get_config_path()?).await
    }

    /// Load (or create) the config file at an explicit path.
    pub async fn at_path(config_path: PathBuf) -> Result<Self> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let config = Self::load_config(&config_path).await?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Get the XDG-compliant config path: ~/.config/roost/config.yaml
    fn get_config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "roost").context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    async fn load_config(path: &PathBuf) -> Result<Config> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .await
                .context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&contents).context("Failed to parse config file")?;

            if config.version != CONFIG_VERSION {
                bail!(
                    "Unsupported config file version {} (expected {})",
                    config.version,
                    CONFIG_VERSION
                );
            }

            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Config file not found, creating default at {:?}", path);
            let config = Config::default();

            // Save default config
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize default config")?;
            fs::write(path, yaml)
                .await
                .context("Failed to write default config")?;

            Ok(config)
        }
    }

    /// Save config to disk
    async fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.config).context("Failed to serialize config")?;

        fs::write(&self.config_path, yaml)
            .await
            .context("Failed to write config file")?;

        tracing::debug!("Saved configuration to {:?}", self.config_path);
        Ok(())
    }

    /// Get the dashboard connection configuration
    pub fn dashboard_config(&self) -> DashboardConfig {
        self.config.dashboard.clone()
    }

    /// Get the current door schedule
    pub fn schedule(&self) -> Schedule {
        self.config.schedule
    }

    /// Set and persist the daily open time
    pub async fn set_open_time(&mut self, time: TimeOfDay) -> Result<()> {
        self.config.schedule.open = time;
        self.save().await?;
        Ok(())
    }

    /// Set and persist the daily close time
    pub async fn set_close_time(&mut self, time: TimeOfDay) -> Result<()> {
        self.config.schedule.close = time;
        self.save().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("roost-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = temp_config_path("defaults");
        let _ = fs::remove_dir_all(&dir).await;
        let manager = ConfigManager::at_path(dir.join("config.yaml")).await.unwrap();

        assert_eq!(manager.schedule(), Schedule::default());
        assert!(dir.join("config.yaml").exists());

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn schedule_round_trips_through_disk() {
        let dir = temp_config_path("round-trip");
        let _ = fs::remove_dir_all(&dir).await;
        let path = dir.join("config.yaml");

        let mut manager = ConfigManager::at_path(path.clone()).await.unwrap();
        manager.set_open_time(TimeOfDay::new(6, 45)).await.unwrap();
        manager.set_close_time(TimeOfDay::new(21, 5)).await.unwrap();

        let reloaded = ConfigManager::at_path(path).await.unwrap();
        assert_eq!(reloaded.schedule().open, TimeOfDay::new(6, 45));
        assert_eq!(reloaded.schedule().close, TimeOfDay::new(21, 5));

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn rejects_unknown_config_version() {
        let dir = temp_config_path("version");
        let _ = fs::remove_dir_all(&dir).await;
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("config.yaml");
        fs::write(&path, "version: 99\n").await.unwrap();

        assert!(ConfigManager::at_path(path).await.is_err());

        let _ = fs::remove_dir_all(&dir).await;
    }
}
