//! Daemon configuration
//!
//! Layers, lowest first: built-in defaults, the TOML file named by
//! `SHIPSCREEN_CONFIG` (optional), then `SHIPSCREEN__SECTION__KEY`
//! environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use shipscreen_core::application::CacheSettings;
use shipscreen_core::domain::ScreeningPolicy;
use shipscreen_core::port::MaintenanceConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "SHIPSCREEN_CONFIG";
const ENV_PREFIX: &str = "SHIPSCREEN";
const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database: DatabaseConfig,
    pub rpc: RpcConfig,
    pub worker: WorkerConfig,
    pub screening: ScreeningConfig,
    pub providers: ProvidersConfig,
    pub policy: ScreeningPolicy,
    pub maintenance: MaintenanceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `~` is expanded
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = directories::ProjectDirs::from("", "", "shipscreen")
            .map(|dirs| dirs.data_dir().join("shipscreen.db"))
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "~/.shipscreen/shipscreen.db".to_string());
        Self { path }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: shipscreen_api_rpc::server::DEFAULT_RPC_HOST.to_string(),
            port: shipscreen_api_rpc::server::DEFAULT_RPC_PORT,
            rate_limit_burst: 200,
            rate_limit_per_sec: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub max_attempts: i32,
    pub retry_base_delay_ms: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub kill_after_hours: i64,
    pub rescreen_interval_hours: i64,
    /// Period of the killer / staleness / bulk round
    pub sweep_interval_secs: u64,
    pub cache_ttl_secs: i64,
    pub cache_lock_ttl_secs: i64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            kill_after_hours: 6,
            rescreen_interval_hours: 24,
            sweep_interval_secs: 60,
            cache_ttl_secs: 3600,
            cache_lock_ttl_secs: 60,
        }
    }
}

impl ScreeningConfig {
    pub fn kill_after_ms(&self) -> i64 {
        self.kill_after_hours * HOUR_MS
    }

    pub fn rescreen_interval_ms(&self) -> i64 {
        self.rescreen_interval_hours * HOUR_MS
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl_ms: self.cache_ttl_secs * 1000,
            lock_ttl_ms: self.cache_lock_ttl_secs * 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9650".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    pub interval_hours: u64,
    pub finished_job_retention_days: i64,
    pub max_db_size_mb: f64,
    pub cache_retention_hours: i64,
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        let defaults = MaintenanceConfig::default();
        Self {
            interval_hours: 24,
            finished_job_retention_days: defaults.finished_job_retention_days,
            max_db_size_mb: defaults.max_db_size_mb,
            cache_retention_hours: defaults.cache_retention_hours,
        }
    }
}

impl MaintenanceSection {
    pub fn to_config(&self) -> MaintenanceConfig {
        MaintenanceConfig {
            finished_job_retention_days: self.finished_job_retention_days,
            max_db_size_mb: self.max_db_size_mb,
            cache_retention_hours: self.cache_retention_hours,
        }
    }
}

impl DaemonConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(file.as_deref(), None)
    }

    /// `env` replaces the process environment when given
    pub fn load_from(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: DaemonConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.worker.count > 0, "worker.count must be at least 1");
        anyhow::ensure!(
            self.worker.max_attempts > 0,
            "worker.max_attempts must be at least 1"
        );
        anyhow::ensure!(
            self.screening.kill_after_hours > 0 && self.screening.rescreen_interval_hours > 0,
            "screening intervals must be positive"
        );
        anyhow::ensure!(
            self.rpc.rate_limit_burst > 0,
            "rpc.rate_limit_burst must be at least 1"
        );
        Ok(())
    }

    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).into_owned()
    }
}
