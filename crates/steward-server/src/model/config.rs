//! Configuration management for Steward server
//!
//! Values come from `conf/application.yml` (optional), overlaid with
//! `STEWARD__*` environment variables and finally command line flags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow, ensure};
use clap::Parser;
use config::{Config, Environment, File};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use steward_cache::CacheConfig;
use steward_consistency::LockConfig;
use steward_consistency::lock::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_LOCK_TTL_MS, DEFAULT_LOCK_WAIT_MS,
};
use steward_core::ConsistencyConfig;
use steward_persistence::StorageMode;

use super::constants::*;
use crate::startup::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "steward-server", version, about)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,
    /// Persistence mode: external_db or standalone
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut overrides = Vec::new();
        if let Some(mode) = &cli.mode {
            overrides.push((PERSISTENCE_MODE, mode.clone()));
        }
        if let Some(url) = &cli.database_url {
            overrides.push((DB_URL, url.clone()));
        }
        Self::load(&cli.config_file, overrides)
    }

    /// Build from `path` (skipped when missing), the environment and `overrides`
    pub fn load(path: impl AsRef<Path>, overrides: Vec<(&str, String)>) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .keep_prefix(true)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        for (key, value) in overrides {
            builder = builder
                .set_override(key, value)
                .with_context(|| format!("Failed to set override for {}", key))?;
        }

        let config = builder.build().with_context(|| {
            format!(
                "Failed to build configuration - check {}",
                path.as_ref().display()
            )
        })?;

        Ok(Configuration { config })
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .map(|v| v.max(0) as u64)
            .unwrap_or(default)
    }

    // ========================================================================
    // Persistence Configuration
    // ========================================================================

    pub fn persistence_mode(&self) -> anyhow::Result<StorageMode> {
        let mode = self
            .config
            .get_string(PERSISTENCE_MODE)
            .unwrap_or(StorageMode::Standalone.to_string());
        mode.parse().map_err(|e: String| anyhow!(e))
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let url = self
            .config
            .get_string(DB_URL)
            .with_context(|| format!("{} is required in external_db mode", DB_URL))?;

        let max_connections = self
            .config
            .get_int(DB_MAX_CONNECTIONS)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS) as u32;
        let min_connections = self
            .config
            .get_int(DB_MIN_CONNECTIONS)
            .unwrap_or(DEFAULT_DB_MIN_CONNECTIONS) as u32;
        let connect_timeout = self.get_u64(
            DB_CONNECT_TIMEOUT_SECS,
            DEFAULT_DB_CONNECT_TIMEOUT_SECS as u64,
        );
        let sqlx_logging = self.config.get_bool(DB_SQLX_LOGGING).unwrap_or(false);

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .sqlx_logging(sqlx_logging);

        Database::connect(opt)
            .await
            .context("Failed to connect to the user database")
    }

    // ========================================================================
    // Cache Configuration
    // ========================================================================

    pub fn cache_config(&self) -> CacheConfig {
        let defaults = CacheConfig::default();
        CacheConfig::new()
            .with_ttl(Duration::from_secs(
                self.get_u64(CACHE_TTL_SECS, defaults.ttl.as_secs()),
            ))
            .with_max_capacity(self.get_u64(CACHE_MAX_CAPACITY, defaults.max_capacity))
    }

    // ========================================================================
    // Lock and Coordinator Configuration
    // ========================================================================

    pub fn lock_config(&self) -> anyhow::Result<LockConfig> {
        let ttl_ms = self.get_u64(LOCK_TTL_MS, DEFAULT_LOCK_TTL_MS);
        ensure!(ttl_ms > 0, "{} must be positive, every lock needs a lease", LOCK_TTL_MS);

        let mut lock = LockConfig::default()
            .with_ttl_ms(ttl_ms)
            .with_wait_ms(self.get_u64(LOCK_WAIT_MS, DEFAULT_LOCK_WAIT_MS))
            .with_cleanup_interval_ms(
                self.get_u64(LOCK_CLEANUP_INTERVAL_MS, DEFAULT_CLEANUP_INTERVAL_MS),
            );
        if let Ok(namespace) = self.config.get_string(LOCK_NAMESPACE) {
            lock = lock.with_namespace(namespace);
        }
        Ok(lock)
    }

    pub fn consistency_config(&self) -> anyhow::Result<ConsistencyConfig> {
        Ok(ConsistencyConfig::default()
            .with_lock(self.lock_config()?)
            .with_local_gate(
                self.config.get_bool(COORDINATOR_LOCAL_GATE).unwrap_or(true),
            ))
    }

    // ========================================================================
    // Identity Configuration
    // ========================================================================

    /// Credential table for the built-in verifier (external id -> secret)
    pub fn identity_credentials(&self) -> HashMap<String, String> {
        self.config
            .get::<HashMap<String, String>>(IDENTITY_CREDENTIALS)
            .unwrap_or_default()
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH).ok(),
            self.config.get_bool(LOGS_CONSOLE).unwrap_or(true),
            self.config.get_bool(LOGS_FILE).unwrap_or(false),
            self.config
                .get_string(LOGS_LEVEL)
                .unwrap_or("info".to_string()),
        )
    }
}
