//! File-based logging with per-component log files.
//!
//! | Log File          | Component                   | Target Prefixes      |
//! |-------------------|-----------------------------|----------------------|
//! | steward.log       | Root logger (all components) | (all)               |
//! | consistency.log   | Cache consistency, login    | steward_core        |
//! | lock.log          | Distributed locking         | steward_consistency |
//! | cache.log         | User cache                  | steward_cache       |
//! | persistence.log   | User store                  | steward_persistence |
//!
//! Log files are stored in `~/steward/logs` by default.
//! Override with the `steward.logs.path` config key.

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Internal definition for a component log file.
struct ComponentLogDef {
    /// Log file prefix (e.g. "lock" for lock.log)
    file_prefix: &'static str,
    /// Target module prefixes routed to this file
    targets: &'static [&'static str],
}

const ROOT_LOG: &str = "steward";

const COMPONENT_LOGS: &[ComponentLogDef] = &[
    ComponentLogDef {
        file_prefix: "consistency",
        targets: &["steward_core"],
    },
    ComponentLogDef {
        file_prefix: "lock",
        targets: &["steward_consistency"],
    },
    ComponentLogDef {
        file_prefix: "cache",
        targets: &["steward_cache"],
    },
    ComponentLogDef {
        file_prefix: "persistence",
        targets: &["steward_persistence", "sea_orm", "sqlx"],
    },
];

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Rotate daily (default)
    Daily,
    /// Rotate hourly
    Hourly,
    /// Never rotate (single file)
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

fn default_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{}/steward/logs", home))
}

/// Logging configuration for the entire application.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log directory (default: `~/steward/logs`)
    pub log_dir: PathBuf,
    /// Enable console output
    pub console_output: bool,
    /// Console log level
    pub console_level: Level,
    /// Enable file logging
    pub file_logging: bool,
    /// Default log level for files
    pub file_level: Level,
    /// Log rotation policy
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            console_output: true,
            console_level: Level::INFO,
            file_logging: false,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Create from application configuration.
    pub fn from_config(
        log_dir: Option<String>,
        console_output: bool,
        file_logging: bool,
        level: String,
    ) -> Self {
        let log_dir = log_dir.map(PathBuf::from).unwrap_or_else(default_log_dir);
        let level = level.parse().unwrap_or(Level::INFO);

        Self {
            log_dir,
            console_output,
            console_level: level,
            file_logging,
            file_level: level,
            rotation: LogRotation::Daily,
        }
    }
}

/// Guard that keeps the logging system alive.
///
/// Dropping it flushes buffered file output.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

fn file_layer(
    config: &LoggingConfig,
    prefix: &str,
    guards: &mut Vec<WorkerGuard>,
) -> anyhow::Result<impl Layer<Registry> + Send + Sync> {
    let appender = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&config.log_dir)
        .with_context(|| {
            format!(
                "Failed to open {}.log in {}",
                prefix,
                config.log_dir.display()
            )
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);

    Ok(fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false))
}

/// Initialize the logging system.
///
/// Sets up console output and, when enabled, a root `steward.log` that
/// captures every event plus one file per component routed by tracing target.
/// `RUST_LOG` overrides the configured level for the console and root file.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory {}", config.log_dir.display())
        })?;
    }

    let mut guards: Vec<WorkerGuard> = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.console_level.to_string()));
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(filter);
        layers.push(Box::new(console_layer));
    }

    if config.file_logging {
        let root_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.file_level.to_string()));
        let root_layer = file_layer(config, ROOT_LOG, &mut guards)?.with_filter(root_filter);
        layers.push(Box::new(root_layer));

        for component in COMPONENT_LOGS {
            let mut targets = Targets::new();
            for target in component.targets {
                targets =
                    targets.with_target(*target, LevelFilter::from_level(config.file_level));
            }
            let layer =
                file_layer(config, component.file_prefix, &mut guards)?.with_filter(targets);
            layers.push(Box::new(layer));
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    if config.file_logging {
        tracing::info!(
            log_dir = %config.log_dir.display(),
            component_files = COMPONENT_LOGS.len(),
            "File logging initialized"
        );
    }

    Ok(LoggingGuard {
        _file_guards: guards,
    })
}
