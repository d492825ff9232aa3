//! Logging initialization, powered by `tracing-subscriber`.
//!
//! The effective filter is, in order of precedence:
//! 1. `RUST_LOG`, when set and valid
//! 2. CLI verbosity (`-v` info, `-vv` debug, `-vvv` trace)
//! 3. `logging.level` from configuration
//!
//! with noisy transport crates capped at `warn` and per-target overrides
//! from `logging.targets` appended.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the console log layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line text.
    #[default]
    Text,
    /// JSON lines for log shippers.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Per-target overrides, e.g. `order_management: debug`.
    pub targets: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
            targets: BTreeMap::new(),
        }
    }
}

const NOISY_TARGETS: &[(&str, &str)] = &[
    ("h2", "warn"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("tower", "warn"),
    ("tonic", "info"),
];

/// Base level after applying CLI verbosity.
#[must_use]
pub fn effective_level(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_env_filter(level: &str, targets: &BTreeMap<String, String>) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_owned()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{target}={lvl}"));
    }
    for (target, lvl) in targets {
        directives.push(format!("{target}={lvl}"));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{filter_str}': {e}"))
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns an error if the configured filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig, verbose: u8) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(effective_level(&cfg.level, verbose), &cfg.targets)?,
    };

    let layer = match cfg.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(level = %cfg.level, verbose, format = ?cfg.format, "Logging initialized");
    Ok(())
}
