#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
//! Bootstrap helpers shared by the order service binaries.
//!
//! This crate provides layered configuration loading, logging initialization
//! and shutdown signal handling for host processes.

pub mod config;
pub mod logging;
pub mod signals;

pub use config::{ConfigError, load_layered, render};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use signals::{ShutdownSignal, cancel_on_shutdown, wait_for_shutdown};
