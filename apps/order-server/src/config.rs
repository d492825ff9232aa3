//! Host configuration: listener, order service limits, catalog and logging.

use std::path::Path;

use order_bootstrap::{ConfigError, LoggingConfig, load_layered};
use order_management::{CatalogConfig, OrderServiceConfig};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `ORDERS__SERVER__LISTEN_ADDR`.
pub const ENV_PREFIX: &str = "ORDERS__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:50505".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub orders: OrderServiceConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults, then the YAML file at `path`, then `ORDERS__*` variables.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        load_layered(&Self::default(), path, ENV_PREFIX)
    }
}
