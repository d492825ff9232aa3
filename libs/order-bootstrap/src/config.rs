//! Layered configuration loading.
//!
//! Precedence, lowest first:
//! 1. compiled defaults
//! 2. YAML file (when a path is given)
//! 3. environment variables under a prefix, nested with `__`
//!    (`ORDERS__SERVER__LISTEN_ADDR` sets `server.listen_addr`)
//!
//! CLI overrides are applied by the caller on the extracted value.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file does not exist: {0}")]
    MissingFile(String),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_json::Error),
}

/// Load `T` from defaults, an optional YAML file and prefixed environment variables.
///
/// # Errors
/// Returns [`ConfigError::MissingFile`] when `path` is given but is not a file,
/// and [`ConfigError::Invalid`] when a layer cannot be merged into `T`.
pub fn load_layered<T>(defaults: &T, path: Option<&Path>, env_prefix: &str) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let mut figment = Figment::new().merge(Serialized::defaults(defaults));

    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.display().to_string()));
        }
        figment = figment.merge(Yaml::file(path));
    }

    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// Render a configuration value for `--print-config` style output.
///
/// # Errors
/// Returns [`ConfigError::Render`] if the value cannot be serialized.
pub fn render<T: Serialize>(config: &T) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(config)?)
}
