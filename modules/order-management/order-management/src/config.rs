//! Order service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_ITEMS;

/// Limits applied to every call the service handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderServiceConfig {
    /// Upper bound on any call's lifetime; `0` leaves calls bounded only by
    /// the caller's own deadline.
    pub max_call_duration_ms: u64,
    /// Responses buffered per streaming call before sends wait on the peer.
    pub stream_buffer: usize,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            max_call_duration_ms: 1_200_000,
            stream_buffer: 16,
        }
    }
}

impl OrderServiceConfig {
    #[must_use]
    pub fn max_call_duration(&self) -> Option<Duration> {
        (self.max_call_duration_ms > 0).then(|| Duration::from_millis(self.max_call_duration_ms))
    }
}

/// Items the in-memory catalog serves, in search order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub items: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            items: DEFAULT_ITEMS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}
