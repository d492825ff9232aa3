//! Catalog lookup.

use std::sync::Arc;

/// Read-only catalog searched by every order.
///
/// Implementations must be deterministic and side-effect-free; calls run
/// concurrently without any synchronization from the caller.
pub trait Catalog: Send + Sync {
    /// Item names containing `query`, in catalog order. Empty when nothing matches.
    fn search(&self, query: &str) -> Vec<String>;
}

/// Items served when no catalog is configured.
pub const DEFAULT_ITEMS: &[&str] = &[
    "apple",
    "apple juice",
    "apple pie",
    "banana",
    "banana bread",
    "blueberry muffin",
    "cherry tart",
    "green apple",
    "orange",
    "orange juice",
    "pineapple",
    "strawberry jam",
];

/// Catalog held in memory, matched by substring.
///
/// An empty query matches every item.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    items: Arc<[String]>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS.iter().copied())
    }
}

impl Catalog for InMemoryCatalog {
    fn search(&self, query: &str) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.contains(query))
            .cloned()
            .collect()
    }
}
