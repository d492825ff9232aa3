pub mod catalog;
pub mod service;
pub mod session;

pub use catalog::{Catalog, DEFAULT_ITEMS, InMemoryCatalog};
pub use service::{CallCompletion, Service, StreamingCall};
pub use session::{CallContext, SessionSummary, StreamSession, effective_timeout};
