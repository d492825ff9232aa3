//! Order Management Module
//!
//! Finds catalog items matching a requested name, exposed over gRPC through
//! unary, server-streaming, client-streaming and bidirectional calls.
//!
//! ## Architecture
//!
//! - `domain/catalog.rs` - Catalog lookup
//! - `domain/session.rs` - Per-call state for streaming calls
//! - `domain/service.rs` - The four order contracts
//! - `api/grpc/server.rs` - gRPC server implementation
//! - `module.rs` - Wiring from configuration to tonic routes
//!
//! External consumers should use the `order-management-sdk` crate which
//! provides the gRPC client.

// === MODULE DEFINITION ===
mod module;
pub use module::OrderManagementModule;

pub mod config;
pub use config::{CatalogConfig, OrderServiceConfig};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
