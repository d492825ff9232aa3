//! Order Management SDK
//!
//! This crate provides everything needed to consume the order management service:
//! - API trait (`OrderManagementClientV1`) covering the four interaction patterns
//! - Error type (`OrderError`) and its mapping to and from gRPC status codes
//! - gRPC client (`OrderManagementGrpcClient`)
//! - Per-session order id allocation (`OrderIdSequence`)
//! - Proto stubs for the server implementation
//!
//! ## Usage
//!
//! ```ignore
//! use order_management_sdk::{OrderIdSequence, OrderManagementClientV1, OrderManagementGrpcClient, SERVICE_NAME};
//! use order_transport_grpc::client::GrpcClientConfig;
//!
//! let cfg = GrpcClientConfig::new(SERVICE_NAME).with_call_timeout(Some(Duration::from_secs(30)));
//! let client = OrderManagementGrpcClient::connect("http://127.0.0.1:50505", cfg).await?;
//! let mut ids = OrderIdSequence::default();
//! let response = client.unary_get_order(ids.next_request("apple")).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === API TRAIT AND TYPES ===
mod api;
pub use api::{OrderError, OrderManagementClientV1, OrderStream, RequestStream};

// === CLIENT ===
mod client;
pub use client::OrderManagementGrpcClient;

mod sequence;
pub use sequence::OrderIdSequence;

// === GRPC PROTO STUBS (for server implementation) ===
/// Generated protobuf types for the `OrderManagement` service
pub mod proto {
    tonic::include_proto!("orders.v1");
}

// Re-export proto types needed by server
pub use proto::order_management_server::{OrderManagement, OrderManagementServer};
pub use proto::{OrderRequest, OrderResponse};

/// Fully qualified gRPC service name
pub const SERVICE_NAME: &str = "orders.v1.OrderManagement";
