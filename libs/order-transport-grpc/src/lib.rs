#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
//! gRPC transport helpers shared by the order service and its clients.
//!
//! - [`client`]: endpoint configuration and connection establishment
//! - [`server`]: hosting a set of tonic routes on a TCP listener with graceful shutdown
//! - [`deadline`]: reading the `grpc-timeout` header carried by incoming calls

pub mod client;
pub mod deadline;
pub mod server;

pub use deadline::{GRPC_TIMEOUT_HEADER, TimeoutParseError, parse_grpc_timeout, request_timeout};
