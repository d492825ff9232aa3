//! Order management API trait and types
//!
//! Contract trait and error type shared by the client and the server.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tonic::{Code, Status};

use crate::proto::{OrderRequest, OrderResponse};

/// Responses of a streaming call; the stream ends early with the call's error.
pub type OrderStream = BoxStream<'static, Result<OrderResponse, OrderError>>;

/// Requests sent by the caller on a client-streaming or bidirectional call.
/// The caller half-closes by ending the stream.
pub type RequestStream = BoxStream<'static, OrderRequest>;

/// Order management API.
///
/// One logical operation, "find catalog items matching a requested name",
/// exposed through the four RPC interaction patterns.
#[async_trait]
pub trait OrderManagementClientV1: Send + Sync {
    /// First catalog item matching `request.order_name`.
    async fn unary_get_order(&self, request: OrderRequest) -> Result<OrderResponse, OrderError>;

    /// Every matching item, in catalog order.
    async fn server_stream_get_order(&self, request: OrderRequest)
    -> Result<OrderStream, OrderError>;

    /// One response for the first request whose name matches anything.
    async fn client_stream_get_order(
        &self,
        requests: RequestStream,
    ) -> Result<OrderResponse, OrderError>;

    /// Matching items for each request, produced while the caller keeps sending.
    async fn bidi_stream_get_order(&self, requests: RequestStream)
    -> Result<OrderStream, OrderError>;
}

/// Error type for order operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("call cancelled")]
    Cancelled,

    #[error("call deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrderError {
    /// No catalog item matches `query`.
    #[must_use]
    pub fn not_found(query: &str) -> Self {
        Self::NotFound(format!("no catalog item matches '{query}'"))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<Status> for OrderError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound => Self::NotFound(status.message().to_owned()),
            Code::Cancelled => Self::Cancelled,
            Code::DeadlineExceeded => Self::DeadlineExceeded,
            Code::Internal => Self::Internal(status.message().to_owned()),
            code => Self::Transport(format!("{code}: {}", status.message())),
        }
    }
}

impl From<OrderError> for Status {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(msg) => Status::not_found(msg),
            OrderError::Transport(msg) => Status::unavailable(msg),
            OrderError::Cancelled => Status::cancelled("call cancelled"),
            OrderError::DeadlineExceeded => Status::deadline_exceeded("call deadline exceeded"),
            OrderError::Internal(msg) => Status::internal(msg),
        }
    }
}
