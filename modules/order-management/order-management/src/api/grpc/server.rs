//! gRPC server implementation for order management
//!
//! Translates tonic requests and streams into domain calls. Every call gets a
//! [`CallContext`] tied to server shutdown and bounded by the caller's
//! `grpc-timeout` and the configured maximum call duration.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::{Instrument, Span, info, info_span, warn};

use order_management_sdk::{OrderError, OrderManagement, OrderRequest, OrderResponse};
use order_transport_grpc::request_timeout;

use crate::config::OrderServiceConfig;
use crate::domain::{CallCompletion, CallContext, Service, StreamSession, effective_timeout};

type ResponseStream = Pin<Box<dyn Stream<Item = Result<OrderResponse, Status>> + Send>>;

/// gRPC service implementation that wraps the domain Service.
#[derive(Clone)]
pub struct OrderManagementServiceImpl {
    service: Service,
    config: OrderServiceConfig,
    shutdown: CancellationToken,
}

impl OrderManagementServiceImpl {
    /// Calls in flight are cancelled once `shutdown` fires.
    #[must_use]
    pub fn new(service: Service, config: OrderServiceConfig, shutdown: CancellationToken) -> Self {
        Self {
            service,
            config,
            shutdown,
        }
    }

    fn call_context<T>(&self, request: &Request<T>) -> CallContext {
        let timeout = effective_timeout(
            request_timeout(request.metadata()),
            self.config.max_call_duration(),
        );
        CallContext::child_of(&self.shutdown, timeout)
    }
}

fn inbound(
    stream: Streaming<OrderRequest>,
) -> impl Stream<Item = Result<OrderRequest, OrderError>> + Unpin + Send + 'static {
    stream.map(|item| item.map_err(OrderError::from))
}

fn outbound<S>(responses: S) -> ResponseStream
where
    S: Stream<Item = Result<OrderResponse, OrderError>> + Send + 'static,
{
    Box::pin(responses.map(|item| item.map_err(Status::from)))
}

/// Log how a streaming call ended once its task reports back.
fn supervise(completion: CallCompletion) {
    tokio::spawn(
        async move {
            match completion.wait().await {
                Ok(summary) => info!(
                    received = summary.received,
                    sent = summary.sent,
                    "stream completed"
                ),
                Err(e) if e.is_not_found() => info!(error = %e, "stream ended without a match"),
                Err(e) => warn!(error = %e, "stream failed"),
            }
        }
        .instrument(Span::current()),
    );
}

fn log_failure(err: &OrderError) {
    if err.is_not_found() {
        info!(error = %err, "no match");
    } else {
        warn!(error = %err, "call failed");
    }
}

#[tonic::async_trait]
impl OrderManagement for OrderManagementServiceImpl {
    type ServerStreamGetOrderStream = ResponseStream;
    type BiDiStreamGetOrderStream = ResponseStream;

    async fn unary_get_order(
        &self,
        request: Request<OrderRequest>,
    ) -> Result<Response<OrderResponse>, Status> {
        info_span!("rpc", method = "UnaryGetOrder").in_scope(|| {
            let req = request.into_inner();
            self.service
                .unary_get_order(&req)
                .map(Response::new)
                .map_err(|e| {
                    log_failure(&e);
                    e.into()
                })
        })
    }

    async fn server_stream_get_order(
        &self,
        request: Request<OrderRequest>,
    ) -> Result<Response<Self::ServerStreamGetOrderStream>, Status> {
        info_span!("rpc", method = "ServerStreamGetOrder").in_scope(|| {
            let ctx = self.call_context(&request);
            let req = request.into_inner();
            match self
                .service
                .server_stream_get_order(&req, ctx, self.config.stream_buffer)
            {
                Ok(call) => {
                    supervise(call.completion);
                    Ok(Response::new(outbound(call.responses)))
                }
                Err(e) => {
                    log_failure(&e);
                    Err(e.into())
                }
            }
        })
    }

    async fn client_stream_get_order(
        &self,
        request: Request<Streaming<OrderRequest>>,
    ) -> Result<Response<OrderResponse>, Status> {
        let span = info_span!("rpc", method = "ClientStreamGetOrder");

        async move {
            let ctx = self.call_context(&request);
            let session = StreamSession::inbound_only(ctx);
            let requests = inbound(request.into_inner());

            self.service
                .client_stream_get_order(session, requests)
                .await
                .map(Response::new)
                .map_err(|e| {
                    log_failure(&e);
                    e.into()
                })
        }
        .instrument(span)
        .await
    }

    async fn bi_di_stream_get_order(
        &self,
        request: Request<Streaming<OrderRequest>>,
    ) -> Result<Response<Self::BiDiStreamGetOrderStream>, Status> {
        info_span!("rpc", method = "BiDiStreamGetOrder").in_scope(|| {
            let ctx = self.call_context(&request);
            let requests = inbound(request.into_inner());
            let call = self
                .service
                .bidi_stream_get_order(requests, ctx, self.config.stream_buffer);
            supervise(call.completion);

            Ok(Response::new(outbound(call.responses)))
        })
    }
}
