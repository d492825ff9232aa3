//! gRPC client implementation of `OrderManagementClientV1`

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use order_transport_grpc::client::{self, GrpcClientConfig};
use tonic::transport::Channel;

use crate::api::{OrderError, OrderManagementClientV1, OrderStream, RequestStream};
use crate::proto::order_management_client::OrderManagementClient;
use crate::proto::{OrderRequest, OrderResponse};

/// gRPC client for the order management service.
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Clone)]
pub struct OrderManagementGrpcClient {
    inner: OrderManagementClient<Channel>,
    cfg: GrpcClientConfig,
}

impl OrderManagementGrpcClient {
    /// Connect to the service at `uri`. Every call carries `cfg.call_timeout`
    /// as its deadline.
    ///
    /// # Errors
    /// Returns an error if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str, cfg: GrpcClientConfig) -> Result<Self> {
        let channel = client::connect(uri, &cfg).await?;
        Ok(Self::from_channel(channel, cfg))
    }

    #[must_use]
    pub fn from_channel(channel: Channel, cfg: GrpcClientConfig) -> Self {
        Self {
            inner: OrderManagementClient::new(channel),
            cfg,
        }
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        self.cfg.apply_deadline(&mut request);
        request
    }
}

/// Concrete wrapper around `RequestStream`. Passing the boxed `dyn Stream`
/// straight to the generated client trips a rustc higher-ranked lifetime
/// error when proving the call future is `Send`; a named type avoids it.
struct OutboundRequests(RequestStream);

impl futures::Stream for OutboundRequests {
    type Item = OrderRequest;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<OrderRequest>> {
        self.0.poll_next_unpin(cx)
    }
}

fn into_order_stream(stream: tonic::Streaming<OrderResponse>) -> OrderStream {
    stream.map(|item| item.map_err(OrderError::from)).boxed()
}

#[async_trait]
impl OrderManagementClientV1 for OrderManagementGrpcClient {
    async fn unary_get_order(&self, request: OrderRequest) -> Result<OrderResponse, OrderError> {
        let mut client = self.inner.clone();
        let response = client.unary_get_order(self.request(request)).await?;
        Ok(response.into_inner())
    }

    async fn server_stream_get_order(
        &self,
        request: OrderRequest,
    ) -> Result<OrderStream, OrderError> {
        let mut client = self.inner.clone();
        let response = client.server_stream_get_order(self.request(request)).await?;
        Ok(into_order_stream(response.into_inner()))
    }

    async fn client_stream_get_order(
        &self,
        requests: RequestStream,
    ) -> Result<OrderResponse, OrderError> {
        let mut client = self.inner.clone();
        let response = client.client_stream_get_order(self.request(OutboundRequests(requests))).await?;
        Ok(response.into_inner())
    }

    async fn bidi_stream_get_order(
        &self,
        requests: RequestStream,
    ) -> Result<OrderStream, OrderError> {
        let mut client = self.inner.clone();
        let response = client.bi_di_stream_get_order(self.request(OutboundRequests(requests))).await?;
        tracing::debug!("bidirectional call established");
        Ok(into_order_stream(response.into_inner()))
    }
}
