//! End-to-end calls against a real server over loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use order_management::{CatalogConfig, OrderManagementModule, OrderServiceConfig};
use order_management_sdk::{
    OrderError, OrderIdSequence, OrderManagementClientV1, OrderManagementGrpcClient, OrderRequest,
    RequestStream, SERVICE_NAME,
};
use order_transport_grpc::client::GrpcClientConfig;
use order_transport_grpc::server::{bind_tcp, serve_routes};

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(config: OrderServiceConfig) -> anyhow::Result<Self> {
        let module = OrderManagementModule::from_config(config, &CatalogConfig::default());
        let shutdown = CancellationToken::new();
        let listener = bind_tcp("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(serve_routes(
            listener,
            module.routes(shutdown.clone()),
            shutdown.clone(),
        ));
        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    async fn client(&self) -> anyhow::Result<OrderManagementGrpcClient> {
        self.client_with(GrpcClientConfig::new(SERVICE_NAME)).await
    }

    async fn client_with(
        &self,
        cfg: GrpcClientConfig,
    ) -> anyhow::Result<OrderManagementGrpcClient> {
        OrderManagementGrpcClient::connect(&format!("http://{}", self.addr), cfg).await
    }

    async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.handle.await?
    }
}

fn request(order_id: i32, order_name: &str) -> OrderRequest {
    OrderRequest {
        order_id,
        order_name: order_name.to_owned(),
    }
}

fn request_channel() -> (mpsc::Sender<OrderRequest>, RequestStream) {
    let (tx, rx) = mpsc::channel(8);
    (tx, ReceiverStream::new(rx).boxed())
}

#[tokio::test]
async fn unary_returns_first_match() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let response = client.unary_get_order(request(42, "apple")).await?;
    assert_eq!(response.order_id, 42);
    assert_eq!(response.order_name, "apple");
    assert!(!response.timestamp.is_empty());

    let err = client
        .unary_get_order(request(43, "zzz-no-match"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn server_stream_delivers_matches_in_catalog_order() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let responses: Vec<_> = client
        .server_stream_get_order(request(7, "apple"))
        .await?
        .collect()
        .await;
    let names: Vec<_> = responses
        .into_iter()
        .map(|r| r.map(|r| (r.order_id, r.order_name)))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        names,
        vec![
            (7, "apple".to_owned()),
            (7, "apple juice".to_owned()),
            (7, "apple pie".to_owned()),
            (7, "green apple".to_owned()),
            (7, "pineapple".to_owned()),
        ]
    );

    let err = client
        .server_stream_get_order(request(8, "zzz-no-match"))
        .await
        .err();
    assert!(matches!(err, Some(OrderError::NotFound(_))));

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn client_stream_answers_once_for_first_match() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let mut ids = OrderIdSequence::default();
    let batch = vec![
        ids.next_request("zzz-no-match"),
        ids.next_request("cherry"),
        ids.next_request("apple"),
    ];
    let response = client
        .client_stream_get_order(futures::stream::iter(batch).boxed())
        .await?;
    assert_eq!(response.order_id, 2);
    assert_eq!(response.order_name, "cherry tart");

    let err = client
        .client_stream_get_order(futures::stream::empty::<OrderRequest>().boxed())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    drop(client);
    server.stop().await
}

#[tokio::test]
async fn bidi_responds_while_caller_keeps_sending() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let (tx, requests) = request_channel();
    tx.send(request(1, "orange")).await?;
    let mut responses = client.bidi_stream_get_order(requests).await?;

    // Both matches for the first request arrive before the second is sent.
    let first = responses.next().await.unwrap()?;
    let second = responses.next().await.unwrap()?;
    assert_eq!((first.order_id, first.order_name.as_str()), (1, "orange"));
    assert_eq!((second.order_id, second.order_name.as_str()), (1, "orange juice"));

    tx.send(request(2, "muffin")).await?;
    let third = responses.next().await.unwrap()?;
    assert_eq!((third.order_id, third.order_name.as_str()), (2, "blueberry muffin"));

    drop(tx);
    assert!(responses.next().await.is_none());

    drop(responses);
    drop(client);
    server.stop().await
}

#[tokio::test]
async fn bidi_unmatched_request_fails_the_call() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let (tx, requests) = request_channel();
    tx.send(request(1, "banana bread")).await?;
    tx.send(request(2, "zzz-no-match")).await?;
    let responses: Vec<_> = client.bidi_stream_get_order(requests).await?.collect().await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].as_ref().map(|r| r.order_name.as_str()), Ok("banana bread"));
    assert!(matches!(&responses[1], Err(e) if e.is_not_found()));

    drop(tx);
    drop(client);
    server.stop().await
}

#[tokio::test]
async fn caller_deadline_ends_idle_bidi_call() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server
        .client_with(
            GrpcClientConfig::new(SERVICE_NAME).with_call_timeout(Some(Duration::from_millis(300))),
        )
        .await?;

    let (tx, requests) = request_channel();
    let mut responses = client.bidi_stream_get_order(requests).await?;

    let outcome = tokio::time::timeout(Duration::from_secs(10), responses.next()).await?;
    assert!(matches!(outcome, Some(Err(OrderError::DeadlineExceeded))));

    drop(tx);
    drop(responses);
    drop(client);
    server.stop().await
}

#[tokio::test]
async fn server_call_limit_bounds_client_stream() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig {
        max_call_duration_ms: 200,
        ..OrderServiceConfig::default()
    })
    .await?;
    let client = server.client().await?;

    let (tx, requests) = request_channel();
    tx.send(request(1, "apple")).await?;
    let outcome =
        tokio::time::timeout(Duration::from_secs(10), client.client_stream_get_order(requests))
            .await?;
    assert!(matches!(outcome, Err(OrderError::DeadlineExceeded)));

    drop(tx);
    drop(client);
    server.stop().await
}

#[tokio::test]
async fn shutdown_cancels_calls_in_flight() -> anyhow::Result<()> {
    let server = TestServer::start(OrderServiceConfig::default()).await?;
    let client = server.client().await?;

    let (tx, requests) = request_channel();
    let mut responses = client.bidi_stream_get_order(requests).await?;
    tx.send(request(1, "cherry")).await?;
    assert!(responses.next().await.unwrap().is_ok());

    server.shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(10), responses.next()).await?;
    assert!(matches!(outcome, Some(Err(OrderError::Cancelled))));

    drop(tx);
    drop(responses);
    drop(client);
    server.stop().await
}
