//! Hosting tonic routes on a TCP listener.
//!
//! The caller binds the listener (so it knows the bound address, including
//! ephemeral ports) and owns the cancellation token that drives graceful
//! shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::service::Routes;
use tonic::transport::Server;

/// Bind a TCP listener for the gRPC server.
///
/// `"0.0.0.0:0"` and `"127.0.0.1:0"` pick an ephemeral port; read it back with
/// [`TcpListener::local_addr`].
///
/// # Errors
/// Returns an error if the address cannot be parsed or bound.
pub async fn bind_tcp(listen_addr: &str) -> anyhow::Result<TcpListener> {
    let addr = listen_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid listen_addr '{listen_addr}'"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind gRPC listener at {addr}"))?;
    Ok(listener)
}

/// Serve `routes` on `listener` until `cancel` fires.
///
/// In-flight calls are allowed to finish once shutdown starts; new
/// connections are refused.
///
/// # Errors
/// Returns an error if the server fails while accepting or serving connections.
pub async fn serve_routes(
    listener: TcpListener,
    routes: Routes,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bound_addr = listener.local_addr()?;
    tracing::info!(%bound_addr, transport = "tcp", "gRPC server listening");

    let incoming = TcpListenerStream::new(listener);
    Server::builder()
        .add_routes(routes)
        .serve_with_incoming_shutdown(incoming, async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!(%bound_addr, "gRPC server stopped");
    Ok(())
}
