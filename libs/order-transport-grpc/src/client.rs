//! Client-side channel setup.
//!
//! A [`GrpcClientConfig`] carries everything a caller decides about its
//! connection: how long to wait for the server, whether to ping an idle
//! connection, and the deadline every call is sent with. The deadline travels
//! as `grpc-timeout`, so the server is the one that enforces it.

use std::time::{Duration, Instant};

use anyhow::Context;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

/// HTTP/2 keepalive pings on an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    /// Delay between PING frames, also used for TCP keepalive.
    pub interval: Duration,
    /// How long an unanswered PING may stay outstanding before the
    /// connection is dropped.
    pub timeout: Duration,
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Connection and call settings of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcClientConfig {
    /// Service the channel talks to, recorded on the connect span.
    pub service_name: &'static str,
    /// Time allowed to establish the connection.
    pub connect_timeout: Duration,
    /// Deadline attached to every call; `None` sends calls without one.
    pub call_timeout: Option<Duration>,
    /// `None` sends no keepalive pings.
    pub keepalive: Option<KeepAlive>,
}

impl GrpcClientConfig {
    #[must_use]
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            connect_timeout: Duration::from_secs(10),
            call_timeout: None,
            keepalive: Some(KeepAlive::default()),
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_keepalive(mut self, keepalive: Option<KeepAlive>) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Stamp `request` with this client's call deadline.
    pub fn apply_deadline<T>(&self, request: &mut tonic::Request<T>) {
        if let Some(timeout) = self.call_timeout {
            request.set_timeout(timeout);
        }
    }

    fn endpoint(&self, uri: &str) -> Result<Endpoint, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(uri.to_owned())?.connect_timeout(self.connect_timeout);
        Ok(match self.keepalive {
            Some(ka) => endpoint
                .tcp_keepalive(Some(ka.interval))
                .http2_keep_alive_interval(ka.interval)
                .keep_alive_timeout(ka.timeout)
                .keep_alive_while_idle(true),
            None => endpoint,
        })
    }
}

/// Open a channel to `uri` with the settings in `cfg`.
///
/// # Errors
/// Returns an error if `uri` is not a valid URI or the server cannot be
/// reached within `connect_timeout`.
pub async fn connect(uri: &str, cfg: &GrpcClientConfig) -> anyhow::Result<Channel> {
    let endpoint = cfg
        .endpoint(uri)
        .with_context(|| format!("invalid server address '{uri}'"))?;

    let span = tracing::debug_span!("grpc_connect", service = cfg.service_name, %uri);
    let started = Instant::now();
    let channel = endpoint
        .connect()
        .instrument(span)
        .await
        .with_context(|| format!("failed to connect to {uri}"))?;

    tracing::debug!(
        service = cfg.service_name,
        %uri,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        call_timeout = ?cfg.call_timeout,
        "gRPC channel ready"
    );
    Ok(channel)
}
