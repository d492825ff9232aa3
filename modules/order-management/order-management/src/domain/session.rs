//! Per-call state for streaming RPCs.
//!
//! A [`CallContext`] scopes one call: it is cancelled by the caller, by
//! server shutdown, or by the call's deadline. A [`StreamSession`] owns the
//! call's directions: it receives from the inbound stream, sends on the
//! outbound channel, and tracks which halves are closed. Dropping the session
//! drops the outbound sender, which ends the response stream.

use std::time::Duration;

use futures::{Stream, StreamExt};
use order_management_sdk::{OrderError, OrderRequest, OrderResponse};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Outbound half of a streaming call. An `Err` item is the call's final status.
pub type Outbound = mpsc::Sender<Result<OrderResponse, OrderError>>;

/// Response stream handed to the transport.
pub type ResponseReceiver = ReceiverStream<Result<OrderResponse, OrderError>>;

/// How long a failing call waits to hand its final status to a slow reader.
const TERMINAL_STATUS_GRACE: Duration = Duration::from_secs(1);

/// Combine the caller's requested timeout with the server-side limit.
#[must_use]
pub fn effective_timeout(requested: Option<Duration>, limit: Option<Duration>) -> Option<Duration> {
    match (requested, limit) {
        (Some(r), Some(l)) => Some(r.min(l)),
        (r, l) => r.or(l),
    }
}

/// Cancellation and deadline scope of one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Standalone context expiring after `timeout`, if given.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_token(CancellationToken::new(), timeout)
    }

    /// Context cancelled together with `parent` (e.g. server shutdown).
    #[must_use]
    pub fn child_of(parent: &CancellationToken, timeout: Option<Duration>) -> Self {
        Self::with_token(parent.child_token(), timeout)
    }

    fn with_token(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails once the call was cancelled or its deadline passed.
    ///
    /// # Errors
    /// [`OrderError::Cancelled`] or [`OrderError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), OrderError> {
        if self.cancel.is_cancelled() {
            return Err(OrderError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(OrderError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves with the reason once the call is cancelled or expires.
    pub async fn interrupted(&self) -> OrderError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.cancel.cancelled() => OrderError::Cancelled,
                () = tokio::time::sleep_until(deadline) => OrderError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                OrderError::Cancelled
            }
        }
    }
}

/// Counters reported when a session completes normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub received: usize,
    pub sent: usize,
}

/// State of one streaming call.
#[derive(Debug)]
pub struct StreamSession {
    ctx: CallContext,
    outbound: Option<Outbound>,
    inbound_closed: bool,
    received: usize,
    sent: usize,
}

impl StreamSession {
    /// Session of a client-streaming call: inbound only, the single response
    /// is returned by the handler.
    #[must_use]
    pub fn inbound_only(ctx: CallContext) -> Self {
        Self {
            ctx,
            outbound: None,
            inbound_closed: false,
            received: 0,
            sent: 0,
        }
    }

    /// Session with an outbound direction buffered to `buffer` messages.
    /// A full buffer suspends `send` until the transport drains it.
    #[must_use]
    pub fn with_outbound(ctx: CallContext, buffer: usize) -> (Self, ResponseReceiver) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let session = Self {
            ctx,
            outbound: Some(tx),
            inbound_closed: false,
            received: 0,
            sent: 0,
        };
        (session, ReceiverStream::new(rx))
    }

    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    #[must_use]
    pub fn is_inbound_closed(&self) -> bool {
        self.inbound_closed
    }

    /// True when there is no outbound direction left to write to: never
    /// opened, already failed, or the peer stopped reading.
    #[must_use]
    pub fn is_outbound_closed(&self) -> bool {
        self.outbound.as_ref().is_none_or(mpsc::Sender::is_closed)
    }

    /// Next inbound request, or `None` once the caller half-closed.
    ///
    /// # Errors
    /// Transport errors from `inbound`, [`OrderError::Cancelled`] when the call
    /// is cancelled or the peer stopped reading responses, and
    /// [`OrderError::DeadlineExceeded`] when the deadline passes while waiting.
    pub async fn recv<S>(&mut self, inbound: &mut S) -> Result<Option<OrderRequest>, OrderError>
    where
        S: Stream<Item = Result<OrderRequest, OrderError>> + Unpin,
    {
        if self.inbound_closed {
            return Ok(None);
        }

        let item = tokio::select! {
            biased;
            err = self.ctx.interrupted() => return Err(err),
            () = peer_gone(self.outbound.as_ref()) => return Err(OrderError::Cancelled),
            item = inbound.next() => item,
        };

        match item {
            Some(Ok(request)) => {
                self.received += 1;
                Ok(Some(request))
            }
            Some(Err(e)) => Err(e),
            None => {
                self.inbound_closed = true;
                Ok(None)
            }
        }
    }

    /// Send one response, suspending while the outbound buffer is full.
    ///
    /// # Errors
    /// [`OrderError::Cancelled`] if the peer is gone or the call was cancelled,
    /// [`OrderError::DeadlineExceeded`] if the deadline passes while blocked.
    pub async fn send(&mut self, response: OrderResponse) -> Result<(), OrderError> {
        let Some(tx) = self.outbound.as_ref() else {
            return Err(OrderError::Internal(
                "session has no outbound direction".to_owned(),
            ));
        };

        let delivered = tokio::select! {
            biased;
            err = self.ctx.interrupted() => return Err(err),
            result = tx.send(Ok(response)) => result.is_ok(),
        };

        if delivered {
            self.sent += 1;
            Ok(())
        } else {
            Err(OrderError::Cancelled)
        }
    }

    /// Send every response in order, then close the outbound direction.
    ///
    /// # Errors
    /// The first send failure; the caller sees it as the stream's final status.
    pub async fn send_all<I>(mut self, responses: I) -> Result<SessionSummary, OrderError>
    where
        I: IntoIterator<Item = OrderResponse>,
    {
        for response in responses {
            if let Err(e) = self.send(response).await {
                return Err(self.fail(e).await);
            }
        }
        Ok(self.finish())
    }

    /// Terminate the call with `err`: deliver it as the final status when the
    /// peer is still reading, then release the session.
    pub async fn fail(mut self, err: OrderError) -> OrderError {
        if let Some(tx) = self.outbound.take() {
            let delivered =
                tokio::time::timeout(TERMINAL_STATUS_GRACE, tx.send(Err(err.clone()))).await;
            if !matches!(delivered, Ok(Ok(()))) {
                tracing::debug!(error = %err, "final status not delivered to peer");
            }
        }
        tracing::debug!(
            error = %err,
            received = self.received,
            sent = self.sent,
            "stream session failed"
        );
        err
    }

    /// Close the outbound direction normally and report counters.
    #[must_use]
    pub fn finish(self) -> SessionSummary {
        SessionSummary {
            received: self.received,
            sent: self.sent,
        }
    }
}

async fn peer_gone(outbound: Option<&Outbound>) {
    match outbound {
        Some(tx) => tx.closed().await,
        None => std::future::pending().await,
    }
}
