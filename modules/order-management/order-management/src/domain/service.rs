//! Domain service for order management
//!
//! One operation, "find catalog items matching a requested name", behind the
//! four interaction patterns. Streaming variants run on their own task and
//! report through a [`StreamingCall`].

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::Stream;
use order_management_sdk::{OrderError, OrderRequest, OrderResponse};
use tokio::sync::oneshot;
use tracing::{Instrument, Span, debug, info};

use super::catalog::Catalog;
use super::session::{CallContext, ResponseReceiver, SessionSummary, StreamSession};

/// Outbound half of a running streaming call plus its completion signal.
pub struct StreamingCall {
    pub responses: ResponseReceiver,
    pub completion: CallCompletion,
}

/// Fires once the call's task is done: inbound fully drained and the last
/// response handed to the transport, or the error that ended the call.
#[derive(Debug)]
pub struct CallCompletion(oneshot::Receiver<Result<SessionSummary, OrderError>>);

impl CallCompletion {
    /// Wait for the call to finish.
    ///
    /// # Errors
    /// The error that terminated the call.
    pub async fn wait(self) -> Result<SessionSummary, OrderError> {
        self.0.await.unwrap_or_else(|_| {
            Err(OrderError::Internal(
                "order stream task ended without reporting".to_owned(),
            ))
        })
    }
}

/// Stateless order service over a shared catalog.
#[derive(Clone)]
pub struct Service {
    catalog: Arc<dyn Catalog>,
}

impl Service {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// First match for the requested name.
    ///
    /// # Errors
    /// [`OrderError::NotFound`] when the catalog has no match.
    pub fn unary_get_order(&self, request: &OrderRequest) -> Result<OrderResponse, OrderError> {
        log_received(request);
        self.search(request)
            .into_iter()
            .next()
            .map(|item| respond(request.order_id, item))
            .ok_or_else(|| OrderError::not_found(&request.order_name))
    }

    /// Stream every match for the requested name, in catalog order.
    ///
    /// The lookup happens before anything is streamed: a name with no match
    /// fails the call without opening the response stream.
    ///
    /// # Errors
    /// [`OrderError::NotFound`] when the catalog has no match, or the context's
    /// error if the call already ended.
    pub fn server_stream_get_order(
        &self,
        request: &OrderRequest,
        ctx: CallContext,
        buffer: usize,
    ) -> Result<StreamingCall, OrderError> {
        log_received(request);
        ctx.check()?;

        let matches = self.search(request);
        if matches.is_empty() {
            return Err(OrderError::not_found(&request.order_name));
        }

        let order_id = request.order_id;
        let (session, responses) = StreamSession::with_outbound(ctx, buffer);
        let completion = spawn_call(session.send_all(
            matches.into_iter().map(move |item| respond(order_id, item)),
        ));

        Ok(StreamingCall {
            responses,
            completion,
        })
    }

    /// Drain every request, then answer with the first one that matches.
    ///
    /// Requests are looked up in receipt order; names without a match are
    /// skipped. The response echoes the id of the request that matched.
    ///
    /// # Errors
    /// [`OrderError::NotFound`] when no request was received or none matched;
    /// receive failures and cancellation end the call with their own error.
    pub async fn client_stream_get_order<S>(
        &self,
        mut session: StreamSession,
        mut inbound: S,
    ) -> Result<OrderResponse, OrderError>
    where
        S: Stream<Item = Result<OrderRequest, OrderError>> + Unpin,
    {
        let mut pending = Vec::new();
        while let Some(request) = session.recv(&mut inbound).await? {
            log_received(&request);
            pending.push(request);
        }

        if pending.is_empty() {
            return Err(OrderError::NotFound("no orders received".to_owned()));
        }

        for request in &pending {
            session.context().check()?;
            match self.search(request).into_iter().next() {
                Some(item) => {
                    let summary = session.finish();
                    debug!(
                        order_id = request.order_id,
                        received = summary.received,
                        "client stream matched"
                    );
                    return Ok(respond(request.order_id, item));
                }
                None => debug!(
                    order_id = request.order_id,
                    order_name = %request.order_name,
                    "no catalog match, skipping"
                ),
            }
        }

        Err(OrderError::NotFound(format!(
            "none of {} received orders matches the catalog",
            pending.len()
        )))
    }

    /// Answer each request as it arrives while the caller keeps sending.
    ///
    /// Returns immediately; a spawned task reads requests and writes the
    /// matches for each before reading the next. A request with no match ends
    /// the whole call with [`OrderError::NotFound`].
    #[must_use]
    pub fn bidi_stream_get_order<S>(
        &self,
        inbound: S,
        ctx: CallContext,
        buffer: usize,
    ) -> StreamingCall
    where
        S: Stream<Item = Result<OrderRequest, OrderError>> + Unpin + Send + 'static,
    {
        let (session, responses) = StreamSession::with_outbound(ctx, buffer);
        let service = self.clone();
        let completion =
            spawn_call(async move { service.drive_conversation(session, inbound).await });

        StreamingCall {
            responses,
            completion,
        }
    }

    async fn drive_conversation<S>(
        &self,
        mut session: StreamSession,
        mut inbound: S,
    ) -> Result<SessionSummary, OrderError>
    where
        S: Stream<Item = Result<OrderRequest, OrderError>> + Unpin,
    {
        loop {
            let request = match session.recv(&mut inbound).await {
                Ok(Some(request)) => request,
                Ok(None) => break,
                Err(e) => return Err(session.fail(e).await),
            };
            log_received(&request);

            if let Err(e) = session.context().check() {
                return Err(session.fail(e).await);
            }

            let matches = self.search(&request);
            if matches.is_empty() {
                let err = OrderError::not_found(&request.order_name);
                return Err(session.fail(err).await);
            }

            for item in matches {
                if let Err(e) = session.send(respond(request.order_id, item)).await {
                    return Err(session.fail(e).await);
                }
            }
        }

        Ok(session.finish())
    }

    fn search(&self, request: &OrderRequest) -> Vec<String> {
        let matches = self.catalog.search(&request.order_name);
        debug!(order_id = request.order_id, matches = matches.len(), "catalog lookup");
        matches
    }
}

fn spawn_call<F>(call: F) -> CallCompletion
where
    F: Future<Output = Result<SessionSummary, OrderError>> + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(
        async move {
            if done_tx.send(call.await).is_err() {
                debug!("nobody waiting for call completion");
            }
        }
        .instrument(Span::current()),
    );
    CallCompletion(done_rx)
}

fn log_received(request: &OrderRequest) {
    info!(
        order_id = request.order_id,
        order_name = %request.order_name,
        "Received order"
    );
}

fn respond(order_id: i32, order_name: String) -> OrderResponse {
    OrderResponse {
        order_id,
        order_name,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    use super::*;
    use crate::domain::catalog::InMemoryCatalog;

    fn service() -> Service {
        Service::new(Arc::new(InMemoryCatalog::default()))
    }

    fn request(order_id: i32, order_name: &str) -> OrderRequest {
        OrderRequest {
            order_id,
            order_name: order_name.to_owned(),
        }
    }

    fn inbound_channel() -> (
        mpsc::Sender<OrderRequest>,
        impl Stream<Item = Result<OrderRequest, OrderError>> + Unpin + Send + 'static,
    ) {
        let (tx, rx) = mpsc::channel(8);
        (tx, ReceiverStream::new(rx).map(Ok::<_, OrderError>))
    }

    fn names(responses: &[Result<OrderResponse, OrderError>]) -> Vec<String> {
        responses
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|r| r.order_name.clone())
            .collect()
    }

    #[derive(Default)]
    struct CountingCatalog {
        inner: InMemoryCatalog,
        lookups: AtomicUsize,
    }

    impl Catalog for CountingCatalog {
        fn search(&self, query: &str) -> Vec<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.search(query)
        }
    }

    #[test]
    fn unary_returns_first_match() {
        let response = service().unary_get_order(&request(42, "apple")).unwrap();
        assert_eq!(response.order_id, 42);
        assert_eq!(response.order_name, "apple");
        assert!(response.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
    }

    #[test]
    fn unary_without_match_is_not_found() {
        let err = service().unary_get_order(&request(1, "zzz-no-match")).unwrap_err();
        assert_eq!(err, OrderError::not_found("zzz-no-match"));
    }

    #[test]
    fn repeated_unary_keeps_match_and_advances_timestamp() {
        let service = service();
        let first = service.unary_get_order(&request(3, "banana")).unwrap();
        let second = service.unary_get_order(&request(3, "banana")).unwrap();

        assert_eq!(first.order_name, second.order_name);
        let t1 = chrono::DateTime::parse_from_rfc3339(&first.timestamp).unwrap();
        let t2 = chrono::DateTime::parse_from_rfc3339(&second.timestamp).unwrap();
        assert!(t1 <= t2);
    }

    #[tokio::test]
    async fn server_stream_emits_every_match_then_ends() {
        let call = service()
            .server_stream_get_order(&request(7, "juice"), CallContext::new(None), 1)
            .unwrap();
        let responses: Vec<_> = call.responses.collect().await;

        assert_eq!(names(&responses), vec!["apple juice", "orange juice"]);
        assert!(responses.iter().all(|r| r.as_ref().unwrap().order_id == 7));
        assert_eq!(
            call.completion.wait().await,
            Ok(SessionSummary { received: 0, sent: 2 })
        );
    }

    #[tokio::test]
    async fn server_stream_dropped_mid_stream_cancels_the_call() {
        let mut call = service()
            .server_stream_get_order(&request(9, "apple"), CallContext::new(None), 1)
            .unwrap();

        let first = call.responses.next().await.unwrap().unwrap();
        assert_eq!(first.order_name, "apple");
        drop(call.responses);

        assert_eq!(call.completion.wait().await, Err(OrderError::Cancelled));
    }

    #[tokio::test]
    async fn server_stream_without_match_fails_before_streaming() {
        let result = service().server_stream_get_order(
            &request(1, "zzz-no-match"),
            CallContext::new(None),
            4,
        );
        assert!(matches!(result, Err(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn server_stream_on_cancelled_call_does_no_lookup() {
        let catalog = Arc::new(CountingCatalog::default());
        let service = Service::new(catalog.clone());
        let ctx = CallContext::new(None);
        ctx.cancel();

        let result = service.server_stream_get_order(&request(1, "apple"), ctx, 4);
        assert!(matches!(result, Err(OrderError::Cancelled)));
        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn client_stream_echoes_id_of_matching_request() {
        let inbound = futures::stream::iter(vec![
            Ok(request(1, "zzz-no-match")),
            Ok(request(2, "banana")),
            Ok(request(3, "apple")),
        ]);
        let session = StreamSession::inbound_only(CallContext::new(None));

        let response = service()
            .client_stream_get_order(session, inbound)
            .await
            .unwrap();
        assert_eq!(response.order_id, 2);
        assert_eq!(response.order_name, "banana");
    }

    #[tokio::test]
    async fn client_stream_with_no_requests_is_not_found() {
        let inbound = futures::stream::iter(Vec::<Result<OrderRequest, OrderError>>::new());
        let session = StreamSession::inbound_only(CallContext::new(None));

        let err = service()
            .client_stream_get_order(session, inbound)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn client_stream_with_no_matching_name_is_not_found() {
        let inbound = futures::stream::iter(vec![Ok(request(1, "xyz")), Ok(request(2, "qqq"))]);
        let session = StreamSession::inbound_only(CallContext::new(None));

        let err = service()
            .client_stream_get_order(session, inbound)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn client_stream_receive_failure_is_fatal() {
        let inbound = futures::stream::iter(vec![
            Ok(request(1, "apple")),
            Err(OrderError::Transport("stream reset".to_owned())),
        ]);
        let session = StreamSession::inbound_only(CallContext::new(None));

        let err = service()
            .client_stream_get_order(session, inbound)
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::Transport("stream reset".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn client_stream_waiting_past_deadline_fails() {
        let (_tx, inbound) = inbound_channel();
        let ctx = CallContext::new(Some(Duration::from_secs(1)));
        let session = StreamSession::inbound_only(ctx);

        let err = service()
            .client_stream_get_order(session, inbound)
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn bidi_answers_before_next_request_is_sent() {
        let (tx, inbound) = inbound_channel();
        let mut call = service().bidi_stream_get_order(inbound, CallContext::new(None), 4);

        tx.send(request(1, "cherry")).await.unwrap();
        let first = call.responses.next().await.unwrap().unwrap();
        assert_eq!((first.order_id, first.order_name.as_str()), (1, "cherry tart"));

        tx.send(request(2, "banana")).await.unwrap();
        let a = call.responses.next().await.unwrap().unwrap();
        let b = call.responses.next().await.unwrap().unwrap();
        assert_eq!(a.order_name, "banana");
        assert_eq!(b.order_name, "banana bread");
        assert_eq!(b.order_id, 2);

        drop(tx);
        assert!(call.responses.next().await.is_none());
        assert_eq!(
            call.completion.wait().await,
            Ok(SessionSummary { received: 2, sent: 3 })
        );
    }

    #[tokio::test]
    async fn bidi_unmatched_request_ends_the_call() {
        let (tx, inbound) = inbound_channel();
        let call = service().bidi_stream_get_order(inbound, CallContext::new(None), 4);

        tx.send(request(1, "orange")).await.unwrap();
        tx.send(request(2, "zzz-no-match")).await.unwrap();
        // The call may already be over by now.
        let _ = tx.send(request(3, "apple")).await;

        let responses: Vec<_> = call.responses.collect().await;
        assert_eq!(names(&responses), vec!["orange", "orange juice"]);
        assert_eq!(
            responses.last(),
            Some(&Err(OrderError::not_found("zzz-no-match")))
        );
        assert!(call.completion.wait().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn bidi_unmatched_first_request_yields_no_response() {
        let (tx, inbound) = inbound_channel();
        let call = service().bidi_stream_get_order(inbound, CallContext::new(None), 4);
        tx.send(request(1, "zzz-no-match")).await.unwrap();

        let responses: Vec<_> = call.responses.collect().await;
        assert_eq!(responses, vec![Err(OrderError::not_found("zzz-no-match"))]);
        assert!(call.completion.wait().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn bidi_dropped_response_stream_cancels_the_call() {
        let (tx, inbound) = inbound_channel();
        let call = service().bidi_stream_get_order(inbound, CallContext::new(None), 4);
        drop(call.responses);

        assert_eq!(call.completion.wait().await, Err(OrderError::Cancelled));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn bidi_cancelled_call_performs_no_lookup() {
        let catalog = Arc::new(CountingCatalog::default());
        let service = Service::new(catalog.clone());
        let (tx, inbound) = inbound_channel();
        let ctx = CallContext::new(None);
        let call = service.bidi_stream_get_order(inbound, ctx.clone(), 4);

        ctx.cancel();
        // The reader may or may not see this request; either way it must not
        // reach the catalog.
        let _ = tx.send(request(1, "apple")).await;

        assert_eq!(call.completion.wait().await, Err(OrderError::Cancelled));
        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
    }
}
