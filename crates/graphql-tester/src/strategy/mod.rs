mod direct;
mod transport;

use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

pub use direct::{DirectExecution, GraphQlExecutor};
use futures::{stream::BoxStream, Stream, StreamExt};
pub use transport::HttpExecution;

use crate::{error::TesterError, request::GraphQlRequest, response::GraphqlResponse};

/// Turns one frozen request into a single response or an event stream.
///
/// Strategies are built once by the tester and shared behind an `Arc` for
/// its lifetime; they hold no mutable state of their own, so sharing one
/// across threads is exactly as safe as the engine or client it wraps.
#[async_trait::async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphqlResponse, TesterError>;

    async fn execute_subscription(
        &self,
        request: GraphQlRequest,
    ) -> Result<GraphqlStreamingResponse, TesterError>;
}

/// A subscription response: the transport headers plus a lazy stream of
/// events in source order.
///
/// Each event is decoded only when pulled. Dropping the value cancels the
/// subscription, taking the engine stream or HTTP connection underneath
/// with it.
pub struct GraphqlStreamingResponse {
    headers: http::HeaderMap,
    events: BoxStream<'static, Result<GraphqlResponse, TesterError>>,
    response_timeout: Duration,
    request: GraphQlRequest,
}

impl GraphqlStreamingResponse {
    pub(crate) fn new(
        headers: http::HeaderMap,
        events: BoxStream<'static, Result<GraphqlResponse, TesterError>>,
        response_timeout: Duration,
        request: GraphQlRequest,
    ) -> Self {
        GraphqlStreamingResponse {
            headers,
            events,
            response_timeout,
            request,
        }
    }

    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Waits for the next event, up to the tester's response timeout. The
    /// plain [`Stream`] impl is untimed; this is the bounded pull.
    pub async fn next_event(&mut self) -> Option<Result<GraphqlResponse, TesterError>> {
        match tokio::time::timeout(self.response_timeout, self.events.next()).await {
            Ok(event) => event,
            Err(_) => Some(Err(TesterError::ResponseTimeout {
                elapsed: self.response_timeout,
                request: Box::new(self.request.clone()),
            })),
        }
    }

    /// Pulls every remaining event; only returns once the source completes.
    pub async fn collect<B: Default + Extend<GraphqlResponse>>(mut self) -> Result<B, TesterError> {
        let mut collected = B::default();
        while let Some(event) = self.next_event().await {
            collected.extend(Some(event?));
        }
        Ok(collected)
    }
}

impl Stream for GraphqlStreamingResponse {
    type Item = Result<GraphqlResponse, TesterError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}
