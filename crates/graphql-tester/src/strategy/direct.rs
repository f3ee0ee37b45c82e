use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{stream::BoxStream, StreamExt};

use crate::{
    error::TesterError,
    request::GraphQlRequest,
    response::{GraphqlResponse, JsonPathConfig},
    strategy::{ExecutionStrategy, GraphqlStreamingResponse},
};

/// The in-process execution engine capability.
///
/// The engine receives the full frozen request, headers included, and
/// produces raw execution results in the standard `{"data", "errors"}`
/// shape. `execute_stream` is only called for subscription operations; the
/// returned stream may be infinite and must stop doing work when dropped.
#[async_trait::async_trait]
pub trait GraphQlExecutor: Send + Sync {
    async fn execute(&self, request: GraphQlRequest) -> serde_json::Value;

    fn execute_stream(&self, request: GraphQlRequest) -> BoxStream<'static, serde_json::Value>;
}

/// Executes requests against an engine in-process, without a transport.
pub struct DirectExecution {
    executor: Arc<dyn GraphQlExecutor>,
    response_timeout: Duration,
    config: JsonPathConfig,
}

impl DirectExecution {
    pub(crate) fn new(
        executor: Arc<dyn GraphQlExecutor>,
        response_timeout: Duration,
        config: JsonPathConfig,
    ) -> Self {
        DirectExecution {
            executor,
            response_timeout,
            config,
        }
    }
}

#[async_trait::async_trait]
impl ExecutionStrategy for DirectExecution {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphqlResponse, TesterError> {
        tracing::debug!(query = %request.query, "executing in-process");
        let started = Instant::now();
        let execution = self.executor.execute(request.clone());
        match tokio::time::timeout(self.response_timeout, execution).await {
            Ok(body) => Ok(GraphqlResponse::new(body, http::HeaderMap::new(), self.config)),
            Err(_) => Err(TesterError::ResponseTimeout {
                elapsed: started.elapsed(),
                request: Box::new(request),
            }),
        }
    }

    async fn execute_subscription(
        &self,
        request: GraphQlRequest,
    ) -> Result<GraphqlStreamingResponse, TesterError> {
        tracing::debug!(query = %request.query, "subscribing in-process");
        let config = self.config;
        let events = self
            .executor
            .execute_stream(request.clone())
            .map(move |body| Ok(GraphqlResponse::new(body, http::HeaderMap::new(), config)))
            .boxed();
        Ok(GraphqlStreamingResponse::new(
            http::HeaderMap::new(),
            events,
            self.response_timeout,
            request,
        ))
    }
}
