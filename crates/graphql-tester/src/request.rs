use std::{future::IntoFuture, sync::Arc};

use futures::future::BoxFuture;
use http::HeaderMap;

use crate::{
    error::TesterError,
    response::GraphqlResponse,
    strategy::{ExecutionStrategy, GraphqlStreamingResponse},
};

/// One frozen GraphQL request: the wire body plus the transport headers.
///
/// Serializes to the canonical `{"query", "operationName", "variables"}`
/// map; headers ride the transport, never the body.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub headers: HeaderMap,
}

/// A request under construction, created by [`GraphQlTester::query()`].
///
/// Freezes into a [`GraphQlRequest`] on `execute`/`execute_subscription`
/// and hands it to the tester's strategy. Awaiting the builder directly is
/// shorthand for `execute()`.
///
/// [`GraphQlTester::query()`]: crate::GraphQlTester::query
#[must_use]
pub struct TestRequest {
    strategy: Arc<dyn ExecutionStrategy>,
    query: String,
    operation_name: Option<String>,
    variables: serde_json::Map<String, serde_json::Value>,
    headers: HeaderMap,
}

impl TestRequest {
    pub(crate) fn new(strategy: Arc<dyn ExecutionStrategy>, query: String, default_headers: HeaderMap) -> Self {
        TestRequest {
            strategy,
            query,
            operation_name: None,
            variables: serde_json::Map::new(),
            headers: default_headers,
        }
    }

    /// Sets one variable. Setting the same name again overwrites the value,
    /// distinct names keep their insertion order in the serialized body.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replaces the whole variable map with anything serializing to a JSON
    /// object.
    pub fn variables(mut self, variables: impl serde::Serialize) -> Self {
        match serde_json::to_value(variables).expect("variables to be serializable") {
            serde_json::Value::Object(map) => self.variables = map,
            other => panic!("variables must serialize to an object, got {other}"),
        }
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Appends a header. Values already present under `name`, including the
    /// tester's default headers, are kept.
    pub fn header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        self.headers.append(name, value.as_ref().parse().expect("a valid header value"));
        self
    }

    fn freeze(self) -> Result<(Arc<dyn ExecutionStrategy>, GraphQlRequest), TesterError> {
        if self.query.trim().is_empty() {
            return Err(TesterError::MissingQuery);
        }
        let request = GraphQlRequest {
            query: self.query,
            operation_name: self.operation_name,
            variables: self.variables,
            headers: self.headers,
        };
        Ok((self.strategy, request))
    }

    /// Executes the request, expecting a single response.
    pub async fn execute(self) -> Result<GraphqlResponse, TesterError> {
        let (strategy, request) = self.freeze()?;
        strategy.execute(request).await
    }

    /// Executes the request as a subscription, yielding a lazy event
    /// stream.
    pub async fn execute_subscription(self) -> Result<GraphqlStreamingResponse, TesterError> {
        let (strategy, request) = self.freeze()?;
        strategy.execute_subscription(request).await
    }
}

impl IntoFuture for TestRequest {
    type Output = Result<GraphqlResponse, TesterError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}
