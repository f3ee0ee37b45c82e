//! Mock GraphQL engines and servers for exercising the tester without a
//! production backend.

mod echo;
mod greetings;
mod pending;

use std::{sync::Arc, time::Duration};

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::post,
    Router,
};
use futures::{stream::BoxStream, StreamExt};
use graphql_tester::GraphQlExecutor;
use http::HeaderMap;

pub use {
    echo::{echo_schema, EchoSchema},
    greetings::{greetings_schema, GreetingsSchema},
    pending::{pending_schema, PendingSchema},
};

/// Object-safe wrapper over an async-graphql schema, so servers and
/// executors don't have to be generic over the query, mutation and
/// subscription types.
#[async_trait::async_trait]
pub trait Schema: Send + Sync {
    async fn execute(&self, request: async_graphql::Request) -> async_graphql::Response;

    fn execute_stream(
        &self,
        request: async_graphql::Request,
    ) -> BoxStream<'static, async_graphql::Response>;
}

#[async_trait::async_trait]
impl<Q, M, S> Schema for async_graphql::Schema<Q, M, S>
where
    Q: async_graphql::ObjectType + 'static,
    M: async_graphql::ObjectType + 'static,
    S: async_graphql::SubscriptionType + 'static,
{
    async fn execute(&self, request: async_graphql::Request) -> async_graphql::Response {
        async_graphql::Schema::execute(self, request).await
    }

    fn execute_stream(
        &self,
        request: async_graphql::Request,
    ) -> BoxStream<'static, async_graphql::Response> {
        Box::pin(async_graphql::Schema::execute_stream(self, request))
    }
}

/// The transport headers of the request being executed, available to
/// resolvers through the context data.
pub struct RequestHeaders(Vec<(String, String)>);

impl RequestHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.all(name).into_iter().next()
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            )
        })
        .collect()
}

fn into_engine_request(request: graphql_tester::GraphQlRequest) -> async_graphql::Request {
    let headers = RequestHeaders(header_pairs(&request.headers));
    let mut engine_request = async_graphql::Request::new(request.query)
        .variables(async_graphql::Variables::from_json(serde_json::Value::Object(
            request.variables,
        )))
        .data(headers);
    if let Some(operation_name) = request.operation_name {
        engine_request = engine_request.operation_name(operation_name);
    }
    engine_request
}

/// Adapts a [`Schema`] into the tester's in-process engine capability.
#[derive(Clone)]
pub struct SchemaExecutor(Arc<dyn Schema>);

impl SchemaExecutor {
    pub fn new(schema: impl Schema + 'static) -> Self {
        SchemaExecutor(Arc::new(schema))
    }
}

#[async_trait::async_trait]
impl GraphQlExecutor for SchemaExecutor {
    async fn execute(&self, request: graphql_tester::GraphQlRequest) -> serde_json::Value {
        let response = self.0.execute(into_engine_request(request)).await;
        serde_json::to_value(response).expect("an execution result to serialize")
    }

    fn execute_stream(
        &self,
        request: graphql_tester::GraphQlRequest,
    ) -> BoxStream<'static, serde_json::Value> {
        self.0
            .execute_stream(into_engine_request(request))
            .map(|response| serde_json::to_value(response).expect("an execution result to serialize"))
            .boxed()
    }
}

/// A GraphQL server on an ephemeral local port.
///
/// Answers JSON POSTs on `/`, and streams subscription results as
/// server-sent events when the request asks for `text/event-stream`.
/// Shuts down when dropped.
pub struct MockGraphQlServer {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    port: u16,
}

impl Drop for MockGraphQlServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
    }
}

impl MockGraphQlServer {
    pub async fn new(schema: impl Schema + 'static) -> MockGraphQlServer {
        Self::new_impl(Arc::new(schema)).await
    }

    async fn new_impl(schema: Arc<dyn Schema>) -> Self {
        let state = AppState { schema };
        let app = Router::new().route("/", post(graphql_handler)).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (shutdown_sender, shutdown_receiver) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_receiver.await.ok();
                })
                .await
                .unwrap();
        });

        // Give the server time to start
        tokio::time::sleep(Duration::from_millis(20)).await;

        MockGraphQlServer {
            shutdown: Some(shutdown_sender),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[derive(Clone)]
struct AppState {
    schema: Arc<dyn Schema>,
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> Response {
    let wants_event_stream = headers
        .get(http::header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"));

    let request = request
        .into_inner()
        .data(RequestHeaders(header_pairs(&headers)));

    if wants_event_stream {
        let events = state
            .schema
            .execute_stream(request)
            .map(|response| Event::default().event("next").json_data(&response))
            .chain(futures::stream::once(async {
                // The SSE spec drops events with an empty data buffer, so
                // complete carries an explicit null.
                Ok(Event::default().event("complete").data("null"))
            }));
        return Sse::new(events).into_response();
    }

    let response: GraphQLResponse = state.schema.execute(request).await.into();
    response.into_response()
}
