#![allow(unused_crate_dependencies, clippy::panic)]

//! Execute GraphQL requests in tests and assert on their responses,
//! without caring whether they run in-process or over the network.
//!
//! A [`GraphQlTester`] is bound once to either an engine handle
//! ([`GraphQlTester::direct()`]) or an HTTP endpoint
//! ([`GraphQlTester::http()`]). Either way, [`GraphQlTester::query()`]
//! starts a fluent request that produces a [`GraphqlResponse`] for
//! queries and mutations, or a [`GraphqlStreamingResponse`] of
//! per-event responses for subscriptions. Responses are inspected with
//! path-based assertions that fail the test on the first mismatch.

mod error;
mod json_path;
mod request;
mod response;
mod strategy;

use std::{sync::Arc, time::Duration};

use url::Url;

pub use error::{AssertionMismatch, TesterError};
pub use request::{GraphQlRequest, TestRequest};
pub use response::{GraphqlResponse, JsonPathConfig, PathSelection};
pub use strategy::{
    DirectExecution, ExecutionStrategy, GraphQlExecutor, GraphqlStreamingResponse, HttpExecution,
};

const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// The entry point: a tester bound to one way of executing requests.
///
/// ```ignore
/// let tester = GraphQlTester::http("http://localhost:4000/graphql".parse()?)
///     .with_default_header("x-api-key", "test")
///     .build();
///
/// let response = tester.query("{ greeting }").execute().await?;
/// response.path("greeting").is_equal_to("Hello James");
/// ```
pub struct GraphQlTester {
    strategy: Arc<dyn ExecutionStrategy>,
    default_headers: http::HeaderMap,
}

impl GraphQlTester {
    /// A tester invoking `executor` in-process, without a transport.
    pub fn direct(executor: impl GraphQlExecutor + 'static) -> TesterBuilder {
        TesterBuilder::new(Mode::Direct(Arc::new(executor)))
    }

    /// A tester POSTing every request to `url`.
    pub fn http(url: Url) -> TesterBuilder {
        TesterBuilder::new(Mode::Http { url, client: None })
    }

    /// Starts a request for `query`, seeded with the default headers.
    pub fn query(&self, query: impl Into<String>) -> TestRequest {
        TestRequest::new(Arc::clone(&self.strategy), query.into(), self.default_headers.clone())
    }
}

enum Mode {
    Direct(Arc<dyn GraphQlExecutor>),
    Http { url: Url, client: Option<reqwest::Client> },
}

/// Configures and builds a [`GraphQlTester`]. The execution mode is fixed
/// when the builder is created and cannot change afterwards.
#[must_use]
pub struct TesterBuilder {
    mode: Mode,
    response_timeout: Duration,
    default_headers: http::HeaderMap,
    json_path_config: JsonPathConfig,
}

impl TesterBuilder {
    fn new(mode: Mode) -> Self {
        TesterBuilder {
            mode,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            default_headers: http::HeaderMap::new(),
            json_path_config: JsonPathConfig::default(),
        }
    }

    /// Upper bound for any single wait: a response, the opening of a
    /// subscription, or one subscription event. Defaults to five seconds.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Adds a header sent with every request this tester produces. Appends,
    /// so repeated calls with the same name keep every value, and request
    /// builders add theirs on top.
    pub fn with_default_header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        self.default_headers
            .append(name, value.as_ref().parse().expect("a valid header value"));
        self
    }

    /// Merges a whole header map into the defaults, keeping anything
    /// already there.
    pub fn with_default_headers(mut self, headers: http::HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.default_headers.append(name, value.clone());
        }
        self
    }

    pub fn with_json_path_config(mut self, config: JsonPathConfig) -> Self {
        self.json_path_config = config;
        self
    }

    /// Replaces the default HTTP client. Only meaningful for a tester
    /// created with [`GraphQlTester::http()`].
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        if let Mode::Http { client: slot, .. } = &mut self.mode {
            *slot = Some(client);
        }
        self
    }

    pub fn build(self) -> GraphQlTester {
        let strategy: Arc<dyn ExecutionStrategy> = match self.mode {
            Mode::Direct(executor) => Arc::new(DirectExecution::new(
                executor,
                self.response_timeout,
                self.json_path_config,
            )),
            Mode::Http { url, client } => {
                let client = client.unwrap_or_else(|| {
                    reqwest::Client::builder()
                        .connect_timeout(Duration::from_secs(1))
                        .build()
                        .expect("building the default HTTP client")
                });
                Arc::new(HttpExecution::new(
                    client,
                    url,
                    self.response_timeout,
                    self.json_path_config,
                ))
            }
        };
        GraphQlTester {
            strategy,
            default_headers: self.default_headers,
        }
    }
}
