use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http::header;
use url::Url;

use crate::{
    error::TesterError,
    request::GraphQlRequest,
    response::{GraphqlResponse, JsonPathConfig},
    strategy::{ExecutionStrategy, GraphqlStreamingResponse},
};

/// Executes requests through a real HTTP round-trip against a fixed
/// endpoint.
pub struct HttpExecution {
    client: reqwest::Client,
    url: Url,
    response_timeout: Duration,
    config: JsonPathConfig,
}

impl HttpExecution {
    pub(crate) fn new(
        client: reqwest::Client,
        url: Url,
        response_timeout: Duration,
        config: JsonPathConfig,
    ) -> Self {
        HttpExecution {
            client,
            url,
            response_timeout,
            config,
        }
    }

    fn post(&self, request: &GraphQlRequest, accept: &mime::Mime) -> reqwest::RequestBuilder {
        self.client
            .post(self.url.clone())
            .headers(request.headers.clone())
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .header(header::ACCEPT, accept.as_ref())
            .json(request)
    }
}

#[async_trait::async_trait]
impl ExecutionStrategy for HttpExecution {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphqlResponse, TesterError> {
        tracing::debug!(url = %self.url, query = %request.query, "posting request");
        let started = Instant::now();

        let response = self
            .post(&request, &mime::APPLICATION_JSON)
            .timeout(self.response_timeout)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                return Err(TesterError::ResponseTimeout {
                    elapsed: started.elapsed(),
                    request: Box::new(request),
                })
            }
            Err(error) => return Err(error.into()),
        };

        expect_success(&response)?;
        expect_content_type(&response, &mime::APPLICATION_JSON)?;

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = decode_json(&bytes)?;
        Ok(GraphqlResponse::new(body, headers, self.config))
    }

    async fn execute_subscription(
        &self,
        request: GraphQlRequest,
    ) -> Result<GraphqlStreamingResponse, TesterError> {
        tracing::debug!(url = %self.url, query = %request.query, "subscribing over SSE");
        let started = Instant::now();

        // No request-level timeout here: the stream outlives it by design.
        // The bound applies to opening the exchange and to each pull.
        let exchange = self.post(&request, &mime::TEXT_EVENT_STREAM).send();
        let response = match tokio::time::timeout(self.response_timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => return Err(error.into()),
            Err(_) => {
                return Err(TesterError::ResponseTimeout {
                    elapsed: started.elapsed(),
                    request: Box::new(request),
                })
            }
        };

        expect_success(&response)?;
        expect_content_type(&response, &mime::TEXT_EVENT_STREAM)?;

        let headers = response.headers().clone();
        let config = self.config;

        let bytes = response
            .bytes_stream()
            .map(|result: Result<Bytes, reqwest::Error>| result.map_err(std::io::Error::other))
            .boxed();
        let events = async_sse::decode(bytes.into_async_read())
            .into_stream()
            .try_take_while(|event| {
                let take = match event {
                    async_sse::Event::Message(message) => message.name() != "complete",
                    async_sse::Event::Retry(_) => true,
                };
                futures::future::ready(Ok(take))
            })
            .filter_map(move |event| {
                futures::future::ready(match event {
                    Ok(async_sse::Event::Message(message)) => Some(
                        decode_json(message.data())
                            .map(|body| GraphqlResponse::new(body, http::HeaderMap::new(), config)),
                    ),
                    Ok(async_sse::Event::Retry(_)) => None,
                    Err(error) => Some(Err(TesterError::Decode {
                        reason: error.to_string(),
                        snippet: String::new(),
                    })),
                })
            })
            .boxed();

        Ok(GraphqlStreamingResponse::new(
            headers,
            events,
            self.response_timeout,
            request,
        ))
    }
}

fn expect_success(response: &reqwest::Response) -> Result<(), TesterError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(TesterError::Transport {
        status: response.status(),
        headers: response.headers().clone(),
        reason: "expected a success status".to_string(),
    })
}

fn expect_content_type(response: &reqwest::Response, expected: &mime::Mime) -> Result<(), TesterError> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok());
    match content_type {
        Some(mime) if mime.essence_str() == expected.essence_str() => Ok(()),
        other => Err(TesterError::Transport {
            status: response.status(),
            headers: response.headers().clone(),
            reason: match other {
                Some(mime) => format!("expected a {expected} response, got {mime}"),
                None => format!("expected a {expected} response, got no content type"),
            },
        }),
    }
}

fn decode_json(bytes: &[u8]) -> Result<serde_json::Value, TesterError> {
    serde_json::from_slice(bytes).map_err(|error| TesterError::Decode {
        reason: error.to_string(),
        snippet: snippet(bytes),
    })
}

fn snippet(bytes: &[u8]) -> String {
    const MAX_CHARS: usize = 256;
    String::from_utf8_lossy(bytes).chars().take(MAX_CHARS).collect()
}
