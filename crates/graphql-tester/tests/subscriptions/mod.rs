use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{stream::BoxStream, StreamExt};
use graphql_mocks::{greetings_schema, MockGraphQlServer, SchemaExecutor};
use graphql_tester::{GraphQlExecutor, GraphQlRequest, GraphQlTester, GraphqlResponse, TesterError};

use crate::runtime;

const QUERY: &str = "subscription { greetings }";

#[test]
fn events_arrive_in_source_order() {
    runtime().block_on(async {
        let tester = GraphQlTester::direct(SchemaExecutor::new(greetings_schema())).build();

        let mut stream = tester.query(QUERY).execute_subscription().await.unwrap();

        let mut seen = Vec::new();
        while let Some(event) = stream.next_event().await {
            seen.push(event.unwrap().path("greetings").entity::<String>());
        }
        assert_eq!(
            seen,
            ["Hi James", "Bonjour James", "Hola James", "Ciao James", "Zdravo James"]
        );
    });
}

#[test]
fn sse_subscriptions_match_direct_execution() {
    runtime().block_on(async {
        let server = MockGraphQlServer::new(greetings_schema()).await;
        let over_http = GraphQlTester::http(server.url().parse().unwrap()).build();
        let in_process = GraphQlTester::direct(SchemaExecutor::new(greetings_schema())).build();

        let stream = over_http.query(QUERY).execute_subscription().await.unwrap();
        assert_eq!(
            stream.headers()[http::header::CONTENT_TYPE].to_str().unwrap(),
            "text/event-stream"
        );
        let from_http = into_bodies(stream.collect().await.unwrap());

        let stream = in_process.query(QUERY).execute_subscription().await.unwrap();
        let from_engine = into_bodies(stream.collect().await.unwrap());

        assert_eq!(from_http, from_engine);
        insta::assert_json_snapshot!(from_http, @r###"
        [
          {
            "data": {
              "greetings": "Hi James"
            }
          },
          {
            "data": {
              "greetings": "Bonjour James"
            }
          },
          {
            "data": {
              "greetings": "Hola James"
            }
          },
          {
            "data": {
              "greetings": "Ciao James"
            }
          },
          {
            "data": {
              "greetings": "Zdravo James"
            }
          }
        ]
        "###);
    });
}

fn into_bodies(events: Vec<GraphqlResponse>) -> Vec<serde_json::Value> {
    events.into_iter().map(GraphqlResponse::into_body).collect()
}

struct GuardedSource {
    cancelled: Arc<AtomicBool>,
}

struct Guard(Arc<AtomicBool>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl GraphQlExecutor for GuardedSource {
    async fn execute(&self, _request: GraphQlRequest) -> serde_json::Value {
        serde_json::json!({"data": null})
    }

    fn execute_stream(&self, _request: GraphQlRequest) -> BoxStream<'static, serde_json::Value> {
        let guard = Guard(self.cancelled.clone());
        futures::stream::repeat_with(move || {
            let _held = &guard;
            serde_json::json!({"data": {"tick": 1}})
        })
        .boxed()
    }
}

#[test]
fn abandoning_a_subscription_releases_the_source() {
    runtime().block_on(async {
        let cancelled = Arc::new(AtomicBool::new(false));
        let tester = GraphQlTester::direct(GuardedSource {
            cancelled: cancelled.clone(),
        })
        .build();

        let mut stream = tester.query("subscription { tick }").execute_subscription().await.unwrap();
        for _ in 0..2 {
            stream.next_event().await.unwrap().unwrap().path("tick").is_equal_to(1);
        }
        assert!(!cancelled.load(Ordering::SeqCst));

        drop(stream);
        assert!(cancelled.load(Ordering::SeqCst));
    });
}

struct StalledSource;

#[async_trait::async_trait]
impl GraphQlExecutor for StalledSource {
    async fn execute(&self, _request: GraphQlRequest) -> serde_json::Value {
        serde_json::json!({"data": null})
    }

    fn execute_stream(&self, _request: GraphQlRequest) -> BoxStream<'static, serde_json::Value> {
        futures::stream::pending().boxed()
    }
}

#[test]
fn a_stalled_subscription_times_out_per_pull() {
    runtime().block_on(async {
        let tester = GraphQlTester::direct(StalledSource)
            .with_response_timeout(Duration::from_millis(200))
            .build();

        let mut stream = tester.query("subscription { tick }").execute_subscription().await.unwrap();

        let event = stream.next_event().await.unwrap();
        let error = event.unwrap_err();
        assert!(matches!(error, TesterError::ResponseTimeout { .. }), "{error}");
    });
}
