use graphql_mocks::{echo_schema, greetings_schema, MockGraphQlServer, SchemaExecutor};
use graphql_tester::{GraphQlTester, TesterError};
use pretty_assertions::assert_eq;
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

use crate::runtime;

fn http_tester(server: &MockGraphQlServer) -> GraphQlTester {
    GraphQlTester::http(server.url().parse().unwrap()).build()
}

#[test]
fn query_over_http() {
    runtime().block_on(async {
        let server = MockGraphQlServer::new(greetings_schema()).await;

        let response = http_tester(&server).query("{ greeting }").execute().await.unwrap();

        assert!(response.headers().contains_key(http::header::CONTENT_TYPE));
        response.path("greeting").is_equal_to("Hello James");
    });
}

#[test]
fn direct_and_http_execution_agree() {
    runtime().block_on(async {
        let server = MockGraphQlServer::new(greetings_schema()).await;
        let over_http = http_tester(&server);
        let in_process = GraphQlTester::direct(SchemaExecutor::new(greetings_schema())).build();

        let query = "{ greetings }";
        let from_http: Vec<String> = over_http
            .query(query)
            .execute()
            .await
            .unwrap()
            .path("greetings")
            .entity_list();
        let from_engine: Vec<String> = in_process
            .query(query)
            .execute()
            .await
            .unwrap()
            .path("greetings")
            .entity_list();

        assert_eq!(from_http, from_engine);
        assert_eq!(
            from_http,
            ["Hi James", "Bonjour James", "Hola James", "Ciao James", "Zdravo James"]
        );
    });
}

#[test]
fn variables_reach_the_server() {
    runtime().block_on(async {
        let server = MockGraphQlServer::new(echo_schema()).await;

        let response = http_tester(&server)
            .query("query($input: [String!]!) { listOfStrings(input: $input) }")
            .variable("input", serde_json::json!(["Musti", "Naukio"]))
            .execute()
            .await
            .unwrap();

        response
            .path("listOfStrings")
            .matches_json(r#"["Musti", "Naukio"]"#);
    });
}

#[test]
fn builder_headers_append_to_the_defaults() {
    runtime().block_on(async {
        let server = MockGraphQlServer::new(echo_schema()).await;

        let mut defaults = http::HeaderMap::new();
        defaults.insert("x-tenant", "default".parse().unwrap());
        let tester = GraphQlTester::http(server.url().parse().unwrap())
            .with_default_headers(defaults)
            .with_default_header("x-trace", "trace-1")
            .build();

        let response = tester
            .query(r#"{ tenant: headers(name: "x-tenant") trace: headers(name: "x-trace") }"#)
            .header("x-tenant", "override")
            .execute()
            .await
            .unwrap();

        response
            .path("tenant")
            .is_equal_to(serde_json::json!(["default", "override"]));
        response.path("trace").is_equal_to(serde_json::json!(["trace-1"]));
    });
}

#[test]
fn server_errors_are_surfaced_without_decoding_the_body() {
    runtime().block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let tester = GraphQlTester::http(server.uri().parse().unwrap()).build();
        let error = tester.query("{ greeting }").execute().await.unwrap_err();

        let TesterError::Transport { status, headers: _, reason: _ } = error else {
            panic!("expected a transport error, got {error}");
        };
        assert_eq!(status, 500);
    });
}

#[test]
fn unexpected_content_types_are_rejected() {
    runtime().block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let tester = GraphQlTester::http(server.uri().parse().unwrap()).build();
        let error = tester.query("{ greeting }").execute().await.unwrap_err();

        let TesterError::Transport { status, reason, .. } = error else {
            panic!("expected a transport error, got {error}");
        };
        assert_eq!(status, 200);
        assert!(reason.contains("application/json"), "{reason}");
    });
}

#[test]
fn undecodable_bodies_are_surfaced_with_a_snippet() {
    runtime().block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("definitely not json", "application/json"))
            .mount(&server)
            .await;

        let tester = GraphQlTester::http(server.uri().parse().unwrap()).build();
        let error = tester.query("{ greeting }").execute().await.unwrap_err();

        let TesterError::Decode { snippet, .. } = error else {
            panic!("expected a decode error, got {error}");
        };
        assert!(snippet.contains("definitely not json"), "{snippet}");
    });
}
