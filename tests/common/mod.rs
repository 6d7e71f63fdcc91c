//! Shared helpers for the HTTP tests.

#![allow(dead_code)]

use dimensions_client::{Credentials, DslClient};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const AUTH_PATH: &str = "/api/auth.json";
pub const DSL_PATH: &str = "/api/dsl.json";

/// Mount an auth endpoint that always hands out `token`.
pub async fn mount_auth(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })),
        )
        .mount(server)
        .await;
}

/// Client pointed at the mock server, with millisecond backoff.
pub fn client_for(server: &MockServer) -> DslClient {
    let creds = Credentials::new(server.uri(), "alice", "secret").expect("credentials");
    DslClient::new(creds)
        .expect("client")
        .with_backoff(Duration::from_millis(5))
}

/// Requests the server received on `route`.
pub async fn requests_to(server: &MockServer, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|r| r.url.path() == route)
        .collect()
}

/// Bodies of the DSL queries the server received, in order.
pub async fn query_bodies(server: &MockServer) -> Vec<String> {
    requests_to(server, DSL_PATH)
        .await
        .into_iter()
        .map(|r| String::from_utf8(r.body).expect("utf-8 body"))
        .collect()
}
