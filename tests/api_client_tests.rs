mod auth_support;

use std::sync::Arc;
use std::time::Duration;

use discord_auth::api::{ApiClient, ProfileApi, ProfileUpdate};
use discord_auth::auth::backend::BackendFlow;
use discord_auth::auth::{AuthError, AuthService, AuthState, Token};
use discord_auth::error::{Error, ErrorCategory};
use discord_auth::util::retry::RetryPolicy;
use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_support::{backend_user_json, session, InMemorySessionStore};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn client(server: &MockServer, store: Arc<InMemorySessionStore>) -> ApiClient {
    let service = AuthService::new(Arc::new(BackendFlow::new(server.uri())), store);
    ApiClient::new(server.uri(), Arc::new(service)).with_retry(fast_retry())
}

fn logged_in_store(token: &str) -> Arc<InMemorySessionStore> {
    let store = Arc::new(InMemorySessionStore::new());
    store.seed("backend", "default", session(Token::bearer(token), "nelly"));
    store
}

#[tokio::test]
async fn fetch_profile_sends_bearer_and_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .and(header("authorization", "Bearer session-jwt"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "user": backend_user_json("nelly") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let user = ProfileApi::new(&client).fetch().await.unwrap();
    assert_eq!(user.username, "nelly");
    assert_eq!(user.email.as_deref(), Some("nelly@discord.com"));
}

#[tokio::test]
async fn update_trims_username_and_refreshes_cached_user() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/profile"))
        .and(body_json(json!({ "username": "neo" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "user": backend_user_json("neo") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = logged_in_store("session-jwt");
    let client = client(&server, store.clone());
    let user = ProfileApi::new(&client)
        .update(ProfileUpdate::username("  neo  "))
        .await
        .unwrap();

    assert_eq!(user.username, "neo");
    let cached = store.get("backend", "default").unwrap().user.unwrap();
    assert_eq!(cached.username, "neo");
    assert_eq!(
        client.service().state().user().map(|u| u.username.clone()),
        Some("neo".to_string())
    );
}

#[tokio::test]
async fn blank_username_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let err = ProfileApi::new(&client)
        .update(ProfileUpdate::username("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(ref msg) if msg == "Username cannot be empty"));
}

#[tokio::test]
async fn unauthorized_response_ends_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = logged_in_store("revoked");
    let client = client(&server, store.clone());
    let err = ProfileApi::new(&client).fetch().await.unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::SessionExpired)));
    assert_eq!(err.to_string(), "Authentication expired");
    assert!(store.get("backend", "default").is_none());
    assert_eq!(client.service().state(), AuthState::Idle);
}

#[tokio::test]
async fn server_errors_are_retried_for_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "user": backend_user_json("nelly") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let user = ProfileApi::new(&client).fetch().await.unwrap();
    assert_eq!(user.username, "nelly");
}

#[tokio::test]
async fn rate_limited_get_waits_for_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0.2"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "user": backend_user_json("nelly") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let started = std::time::Instant::now();
    let user = ProfileApi::new(&client).fetch().await.unwrap();
    assert_eq!(user.username, "nelly");
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn rate_limit_error_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt")).with_retry(RetryPolicy::none());
    let err = ProfileApi::new(&client).fetch().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Api {
            status: 429,
            retry_after_ms: Some(3000),
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::RateLimit);
}

#[tokio::test]
async fn non_get_requests_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/things"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let err = client
        .call::<Value>(Method::POST, "/api/things", Some(&json!({ "a": 1 })))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, .. }));
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, logged_in_store("session-jwt"));
    let err = ProfileApi::new(&client).fetch().await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 404: Not Found");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn health_works_without_a_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(InMemorySessionStore::new()));
    let body = client.health().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
