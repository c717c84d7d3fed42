//! Common test utilities for authority integration tests

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use doorman_authority::{
    routes, AppState, InMemoryAccountStore, InMemorySessionStore, SessionAuthority, SessionPolicy,
};
use doorman_core::KeyPair;
use serde_json::{json, Value};

pub fn create_test_server() -> TestServer {
    create_test_server_with_policy(SessionPolicy::default())
}

pub fn create_test_server_with_policy(policy: SessionPolicy) -> TestServer {
    let authority = SessionAuthority::new(
        InMemoryAccountStore::new(),
        InMemorySessionStore::new(),
        KeyPair::generate(),
        policy,
    );
    let state = Arc::new(AppState::new(authority));
    let app = routes::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Build an Authorization header for a bearer token
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("invalid token"),
    )
}

/// Register an account and return its bearer token
pub async fn register_account(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/v1/register")
        .json(&json!({ "email": email, "pass": password }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["token"]
        .as_str()
        .expect("No token in register response")
        .to_string()
}

/// Log in and return the bearer token
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/v1/login")
        .json(&json!({ "email": email, "pass": password }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["token"]
        .as_str()
        .expect("No token in login response")
        .to_string()
}
