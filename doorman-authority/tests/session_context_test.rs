//! Session introspection tests

mod common;

use common::{bearer, create_test_server, register_account};
use serde_json::Value;

/// Test: no Authorization header reports unauthenticated
#[tokio::test]
async fn test_no_header_is_unauthenticated() {
    let server = create_test_server();

    let response = server.get("/v1/session_context").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
    assert!(body["server_time"].as_i64().is_some());
}

/// Test: a valid token resolves to its account
#[tokio::test]
async fn test_valid_token_is_authenticated() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&token);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();

    assert_eq!(body["authenticated"], true);
    assert_eq!(body["email"], "alice@example.com");
    assert!(body["account_id"].as_u64().is_some());
    assert!(body["expires_at"].as_i64().is_some());
}

/// Test: tampering with the signature segment de-authenticates the token
#[tokio::test]
async fn test_tampered_token_is_unauthenticated() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let sig_start = token.rfind('.').unwrap() + 1;
    let mut tampered = token.clone();
    let replacement = if tampered.as_bytes()[sig_start] == b'A' { "B" } else { "A" };
    tampered.replace_range(sig_start..sig_start + 1, replacement);
    assert_ne!(tampered, token);

    let (name, value) = bearer(&tampered);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
}

/// Test: garbage tokens report unauthenticated, not a server error
#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let server = create_test_server();

    let (name, value) = bearer("definitely.not.atoken");
    let response = server.get("/v1/session_context").add_header(name, value).await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
}
