//! Account disable and cancel tests

mod common;

use common::{bearer, create_test_server, register_account};
use serde_json::{json, Value};

/// Test: disabling an account invalidates its sessions and logins
#[tokio::test]
async fn test_disable_account() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&token);
    let response = server.post("/v1/account/disable").add_header(name, value).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["revoked"], 1);

    // previously valid artifact no longer authenticates
    let (name, value) = bearer(&token);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);

    // and the password no longer verifies
    let response = server
        .post("/v1/login")
        .json(&json!({ "email": "alice@example.com", "pass": "Str0ng!Pass" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: cancelling frees the email for a new registration
#[tokio::test]
async fn test_cancel_frees_email() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&token);
    let response = server.post("/v1/account/cancel").add_header(name, value).await;
    assert_eq!(response.status_code(), 200);

    // the old token is dead
    let (name, value) = bearer(&token);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);

    // same email registers a brand-new account
    let fresh = register_account(&server, "alice@example.com", "Fresh!Pass1").await;
    let (name, value) = bearer(&fresh);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
}

/// Test: lifecycle endpoints require a live session
#[tokio::test]
async fn test_lifecycle_requires_session() {
    let server = create_test_server();

    let response = server.post("/v1/account/disable").await;
    assert_eq!(response.status_code(), 401);

    let response = server.post("/v1/account/cancel").await;
    assert_eq!(response.status_code(), 401);
}
