//! Logout and revocation tests

mod common;

use common::{bearer, create_test_server, login, register_account};
use serde_json::{json, Value};

/// Test: logout revokes the presenting session
#[tokio::test]
async fn test_logout_revokes_session() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&token);
    let response = server.post("/v1/logout").add_header(name, value).await;
    assert_eq!(response.status_code(), 200);

    let (name, value) = bearer(&token);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
}

/// Test: logging out twice with the same token is not an error
#[tokio::test]
async fn test_double_logout_succeeds() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    for _ in 0..2 {
        let (name, value) = bearer(&token);
        let response = server.post("/v1/logout").add_header(name, value).await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
    }
}

/// Test: logout without a token still succeeds
#[tokio::test]
async fn test_logout_without_token_succeeds() {
    let server = create_test_server();

    let response = server.post("/v1/logout").await;
    assert_eq!(response.status_code(), 200);
}

/// Test: can log back in after logout
#[tokio::test]
async fn test_can_relogin_after_logout() {
    let server = create_test_server();
    let token = register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&token);
    server.post("/v1/logout").add_header(name, value).await;

    let fresh = login(&server, "alice@example.com", "Str0ng!Pass").await;
    let (name, value) = bearer(&fresh);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
}

/// Test: logout everywhere revokes every session, later logins unaffected
#[tokio::test]
async fn test_logout_everywhere() {
    let server = create_test_server();
    let t1 = register_account(&server, "alice@example.com", "Str0ng!Pass").await;
    let t2 = login(&server, "alice@example.com", "Str0ng!Pass").await;

    let (name, value) = bearer(&t1);
    let response = server.post("/v1/logout_everywhere").add_header(name, value).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["revoked"], 2);

    for token in [&t1, &t2] {
        let (name, value) = bearer(token);
        let response = server.get("/v1/session_context").add_header(name, value).await;
        let body: Value = response.json();
        assert_eq!(body["authenticated"], false);
    }

    // revocation does not block future issuance
    let t3 = login(&server, "alice@example.com", "Str0ng!Pass").await;
    let (name, value) = bearer(&t3);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
}

/// Test: logout everywhere without a live session is rejected
#[tokio::test]
async fn test_logout_everywhere_requires_session() {
    let server = create_test_server();
    register_account(&server, "alice@example.com", "Str0ng!Pass").await;

    let response = server.post("/v1/logout_everywhere").await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/v1/logout_everywhere")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 401);
}
