//! Concurrent-session cap tests

mod common;

use chrono::Duration;
use common::{bearer, create_test_server_with_policy, login, register_account};
use doorman_authority::SessionPolicy;
use serde_json::Value;

/// Test: exceeding the cap evicts the oldest live session
#[tokio::test]
async fn test_cap_evicts_oldest_session() {
    let server = create_test_server_with_policy(SessionPolicy {
        session_ttl: Duration::hours(24),
        max_concurrent_sessions: Some(2),
    });

    let t1 = register_account(&server, "alice@example.com", "Str0ng!Pass").await;
    let t2 = login(&server, "alice@example.com", "Str0ng!Pass").await;
    let t3 = login(&server, "alice@example.com", "Str0ng!Pass").await;

    // t1 was issued first and got evicted to make room for t3
    let (name, value) = bearer(&t1);
    let response = server.get("/v1/session_context").add_header(name, value).await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);

    for token in [&t2, &t3] {
        let (name, value) = bearer(token);
        let response = server.get("/v1/session_context").add_header(name, value).await;
        let body: Value = response.json();
        assert_eq!(body["authenticated"], true);
    }
}

/// Test: the default policy leaves session count unbounded
#[tokio::test]
async fn test_unlimited_sessions_by_default() {
    let server = create_test_server_with_policy(SessionPolicy::default());

    let mut tokens = vec![register_account(&server, "alice@example.com", "Str0ng!Pass").await];
    for _ in 0..4 {
        tokens.push(login(&server, "alice@example.com", "Str0ng!Pass").await);
    }

    for token in &tokens {
        let (name, value) = bearer(token);
        let response = server.get("/v1/session_context").add_header(name, value).await;
        let body: Value = response.json();
        assert_eq!(body["authenticated"], true);
    }
}
