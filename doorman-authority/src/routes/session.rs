//! Session introspection endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::AuthError;
use crate::state::AppState;
use crate::store::{Account, AccountStore, Session, SessionStore};

/// Extract the bearer artifact from the Authorization header
pub fn bearer_artifact(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the presenting artifact or fail the request
pub async fn require_session<A, S>(
    state: &AppState<A, S>,
    headers: &HeaderMap,
) -> Result<(Account, Session), AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let artifact = bearer_artifact(headers).ok_or(AuthError::Malformed)?;
    state.authority.validate(artifact).await
}

#[derive(Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub server_time: i64,
}

impl SessionContext {
    fn unauthenticated(server_time: i64) -> Self {
        Self {
            authenticated: false,
            account_id: None,
            email: None,
            expires_at: None,
            server_time,
        }
    }
}

/// GET /v1/session_context
///
/// Authorization failures report as unauthenticated rather than an
/// error; a store outage is the one failure that must stay distinct so
/// clients do not drop a still-valid artifact.
pub async fn session_context<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<SessionContext>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let now = chrono::Utc::now().timestamp();
    let Some(artifact) = bearer_artifact(&headers) else {
        return Ok(Json(SessionContext::unauthenticated(now)));
    };

    match state.authority.validate(artifact).await {
        Ok((account, session)) => Ok(Json(SessionContext {
            authenticated: true,
            account_id: Some(account.id.0),
            email: Some(account.email),
            expires_at: Some(session.expires_at.timestamp()),
            server_time: now,
        })),
        Err(err @ AuthError::StoreUnavailable(_)) => Err(err),
        Err(_) => Ok(Json(SessionContext::unauthenticated(now))),
    }
}
