//! Authentication endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use doorman_core::BearerArtifact;

use crate::authority::Proof;
use crate::error::AuthError;
use crate::state::AppState;
use crate::store::{AccountStore, SessionId, SessionStore};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub pass: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub account_id: u64,
    pub token: String,
    pub expires_at: i64,
}

/// POST /v1/login
pub async fn login<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let (account, session, token) = state.authority.login(&req.email, &req.pass).await?;

    Ok(Json(LoginResponse {
        success: true,
        account_id: account.id.0,
        token,
        expires_at: session.expires_at.timestamp(),
    }))
}

#[derive(Deserialize)]
pub struct DelegatedLoginRequest {
    /// Subject id from an assertion the gateway has already verified
    pub subject: String,
    pub email: String,
}

/// POST /v1/login/delegated
///
/// First sight of an unknown subject provisions an account on the fly.
pub async fn login_delegated<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    Json(req): Json<DelegatedLoginRequest>,
) -> Result<Json<LoginResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let account = match state
        .authority
        .verify(&req.email, Proof::DelegatedSubject(&req.subject))
        .await
    {
        Ok(account) => account,
        Err(AuthError::AccountNotProvisioned) => {
            state
                .authority
                .provision_delegated(&req.email, &req.subject)
                .await?
        }
        Err(err) => return Err(err),
    };

    let (session, token) = state.authority.issue(&account).await?;

    Ok(Json(LoginResponse {
        success: true,
        account_id: account.id.0,
        token,
        expires_at: session.expires_at.timestamp(),
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked: Option<u64>,
}

/// POST /v1/logout
///
/// Lenient by design: a correctly signed artifact revokes its session
/// even when already expired or revoked, and a missing or unreadable
/// header still reports success.
pub async fn logout<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    if let Some(raw) = super::session::bearer_artifact(&headers) {
        if let Ok(parsed) = BearerArtifact::parse(raw) {
            if parsed.verify(&state.authority.public_key()).is_ok() {
                let session_id = SessionId(parsed.claims().sid.clone());
                state.authority.revoke_one(&session_id).await?;
            }
        }
    }

    Ok(Json(LogoutResponse {
        success: true,
        revoked: None,
    }))
}

/// POST /v1/logout_everywhere
///
/// Requires a live session; revokes every session of its account.
pub async fn logout_everywhere<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let (account, _session) = super::session::require_session(&state, &headers).await?;
    let revoked = state.authority.revoke_all(account.id).await?;

    Ok(Json(LogoutResponse {
        success: true,
        revoked: Some(revoked),
    }))
}
