//! Account lifecycle endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::state::AppState;
use crate::store::{AccountStatus, AccountStore, SessionStore};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub pass: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub account_id: u64,
    pub token: String,
    pub expires_at: i64,
}

/// POST /v1/register
///
/// Creates the account and signs it straight in.
pub async fn register<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let account = state.authority.register(&req.email, &req.pass).await?;
    let (session, token) = state.authority.issue(&account).await?;

    Ok(Json(RegisterResponse {
        success: true,
        account_id: account.id.0,
        token,
        expires_at: session.expires_at.timestamp(),
    }))
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub pass: String,
}

#[derive(Serialize)]
pub struct UpdatePasswordResponse {
    pub success: bool,
    /// Sessions revoked by the change, the presenting one included
    pub revoked: u64,
}

/// POST /v1/update_password
pub async fn update_password<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<UpdatePasswordResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let (account, _session) = super::session::require_session(&state, &headers).await?;
    let revoked = state.authority.change_password(account.id, &req.pass).await?;

    Ok(Json(UpdatePasswordResponse {
        success: true,
        revoked,
    }))
}

#[derive(Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub revoked: u64,
}

/// POST /v1/account/disable
pub async fn disable_account<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<StatusChangeResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let (account, _session) = super::session::require_session(&state, &headers).await?;
    let revoked = state
        .authority
        .set_account_status(account.id, AccountStatus::Disabled)
        .await?;

    Ok(Json(StatusChangeResponse {
        success: true,
        revoked,
    }))
}

/// POST /v1/account/cancel
///
/// Tombstones the account; its email becomes available again.
pub async fn cancel_account<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<StatusChangeResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
{
    let (account, _session) = super::session::require_session(&state, &headers).await?;
    let revoked = state
        .authority
        .set_account_status(account.id, AccountStatus::Deleted)
        .await?;

    Ok(Json(StatusChangeResponse {
        success: true,
        revoked,
    }))
}
