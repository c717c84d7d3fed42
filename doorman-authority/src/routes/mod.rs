//! HTTP routes for the authority

mod account;
mod auth;
mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::store::{AccountStore, SessionStore};

/// Create the router with all routes
pub fn create_router<A, S>(state: Arc<AppState<A, S>>) -> Router
where
    A: AccountStore + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/v1/register", post(account::register))
        .route("/v1/login", post(auth::login))
        .route("/v1/login/delegated", post(auth::login_delegated))
        .route("/v1/session_context", get(session::session_context))
        .route("/v1/logout", post(auth::logout))
        .route("/v1/logout_everywhere", post(auth::logout_everywhere))
        .route("/v1/update_password", post(account::update_password))
        .route("/v1/account/disable", post(account::disable_account))
        .route("/v1/account/cancel", post(account::cancel_account))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
