//! Shared application state

use crate::authority::SessionAuthority;
use crate::store::{AccountStore, SessionStore};

/// State handed to every route handler
pub struct AppState<A, S> {
    pub authority: SessionAuthority<A, S>,
}

impl<A, S> AppState<A, S>
where
    A: AccountStore,
    S: SessionStore,
{
    pub fn new(authority: SessionAuthority<A, S>) -> Self {
        Self { authority }
    }
}
