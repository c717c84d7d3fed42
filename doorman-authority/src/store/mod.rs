//! Storage abstractions for the authority
//!
//! Every store call is a potential suspension point; implementations
//! must be multi-writer-safe and must not require the authority to
//! hold a lock across I/O.

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryAccountStore, InMemorySessionStore};
pub use models::*;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuthError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AuthError>;

/// Trait for account storage
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create a new account; fails with `EmailTaken` if the email is
    /// already used by a non-deleted account
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account>;

    /// Get an account by id
    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Get an account by normalized email (non-deleted accounts only)
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Get an account by delegated identity subject
    async fn get_by_delegated_ref(&self, subject: &str) -> StoreResult<Option<Account>>;

    /// Update account status
    async fn update_status(&self, id: AccountId, status: AccountStatus) -> StoreResult<()>;

    /// Replace the stored credential hash
    async fn update_credential_hash(&self, id: AccountId, hash: &str) -> StoreResult<()>;

    /// Record a successful credential verification
    async fn touch_last_verified(&self, id: AccountId) -> StoreResult<()>;
}

/// Trait for session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session record; the artifact must not be handed out
    /// before this returns
    async fn put(&self, session: Session) -> StoreResult<()>;

    /// Get a session by id
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>>;

    /// Mark one session revoked. Idempotent: returns true only when the
    /// session existed and was not already revoked.
    async fn revoke(&self, id: &SessionId) -> StoreResult<bool>;

    /// Revoke every session for an account; returns how many were live
    /// (unrevoked and unexpired as of `now`) before the sweep
    async fn revoke_all(&self, account: AccountId, now: DateTime<Utc>) -> StoreResult<u64>;

    /// All sessions belonging to an account, expired ones included
    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Session>>;
}
