//! Data models for authority storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Account can log in and validate sessions
    Active,
    /// Account exists but fails verification and validation
    Disabled,
    /// Account is tombstoned; its email may be registered again
    Deleted,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
            AccountStatus::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "disabled" => Some(AccountStatus::Disabled),
            "deleted" => Some(AccountStatus::Deleted),
            _ => None,
        }
    }
}

/// Unique account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A registered identity
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    /// Normalized (lowercased, trimmed) email, unique among non-deleted accounts
    pub email: String,
    /// Salted password hash; absent for delegated-identity-only accounts
    pub credential_hash: Option<String>,
    /// External identity subject id, when created via a delegated provider
    pub delegated_identity_ref: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Fields needed to create an account
///
/// Invariant: at least one of `credential_hash` or
/// `delegated_identity_ref` is set.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub credential_hash: Option<String>,
    pub delegated_identity_ref: Option<String>,
}

/// One authenticated login instance
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set by the revoker, never unset
    pub revoked: bool,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Normalize a login identifier: trim whitespace, lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
