//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    Account, AccountId, AccountStatus, AccountStore, NewAccount, Session, SessionId,
    SessionStore, StoreResult,
};
use crate::error::AuthError;

/// In-memory account store
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    /// Normalized email -> account id, non-deleted accounts only
    by_email: RwLock<HashMap<String, AccountId>>,
    /// Delegated subject -> account id
    by_subject: RwLock<HashMap<String, AccountId>>,
    next_account_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            by_email: RwLock::new(HashMap::new()),
            by_subject: RwLock::new(HashMap::new()),
            next_account_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut by_email = self.by_email.write().unwrap();
        if by_email.contains_key(&new.email) {
            return Err(AuthError::EmailTaken);
        }

        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let account = Account {
            id,
            email: new.email.clone(),
            credential_hash: new.credential_hash,
            delegated_identity_ref: new.delegated_identity_ref.clone(),
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
            last_verified_at: None,
        };

        by_email.insert(new.email, id);
        if let Some(subject) = new.delegated_identity_ref {
            self.by_subject.write().unwrap().insert(subject, id);
        }
        self.accounts.write().unwrap().insert(id, account.clone());

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let id = self.by_email.read().unwrap().get(email).copied();
        match id {
            Some(id) => self.get_account(id).await,
            None => Ok(None),
        }
    }

    async fn get_by_delegated_ref(&self, subject: &str) -> StoreResult<Option<Account>> {
        let id = self.by_subject.read().unwrap().get(subject).copied();
        match id {
            Some(id) => self.get_account(id).await,
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: AccountId, status: AccountStatus) -> StoreResult<()> {
        let (email, subject) = {
            let mut accounts = self.accounts.write().unwrap();
            let account = accounts.get_mut(&id).ok_or(AuthError::NotFound)?;
            account.status = status;
            account.updated_at = Utc::now();
            (account.email.clone(), account.delegated_identity_ref.clone())
        };

        // a deleted account frees its email and delegated subject for reuse
        if status == AccountStatus::Deleted {
            self.by_email.write().unwrap().remove(&email);
            if let Some(subject) = subject {
                self.by_subject.write().unwrap().remove(&subject);
            }
        }
        Ok(())
    }

    async fn update_credential_hash(&self, id: AccountId, hash: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(AuthError::NotFound)?;
        account.credential_hash = Some(hash.to_string());
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_verified(&self, id: AccountId) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(AuthError::NotFound)?;
        account.last_verified_at = Some(Utc::now());
        Ok(())
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> StoreResult<()> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(id).cloned())
    }

    async fn revoke(&self, id: &SessionId) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(id) {
            Some(session) if !session.revoked => {
                session.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all(&self, account: AccountId, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let mut transitioned = 0;
        for session in sessions.values_mut() {
            if session.account_id == account && !session.revoked {
                if !session.is_expired_at(now) {
                    transitioned += 1;
                }
                session.revoked = true;
            }
        }
        Ok(transitioned)
    }

    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Session>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions
            .values()
            .filter(|s| s.account_id == account)
            .cloned()
            .collect())
    }
}
