//! SQLite-based storage implementation

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    Account, AccountId, AccountStatus, AccountStore, NewAccount, Session, SessionId,
    SessionStore, StoreResult,
};
use crate::error::AuthError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

fn store_err(e: rusqlite::Error) -> AuthError {
    AuthError::StoreUnavailable(e.to_string())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// SQLite-based store implementing both AccountStore and SessionStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AuthError> {
        let conn = Connection::open(path).map_err(store_err)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(store_err)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AuthError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(store_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, AuthError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(store_err)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AuthError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                credential_hash TEXT,
                delegated_ref TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_verified_at TEXT
            );
            -- email is unique only among non-deleted accounts
            CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_email
                ON accounts(email) WHERE status != 'deleted';
            CREATE INDEX IF NOT EXISTS idx_accounts_delegated ON accounts(delegated_ref);

            -- Sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                issued_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_account ON sessions(account_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            "#,
        )
        .map_err(store_err)?;

        Ok(())
    }

    /// Delete sessions that expired before the cutoff.
    ///
    /// Stand-in for the TTL reclaim a managed store would run; revoked
    /// rows are retained for audit until they expire.
    pub fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, AuthError> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![before.to_rfc3339()],
            )
            .map_err(store_err)?;
        Ok(rows as u64)
    }

    fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
        let id: i64 = row.get(0)?;
        let email: String = row.get(1)?;
        let credential_hash: Option<String> = row.get(2)?;
        let delegated_ref: Option<String> = row.get(3)?;
        let status: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        let last_verified_at: Option<String> = row.get(7)?;
        Ok(Account {
            id: AccountId(id as u64),
            email,
            credential_hash,
            delegated_identity_ref: delegated_ref,
            status: AccountStatus::from_str(&status).unwrap_or(AccountStatus::Disabled),
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
            last_verified_at: last_verified_at.map(|s| parse_ts(&s)),
        })
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
        let id: String = row.get(0)?;
        let account_id: i64 = row.get(1)?;
        let issued_at: String = row.get(2)?;
        let expires_at: String = row.get(3)?;
        let revoked: i32 = row.get(4)?;
        Ok(Session {
            id: SessionId(id),
            account_id: AccountId(account_id as u64),
            issued_at: parse_ts(&issued_at),
            expires_at: parse_ts(&expires_at),
            revoked: revoked != 0,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, email, credential_hash, delegated_ref, status, created_at, updated_at, last_verified_at";

#[async_trait]
impl AccountStore for SqliteStore {
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO accounts (email, credential_hash, delegated_ref, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                new.email,
                new.credential_hash,
                new.delegated_identity_ref,
                AccountStatus::Active.as_str(),
                now,
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return AuthError::EmailTaken;
                }
            }
            store_err(e)
        })?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            params![id],
            Self::row_to_account,
        )
        .map_err(store_err)
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            params![id.0 as i64],
            Self::row_to_account,
        )
        .optional()
        .map_err(store_err)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1 AND status != 'deleted'"),
            params![email],
            Self::row_to_account,
        )
        .optional()
        .map_err(store_err)
    }

    async fn get_by_delegated_ref(&self, subject: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE delegated_ref = ?1 AND status != 'deleted'"
            ),
            params![subject],
            Self::row_to_account,
        )
        .optional()
        .map_err(store_err)
    }

    async fn update_status(&self, id: AccountId, status: AccountStatus) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE accounts SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), id.0 as i64],
            )
            .map_err(store_err)?;
        if rows == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn update_credential_hash(&self, id: AccountId, hash: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE accounts SET credential_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![hash, Utc::now().to_rfc3339(), id.0 as i64],
            )
            .map_err(store_err)?;
        if rows == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn touch_last_verified(&self, id: AccountId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE accounts SET last_verified_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.0 as i64],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn put(&self, session: Session) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (id, account_id, issued_at, expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.0,
                session.account_id.0 as i64,
                session.issued_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
                session.revoked as i32,
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, account_id, issued_at, expires_at, revoked FROM sessions WHERE id = ?1",
            params![id.0],
            Self::row_to_session,
        )
        .optional()
        .map_err(store_err)
    }

    async fn revoke(&self, id: &SessionId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE sessions SET revoked = 1 WHERE id = ?1 AND revoked = 0",
                params![id.0],
            )
            .map_err(store_err)?;
        Ok(rows > 0)
    }

    async fn revoke_all(&self, account: AccountId, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let cutoff = now.to_rfc3339();

        let live: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sessions
                 WHERE account_id = ?1 AND revoked = 0 AND expires_at > ?2",
                params![account.0 as i64, cutoff],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        conn.execute(
            "UPDATE sessions SET revoked = 1 WHERE account_id = ?1 AND revoked = 0",
            params![account.0 as i64],
        )
        .map_err(store_err)?;

        Ok(live as u64)
    }

    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, account_id, issued_at, expires_at, revoked
                 FROM sessions WHERE account_id = ?1",
            )
            .map_err(store_err)?;

        let sessions = stmt
            .query_map(params![account.0 as i64], Self::row_to_session)
            .map_err(store_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_err)?;

        Ok(sessions)
    }
}

// Forwarding impls so one Arc<SqliteStore> can serve as both the
// account store and the session store of an AppState.
#[async_trait]
impl AccountStore for std::sync::Arc<SqliteStore> {
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        (**self).create_account(new).await
    }

    async fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        (**self).get_account(id).await
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        (**self).get_by_email(email).await
    }

    async fn get_by_delegated_ref(&self, subject: &str) -> StoreResult<Option<Account>> {
        (**self).get_by_delegated_ref(subject).await
    }

    async fn update_status(&self, id: AccountId, status: AccountStatus) -> StoreResult<()> {
        (**self).update_status(id, status).await
    }

    async fn update_credential_hash(&self, id: AccountId, hash: &str) -> StoreResult<()> {
        (**self).update_credential_hash(id, hash).await
    }

    async fn touch_last_verified(&self, id: AccountId) -> StoreResult<()> {
        (**self).touch_last_verified(id).await
    }
}

#[async_trait]
impl SessionStore for std::sync::Arc<SqliteStore> {
    async fn put(&self, session: Session) -> StoreResult<()> {
        (**self).put(session).await
    }

    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        (**self).get(id).await
    }

    async fn revoke(&self, id: &SessionId) -> StoreResult<bool> {
        (**self).revoke(id).await
    }

    async fn revoke_all(&self, account: AccountId, now: DateTime<Utc>) -> StoreResult<u64> {
        (**self).revoke_all(account, now).await
    }

    async fn list_for_account(&self, account: AccountId) -> StoreResult<Vec<Session>> {
        (**self).list_for_account(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            credential_hash: Some("hashed_password".to_string()),
            delegated_identity_ref: None,
        }
    }

    fn session_for(account: AccountId, suffix: &str, ttl: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId(format!("sid-{suffix}")),
            account_id: account,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_account() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        assert_eq!(account.status, AccountStatus::Active);

        let found = store.get_by_email("test@example.com").await.unwrap();
        assert_eq!(found.unwrap().id, account.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (store, _dir) = create_test_store();

        store.create_account(new_account("test@example.com")).await.unwrap();
        let result = store.create_account(new_account("test@example.com")).await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_deleted_account_frees_email() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        store.update_status(account.id, AccountStatus::Deleted).await.unwrap();

        assert!(store.get_by_email("test@example.com").await.unwrap().is_none());
        // partial unique index permits re-registration
        store.create_account(new_account("test@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        let session = session_for(account.id, "1", Duration::hours(1));
        store.put(session.clone()).await.unwrap();

        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert!(!stored.revoked);

        assert!(store.revoke(&session.id).await.unwrap());
        assert!(!store.revoke(&session.id).await.unwrap());
        assert!(store.get(&session.id).await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn test_revoke_all_counts_live_only() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        store.put(session_for(account.id, "live", Duration::hours(1))).await.unwrap();
        store.put(session_for(account.id, "expired", Duration::hours(-1))).await.unwrap();

        let count = store.revoke_all(account.id, Utc::now()).await.unwrap();
        assert_eq!(count, 1);

        for session in store.list_for_account(account.id).await.unwrap() {
            assert!(session.revoked);
        }
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        store.put(session_for(account.id, "live", Duration::hours(1))).await.unwrap();
        store.put(session_for(account.id, "stale", Duration::hours(-2))).await.unwrap();

        let purged = store.purge_expired(Utc::now()).unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.list_for_account(account.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credential_hash_update() {
        let (store, _dir) = create_test_store();

        let account = store.create_account(new_account("test@example.com")).await.unwrap();
        store.update_credential_hash(account.id, "new_hash").await.unwrap();

        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.credential_hash.as_deref(), Some("new_hash"));
        assert!(reloaded.updated_at >= account.updated_at);
    }
}
