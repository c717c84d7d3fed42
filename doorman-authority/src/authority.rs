//! The session authority
//!
//! One type, four facets over shared stores: credential verification,
//! session issuance, artifact validation, session revocation. The
//! authority is stateless compute over its stores; it never holds a
//! lock across store I/O, so every operation is safe to run
//! concurrently with any other.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;

use doorman_core::{ArtifactClaims, BearerArtifact, KeyPair, PublicKey};

use crate::clock::{Clock, SystemClock};
use crate::crypto::{generate_session_id, hash_password, verify_password};
use crate::error::AuthError;
use crate::store::{
    normalize_email, Account, AccountId, AccountStatus, AccountStore, NewAccount, Session,
    SessionId, SessionStore,
};

/// Minimum password length
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
const MAX_PASSWORD_LENGTH: usize = 80;

/// Policy knobs for session issuance
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// How long an issued session lives
    pub session_ttl: Duration,
    /// Cap on live sessions per account; when exceeded, the oldest
    /// live session (by `issued_at`) is revoked to make room
    pub max_concurrent_sessions: Option<usize>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            max_concurrent_sessions: None,
        }
    }
}

/// An identity proof presented to `verify`
///
/// Delegated assertions must already be validated (signature, issuer,
/// audience) by the caller; only the extracted subject id arrives here.
pub enum Proof<'a> {
    Password(&'a str),
    DelegatedSubject(&'a str),
}

type LoginOutcome = Result<(Account, Session, String), AuthError>;
type FlightSlot = Arc<Mutex<Option<LoginOutcome>>>;

fn proof_fingerprint(proof: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    proof.hash(&mut hasher);
    hasher.finish()
}

fn check_password_bounds(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooLong);
    }
    Ok(())
}

/// The session authority
pub struct SessionAuthority<A, S, C = SystemClock> {
    accounts: A,
    sessions: S,
    signing_key: KeyPair,
    policy: SessionPolicy,
    clock: C,
    /// In-flight logins keyed by (identifier, proof fingerprint);
    /// duplicate concurrent submissions share the leader's outcome
    inflight: Mutex<HashMap<(String, u64), FlightSlot>>,
}

impl<A, S> SessionAuthority<A, S>
where
    A: AccountStore,
    S: SessionStore,
{
    pub fn new(accounts: A, sessions: S, signing_key: KeyPair, policy: SessionPolicy) -> Self {
        Self::with_clock(accounts, sessions, signing_key, policy, SystemClock)
    }
}

impl<A, S, C> SessionAuthority<A, S, C>
where
    A: AccountStore,
    S: SessionStore,
    C: Clock,
{
    pub fn with_clock(
        accounts: A,
        sessions: S,
        signing_key: KeyPair,
        policy: SessionPolicy,
        clock: C,
    ) -> Self {
        Self {
            accounts,
            sessions,
            signing_key,
            policy,
            clock,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The key artifacts are verified against
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.public_key()
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Create a password account
    pub async fn register(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        check_password_bounds(password)?;
        let hash = hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let account = self
            .accounts
            .create_account(NewAccount {
                email: normalize_email(email),
                credential_hash: Some(hash),
                delegated_identity_ref: None,
            })
            .await?;
        tracing::info!(account = account.id.0, "account registered");
        Ok(account)
    }

    /// Create an account for a delegated identity subject
    pub async fn provision_delegated(
        &self,
        email: &str,
        subject: &str,
    ) -> Result<Account, AuthError> {
        let account = self
            .accounts
            .create_account(NewAccount {
                email: normalize_email(email),
                credential_hash: None,
                delegated_identity_ref: Some(subject.to_string()),
            })
            .await?;
        tracing::info!(account = account.id.0, "delegated account provisioned");
        Ok(account)
    }

    /// Confirm an identity claim resolves to exactly one active account.
    ///
    /// Unknown identifier and wrong password report the same
    /// `InvalidCredential` kind, so callers cannot enumerate accounts.
    pub async fn verify(&self, identifier: &str, proof: Proof<'_>) -> Result<Account, AuthError> {
        match proof {
            Proof::Password(password) => {
                let email = normalize_email(identifier);
                let account = self
                    .accounts
                    .get_by_email(&email)
                    .await?
                    .ok_or(AuthError::InvalidCredential)?;
                if !account.is_active() {
                    return Err(AuthError::AccountInactive);
                }
                let hash = account
                    .credential_hash
                    .as_deref()
                    .ok_or(AuthError::InvalidCredential)?;
                let matched = verify_password(password, hash)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                if !matched {
                    return Err(AuthError::InvalidCredential);
                }

                // best-effort bookkeeping, not part of the contract
                if let Err(err) = self.accounts.touch_last_verified(account.id).await {
                    tracing::debug!(?err, "failed to record last_verified_at");
                }
                Ok(account)
            }
            Proof::DelegatedSubject(subject) => {
                let account = self
                    .accounts
                    .get_by_delegated_ref(subject)
                    .await?
                    .ok_or(AuthError::AccountNotProvisioned)?;
                if !account.is_active() {
                    return Err(AuthError::AccountInactive);
                }
                Ok(account)
            }
        }
    }

    /// Mint a session and its signed bearer artifact.
    ///
    /// The session record is persisted before the artifact is returned,
    /// so a validator in another replica can never reject a just-issued
    /// artifact as unknown.
    pub async fn issue(&self, account: &Account) -> Result<(Session, String), AuthError> {
        if !account.is_active() {
            return Err(AuthError::AccountInactive);
        }

        if let Some(cap) = self.policy.max_concurrent_sessions {
            self.evict_to_cap(account.id, cap).await?;
        }

        let now = self.clock.now();
        let session = Session {
            id: SessionId(generate_session_id()),
            account_id: account.id,
            issued_at: now,
            expires_at: now + self.policy.session_ttl,
            revoked: false,
        };

        let claims = ArtifactClaims {
            sid: session.id.0.clone(),
            sub: account.id.0,
            iat: session.issued_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };
        let artifact = BearerArtifact::seal(claims, &self.signing_key)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.sessions.put(session.clone()).await?;
        tracing::debug!(account = account.id.0, session = %session.id.0, "session issued");

        Ok((session, artifact.into_encoded()))
    }

    async fn evict_to_cap(&self, account: AccountId, cap: usize) -> Result<(), AuthError> {
        let now = self.clock.now();
        let mut live: Vec<Session> = self
            .sessions
            .list_for_account(account)
            .await?
            .into_iter()
            .filter(|s| !s.revoked && !s.is_expired_at(now))
            .collect();
        if live.len() < cap {
            return Ok(());
        }

        live.sort_by_key(|s| s.issued_at);
        let excess = live.len() + 1 - cap;
        for session in live.iter().take(excess) {
            self.sessions.revoke(&session.id).await?;
            tracing::debug!(session = %session.id.0, "evicted oldest live session");
        }
        Ok(())
    }

    /// Verify credentials and issue a session, collapsing duplicate
    /// concurrent submissions of the same identifier + password to one
    /// effective issuance.
    pub async fn login(&self, identifier: &str, password: &str) -> LoginOutcome {
        let email = normalize_email(identifier);
        let key = (email.clone(), proof_fingerprint(password));

        let (slot, leader_guard) = {
            let mut inflight = self.inflight.lock().await;
            if let Some(slot) = inflight.get(&key) {
                (slot.clone(), None)
            } else {
                let slot: FlightSlot = Arc::new(Mutex::new(None));
                // lock before publishing so followers wait for the outcome
                let guard = slot.clone().try_lock_owned().ok();
                inflight.insert(key.clone(), slot.clone());
                (slot, guard)
            }
        };

        match leader_guard {
            Some(mut guard) => {
                let outcome = self.login_uncoalesced(&email, password).await;
                *guard = Some(outcome.clone());
                self.inflight.lock().await.remove(&key);
                outcome
            }
            None => {
                let shared = slot.lock().await.clone();
                match shared {
                    Some(outcome) => outcome,
                    // leader died without an outcome; do the work ourselves
                    None => self.login_uncoalesced(&email, password).await,
                }
            }
        }
    }

    async fn login_uncoalesced(&self, email: &str, password: &str) -> LoginOutcome {
        let account = self.verify(email, Proof::Password(password)).await?;
        let (session, artifact) = self.issue(&account).await?;
        Ok((account, session, artifact))
    }

    /// Resolve a bearer artifact to its live session and owning account.
    ///
    /// Tier 1 is structural and needs no store access: signature, then
    /// the artifact's own expiry claim. Tier 2 is authoritative: the
    /// stored session and account decide revocation, status and expiry,
    /// and win whenever they disagree with the artifact.
    pub async fn validate(&self, artifact: &str) -> Result<(Account, Session), AuthError> {
        let parsed = BearerArtifact::parse(artifact)?;
        parsed.verify(&self.signing_key.public_key())?;

        let now = self.clock.now();
        if parsed.is_expired_at(now) {
            return Err(AuthError::Expired);
        }

        let session_id = SessionId(parsed.claims().sid.clone());
        let session = self
            .sessions
            .get(&session_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        if session.revoked {
            return Err(AuthError::Revoked);
        }

        let account = self
            .accounts
            .get_account(session.account_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        if !account.is_active() {
            return Err(AuthError::AccountInactive);
        }
        if session.is_expired_at(now) {
            return Err(AuthError::Expired);
        }

        Ok((account, session))
    }

    /// `validate` under a caller-supplied deadline. A timeout is a
    /// transient infrastructure failure, never an authorization verdict,
    /// so it surfaces as `StoreUnavailable` and a client must not drop
    /// its artifact over it.
    pub async fn validate_with_timeout(
        &self,
        artifact: &str,
        limit: std::time::Duration,
    ) -> Result<(Account, Session), AuthError> {
        match tokio::time::timeout(limit, self.validate(artifact)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "validation timed out after {limit:?}"
            ))),
        }
    }

    /// Invalidate one session. Idempotent: revoking an already-revoked
    /// or unknown session succeeds.
    pub async fn revoke_one(&self, session_id: &SessionId) -> Result<(), AuthError> {
        let transitioned = self.sessions.revoke(session_id).await?;
        if transitioned {
            tracing::info!(session = %session_id.0, "session revoked");
        }
        Ok(())
    }

    /// Invalidate every session for an account; returns how many were
    /// live before the sweep. Issuance racing this sweep may leave a
    /// survivor; callers needing the hard guarantee serialize per
    /// account.
    pub async fn revoke_all(&self, account: AccountId) -> Result<u64, AuthError> {
        let count = self.sessions.revoke_all(account, self.clock.now()).await?;
        tracing::info!(account = account.0, revoked = count, "revoked account sessions");
        Ok(count)
    }

    /// Replace the password and sign the account out everywhere
    pub async fn change_password(
        &self,
        account: AccountId,
        new_password: &str,
    ) -> Result<u64, AuthError> {
        check_password_bounds(new_password)?;
        let hash = hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?;
        self.accounts.update_credential_hash(account, &hash).await?;
        self.revoke_all(account).await
    }

    /// Change account status; leaving Active revokes all sessions
    pub async fn set_account_status(
        &self,
        account: AccountId,
        status: AccountStatus,
    ) -> Result<u64, AuthError> {
        self.accounts.update_status(account, status).await?;
        if status == AccountStatus::Active {
            return Ok(0);
        }
        self.revoke_all(account).await
    }
}
