//! Doorman Session Authority
//!
//! Verifies credentials, issues signed bearer artifacts bound to
//! durable session records, validates presented artifacts in two tiers
//! (structural first, then the store as the source of truth) and
//! revokes sessions one at a time or per account.

pub mod authority;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

pub use authority::{Proof, SessionAuthority, SessionPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_or_generate_signing_key, Config};
pub use error::AuthError;
pub use state::AppState;
pub use store::{
    AccountStore, InMemoryAccountStore, InMemorySessionStore, SessionStore, SqliteStore,
};
