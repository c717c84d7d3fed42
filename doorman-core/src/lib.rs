//! Doorman Core Library
//!
//! Signing primitives for the doorman session authority:
//! - The authority holds an Ed25519 keypair and signs bearer artifacts
//! - Clients present the artifact on every authenticated request
//! - Anyone holding the public key can reject a forged or corrupted
//!   artifact without touching the session store

pub mod artifact;
pub mod error;
pub mod keys;

pub use artifact::{ArtifactClaims, BearerArtifact};
pub use error::Error;
pub use keys::{KeyPair, PublicKey};

/// Result type for doorman-core operations
pub type Result<T> = std::result::Result<T, Error>;
