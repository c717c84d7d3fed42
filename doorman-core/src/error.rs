//! Error types for doorman-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
