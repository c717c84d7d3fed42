//! Bearer artifacts for doorman
//!
//! A bearer artifact is the compact signed token handed to a client on
//! login and presented on every authenticated request. It is
//! self-contained: signature and expiry can be checked without a store
//! lookup. Liveness (revocation, account status) still requires the
//! session store and is the authority's job, not this module's.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, KeyPair, PublicKey, Result};

/// Claims embedded in a bearer artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactClaims {
    /// Session id the artifact is bound to
    pub sid: String,

    /// Owning account id
    pub sub: u64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A signed bearer artifact in `header.claims.signature` form
#[derive(Debug, Clone)]
pub struct BearerArtifact {
    /// The encoded token
    encoded: String,
    /// The decoded claims
    claims: ArtifactClaims,
}

impl BearerArtifact {
    /// Encode and sign a new artifact for the given claims
    pub fn seal(claims: ArtifactClaims, key: &KeyPair) -> Result<Self> {
        let encoded = Self::encode_and_sign(&claims, key)?;
        Ok(Self { encoded, claims })
    }

    /// Parse an artifact from its encoded form (does not verify signature)
    pub fn parse(encoded: &str) -> Result<Self> {
        let claims = Self::decode_claims(encoded)?;
        Ok(Self {
            encoded: encoded.to_string(),
            claims,
        })
    }

    /// Verify the artifact signature against a public key
    pub fn verify(&self, public_key: &PublicKey) -> Result<()> {
        Self::verify_signature(&self.encoded, public_key)
    }

    /// Check whether the artifact's own expiry claim has passed
    ///
    /// This is the cheap first-tier check. The stored session's
    /// `expires_at` remains authoritative when the two disagree.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.claims.exp
    }

    /// Get the artifact claims
    pub fn claims(&self) -> &ArtifactClaims {
        &self.claims
    }

    /// Get the encoded token
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Consume the artifact, returning the encoded token
    pub fn into_encoded(self) -> String {
        self.encoded
    }

    // Internal: encode claims and sign
    fn encode_and_sign(claims: &ArtifactClaims, key: &KeyPair) -> Result<String> {
        let header = r#"{"alg":"EdDSA","typ":"JWT"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);

        let claims_json = serde_json::to_string(claims)?;
        let claims_b64 = URL_SAFE_NO_PAD.encode(&claims_json);

        let message = format!("{}.{}", header_b64, claims_b64);
        let signature = key.sign(message.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(&signature);

        Ok(format!("{}.{}", message, sig_b64))
    }

    // Internal: decode claims
    fn decode_claims(encoded: &str) -> Result<ArtifactClaims> {
        let parts: Vec<&str> = encoded.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidArtifact("expected 3 token parts".into()));
        }

        let claims_bytes = URL_SAFE_NO_PAD.decode(parts[1])?;
        let claims: ArtifactClaims = serde_json::from_slice(&claims_bytes)?;

        Ok(claims)
    }

    // Internal: verify signature
    fn verify_signature(encoded: &str, public_key: &PublicKey) -> Result<()> {
        let parts: Vec<&str> = encoded.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidArtifact("expected 3 token parts".into()));
        }

        let message = format!("{}.{}", parts[0], parts[1]);
        let signature = URL_SAFE_NO_PAD.decode(parts[2])?;

        public_key.verify(message.as_bytes(), &signature)
    }
}
