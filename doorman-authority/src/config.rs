//! Authority configuration

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use doorman_core::KeyPair;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database path; in-memory stores when unset
    pub database: Option<String>,

    /// File holding the base64url-encoded 32-byte signing seed
    pub key_file: String,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Optional cap on live sessions per account
    pub max_concurrent_sessions: Option<usize>,
}

impl Config {
    /// Read configuration from `DOORMAN_*` environment variables,
    /// falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("DOORMAN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database: env::var("DOORMAN_DATABASE").ok(),
            key_file: env::var("DOORMAN_KEY_FILE").unwrap_or(defaults.key_file),
            session_ttl_hours: env::var("DOORMAN_SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_ttl_hours),
            max_concurrent_sessions: env::var("DOORMAN_MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database: None,
            key_file: "doorman.key".to_string(),
            session_ttl_hours: 24,
            max_concurrent_sessions: None,
        }
    }
}

/// Load the signing keypair from `path`, generating and persisting a
/// fresh seed on first boot
pub fn load_or_generate_signing_key(path: &str) -> anyhow::Result<KeyPair> {
    if Path::new(path).exists() {
        let encoded = fs::read_to_string(path)
            .with_context(|| format!("failed to read signing key file {path}"))?;
        let seed = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .context("signing key file is not valid base64url")?;
        let keypair = KeyPair::from_seed(&seed).context("signing key seed rejected")?;
        Ok(keypair)
    } else {
        let keypair = KeyPair::generate();
        fs::write(path, URL_SAFE_NO_PAD.encode(keypair.secret_bytes()))
            .with_context(|| format!("failed to write signing key file {path}"))?;
        Ok(keypair)
    }
}
