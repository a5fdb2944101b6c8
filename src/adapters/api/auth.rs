//! Ledger Authentication - HMAC-SHA256 Request Signing
//!
//! Signs every ledger API request with the session secret. Credentials
//! come from environment variables (LEDGER_CLIENT_ID, LEDGER_SESSION_ID,
//! LEDGER_SESSION_SECRET) and are never read from config files.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use base64::Engine;
use uuid::Uuid;

/// Header values attached to one signed request.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// Exchange's ledger client id.
    pub client_id: String,
    /// Session the signing secret belongs to.
    pub session_id: String,
    /// Unix seconds used in the signature.
    pub timestamp: String,
    /// Base64 HMAC-SHA256 signature.
    pub signature: String,
    /// Unique request id for server-side replay protection.
    pub request_id: String,
}

/// Ledger API authentication handler.
///
/// Holds the client id, session id, and session secret. The secret is
/// only used to compute signatures and is never sent.
pub struct LedgerAuth {
    /// Client id from LEDGER_CLIENT_ID.
    client_id: String,
    /// Session id from LEDGER_SESSION_ID.
    session_id: String,
    /// Session secret from LEDGER_SESSION_SECRET (never sent in headers).
    session_secret: String,
}

impl LedgerAuth {
    /// Build from explicit credentials.
    pub fn new(
        client_id: impl Into<String>,
        session_id: impl Into<String>,
        session_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            session_id: session_id.into(),
            session_secret: session_secret.into(),
        }
    }

    /// Load credentials from environment variables.
    ///
    /// Required env vars: LEDGER_CLIENT_ID, LEDGER_SESSION_ID,
    /// LEDGER_SESSION_SECRET.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("LEDGER_CLIENT_ID")
            .context("LEDGER_CLIENT_ID not set")?;
        let session_id = std::env::var("LEDGER_SESSION_ID")
            .context("LEDGER_SESSION_ID not set")?;
        let session_secret = std::env::var("LEDGER_SESSION_SECRET")
            .context("LEDGER_SESSION_SECRET not set")?;

        anyhow::ensure!(!session_secret.is_empty(), "LEDGER_SESSION_SECRET is empty");

        Ok(Self::new(client_id, session_id, session_secret))
    }

    /// Client id for request headers.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current Unix timestamp in seconds (for signing).
    pub fn timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string()
    }

    /// Sign a request using HMAC-SHA256.
    ///
    /// Signature format: HMAC-SHA256(secret, timestamp + method + path + body)
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let message = format!("{timestamp}{method}{path}{body}");
        let mac = hmac_sha256::HMAC::mac(message.as_bytes(), self.session_secret.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac)
    }

    /// Build all authentication headers for a request.
    pub fn auth_headers(&self, method: &str, path: &str, body: &str) -> AuthHeaders {
        let timestamp = Self::timestamp();
        let signature = self.sign(&timestamp, method, path, body);
        AuthHeaders {
            client_id: self.client_id.clone(),
            session_id: self.session_id.clone(),
            timestamp,
            signature,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}
