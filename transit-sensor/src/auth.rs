//! Access tokens for the credentialed backend.
//!
//! Token lifecycle is kept out of the fetch path: before each fetch the
//! coordinator asks its `TokenGuard` to make sure the credential is usable,
//! and gets back a typed outcome.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Errors from obtaining an access token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token endpoint could not be reached or answered garbage.
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),

    /// Credentials were rejected.
    #[error("credentials rejected (status {status})")]
    Rejected { status: u16 },

    /// The token response had no access token in it.
    #[error("token response contained no access token")]
    MissingToken,

    /// No issuer is configured for this backend.
    #[error("no token issuer configured")]
    NotConfigured,
}

/// An OAuth access token with its expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    /// Expiry as Unix seconds. The token endpoint sends this as a string.
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub expires_on: i64,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_on: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_on,
        }
    }

    /// Whether the token must be replaced before use.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_on
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EpochSeconds {
    Number(i64),
    Text(String),
}

fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match EpochSeconds::deserialize(deserializer)? {
        EpochSeconds::Number(n) => Ok(n),
        EpochSeconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Something that can issue a fresh access token.
pub trait TokenIssuer: Send + Sync {
    fn issue_token(&self) -> impl Future<Output = Result<Credential, AuthError>> + Send;
}

/// Issuer for backends that need no credential. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenIssuer for Anonymous {
    async fn issue_token(&self) -> Result<Credential, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

/// Result of the pre-fetch credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    /// The current token is still valid.
    Unchanged,
    /// The token was expired or missing and has been replaced.
    Refreshed,
    /// A new token was needed but could not be obtained.
    Failed(AuthError),
}

/// Owns a credential and refreshes it in place when it expires.
#[derive(Debug)]
pub struct TokenGuard<I> {
    issuer: I,
    credential: Option<Credential>,
}

impl<I: TokenIssuer> TokenGuard<I> {
    /// Create a guard, optionally seeded with a token obtained at setup.
    pub fn new(issuer: I, initial: Option<Credential>) -> Self {
        Self {
            issuer,
            credential: initial,
        }
    }

    /// Make sure a non-expired credential is available at `now`.
    ///
    /// On failure the old credential is kept; it is expired anyway, so the
    /// next call will try again.
    pub async fn ensure_fresh(&mut self, now: DateTime<Utc>) -> TokenOutcome {
        if let Some(credential) = &self.credential
            && !credential.is_expired(now)
        {
            return TokenOutcome::Unchanged;
        }

        match self.issuer.issue_token().await {
            Ok(credential) if credential.access_token.is_empty() => {
                TokenOutcome::Failed(AuthError::MissingToken)
            }
            Ok(credential) => {
                self.credential = Some(credential);
                TokenOutcome::Refreshed
            }
            Err(e) => TokenOutcome::Failed(e),
        }
    }

    /// The current credential, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Drop the current credential so the next check requests a new one.
    pub fn invalidate(&mut self) {
        self.credential = None;
    }

    pub fn issuer(&self) -> &I {
        &self.issuer
    }
}
