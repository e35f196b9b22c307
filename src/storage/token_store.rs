//! File-backed OAuth token storage.
//!
//! Holds the "authorized user" JSON blob Google's client libraries write to
//! `token.json`, so an existing token file can be reused as-is.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Errors that can occur while reading or writing the token file.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(
        "no token file at {0}; authorize the application once and place its token.json there"
    )]
    NotFound(PathBuf),

    #[error("token file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for token store operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// OAuth credentials for an authorized user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token, if one has been issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Endpoint used to refresh the access token.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Scopes granted to the token.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When the access token stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl AuthorizedUser {
    /// Returns true when the access token is missing or about to expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_none() {
            return true;
        }

        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Reads and writes the token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credentials.
    pub async fn load(&self) -> Result<AuthorizedUser> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&json)?)
    }

    /// Overwrites the token file with the given credentials.
    pub async fn save(&self, user: &AuthorizedUser) -> Result<()> {
        let json = serde_json::to_string_pretty(user)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!(path = %self.path.display(), "Token file updated");
        Ok(())
    }
}
