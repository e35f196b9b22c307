//! Mail provider trait definition.
//!
//! [`MailProvider`] is the narrow surface the ingestion and processing
//! services need from a mailbox: list ids, fetch one message, flip the unread
//! marker, add a label, and list labels.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{EmailId, Label, LabelId};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fully fetched message, reduced to what ingestion stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Provider message id.
    pub id: EmailId,
    /// Top-level headers in the order the provider returned them.
    pub headers: Vec<MessageHeader>,
    /// Provider-generated body excerpt; may contain HTML entities.
    pub snippet: String,
}

impl ProviderMessage {
    /// Returns the value of the first header whose name matches
    /// case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Mailbox operations used by the services.
///
/// Implementations must be authenticated before these are called; an
/// unauthenticated call fails with [`ProviderError::Authentication`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Lists up to `max_results` message ids carrying the `folder` label,
    /// newest first.
    async fn list_message_ids(&self, folder: &str, max_results: u32) -> Result<Vec<EmailId>>;

    /// Fetches one message in full.
    async fn get_message(&self, id: &EmailId) -> Result<ProviderMessage>;

    /// Adds (`add = true`) or removes the unread marker.
    async fn set_unread_label(&self, id: &EmailId, add: bool) -> Result<()>;

    /// Adds a label to a message.
    async fn add_label(&self, id: &EmailId, label_id: &LabelId) -> Result<()>;

    /// Lists every label in the mailbox.
    async fn list_labels(&self) -> Result<Vec<Label>>;
}
