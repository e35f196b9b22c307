//! Stored email records.

use serde::{Deserialize, Serialize};

use super::EmailId;

/// Timestamp layout used for the `date` column.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of the `email_details` table.
///
/// Every column except `row_id` is nullable in storage. Ingestion always
/// populates them, but rows written by other tools may not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Surrogate key assigned by the database.
    pub row_id: i64,
    /// Provider message id.
    pub identifier: Option<EmailId>,
    /// Subject header.
    pub subject: Option<String>,
    /// From header, as formatted by the provider.
    pub sender: Option<String>,
    /// To header, as formatted by the provider.
    pub receiver: Option<String>,
    /// Send date in [`RECORD_DATE_FORMAT`].
    pub date: Option<String>,
    /// Normalized body text.
    pub message: Option<String>,
}

/// Fields written by ingestion; the database assigns the row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmailRecord {
    pub identifier: EmailId,
    pub subject: String,
    pub sender: String,
    pub receiver: String,
    pub date: String,
    pub message: String,
}

impl NewEmailRecord {
    /// Builds the record as it reads back from storage under `row_id`.
    pub fn into_record(self, row_id: i64) -> EmailRecord {
        EmailRecord {
            row_id,
            identifier: Some(self.identifier),
            subject: Some(self.subject),
            sender: Some(self.sender),
            receiver: Some(self.receiver),
            date: Some(self.date),
            message: Some(self.message),
        }
    }
}
