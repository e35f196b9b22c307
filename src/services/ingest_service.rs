//! Fetch-and-store pass over the configured mailbox.
//!
//! The [`IngestService`] lists recent message ids, fetches each message it has
//! not stored yet, and writes one normalized row per message.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalizer::clean_email_content;
use crate::domain::{EmailId, NewEmailRecord, RECORD_DATE_FORMAT};
use crate::providers::email::{MailProvider, ProviderError, ProviderMessage};
use crate::storage::queries::emails;
use crate::storage::{Database, DatabaseError};

/// Default mailbox label to read from.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Default number of message ids requested per run.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Errors raised while ingesting messages.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("message {email_id} has no {header} header")]
    MissingHeader {
        email_id: EmailId,
        header: &'static str,
    },

    #[error("unparseable Date header '{0}'")]
    MalformedDate(String),
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Message ids returned by the provider.
    pub listed: usize,
    /// Newly stored messages.
    pub stored: usize,
    /// Messages already present in the store.
    pub skipped: usize,
    /// Per-message failures (non-fatal).
    pub errors: Vec<String>,
}

impl IngestReport {
    /// Returns true if every listed message was stored or skipped.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fetches messages from the provider into the record store.
pub struct IngestService {
    db: Database,
    provider: Arc<dyn MailProvider>,
    mailbox: String,
    page_size: u32,
}

impl IngestService {
    pub fn new(db: Database, provider: Arc<dyn MailProvider>) -> Self {
        Self {
            db,
            provider,
            mailbox: DEFAULT_MAILBOX.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Runs one ingestion pass.
    ///
    /// Schema and listing failures abort the run. Failures on individual
    /// messages are logged, recorded in the report, and skipped.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        tracing::info!("Fetching & Saving Emails");

        self.db.ensure_schema().await?;
        let ids = self
            .provider
            .list_message_ids(&self.mailbox, self.page_size)
            .await?;

        let total = ids.len();
        let mut report = IngestReport {
            listed: total,
            ..Default::default()
        };

        for (i, id) in ids.iter().enumerate() {
            match self.ingest_one(id).await {
                Ok(true) => report.stored += 1,
                Ok(false) => {
                    tracing::debug!(email_id = %id, "Already stored, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(email_id = %id, error = %e, "Failed to store email");
                    report.errors.push(format!("{}: {}", id, e));
                }
            }
            tracing::info!("processed {}/{}", i + 1, total);
        }

        let in_store = emails::count(&self.db).await?;
        tracing::info!(
            stored = report.stored,
            skipped = report.skipped,
            failed = report.errors.len(),
            in_store,
            "Fetching & Saving Emails completed"
        );
        Ok(report)
    }

    /// Returns `Ok(false)` when the message was already stored.
    async fn ingest_one(&self, id: &EmailId) -> Result<bool, IngestError> {
        if emails::exists(&self.db, id).await? {
            return Ok(false);
        }

        let message = self.provider.get_message(id).await?;
        let record = record_from_message(&message)?;
        let row_id = emails::insert(&self.db, &record).await?;
        tracing::debug!(email_id = %id, row_id, "Stored email");
        Ok(true)
    }
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("db", &self.db)
            .field("mailbox", &self.mailbox)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Builds the stored row for a fetched message.
pub fn record_from_message(message: &ProviderMessage) -> Result<NewEmailRecord, IngestError> {
    let header = |name: &'static str| {
        message
            .header(name)
            .map(str::to_string)
            .ok_or_else(|| IngestError::MissingHeader {
                email_id: message.id.clone(),
                header: name,
            })
    };

    Ok(NewEmailRecord {
        identifier: message.id.clone(),
        subject: header("Subject")?,
        sender: header("From")?,
        receiver: header("To")?,
        date: normalize_date(&header("Date")?)?,
        message: clean_email_content(&message.snippet),
    })
}

/// Converts an RFC 2822 `Date` header to `YYYY-MM-DD HH:MM:SS`.
///
/// The wall-clock time is kept in the header's own offset. Headers chrono
/// cannot read (a weekday that disagrees with the date, for one) go through
/// mailparse's lenient parser and are shifted back to the header's numeric
/// offset; without one they are rendered in UTC.
pub fn normalize_date(value: &str) -> Result<String, IngestError> {
    let trimmed = strip_zone_comment(value);

    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(parsed.naive_local().format(RECORD_DATE_FORMAT).to_string());
    }

    let utc = mailparse::dateparse(trimmed)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| IngestError::MalformedDate(value.to_string()))?;

    let local = match trailing_offset(trimmed) {
        Some(offset) => utc.with_timezone(&offset).naive_local(),
        None => utc.naive_utc(),
    };
    Ok(local.format(RECORD_DATE_FORMAT).to_string())
}

/// Parses a final `+hhmm` / `-hhmm` token.
fn trailing_offset(value: &str) -> Option<FixedOffset> {
    let token = value.split_whitespace().last()?;
    let (sign, digits) = if let Some(digits) = token.strip_prefix('+') {
        (1, digits)
    } else if let Some(digits) = token.strip_prefix('-') {
        (-1, digits)
    } else {
        return None;
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Drops a trailing parenthesized comment such as `(UTC)`.
fn strip_zone_comment(value: &str) -> &str {
    let trimmed = value.trim();
    match (trimmed.ends_with(')'), trimmed.rfind('(')) {
        (true, Some(open)) => trimmed[..open].trim_end(),
        _ => trimmed,
    }
}
