//! Mail provider implementations.
//!
//! This module contains the [`MailProvider`] trait and the Gmail implementation:
//!
//! - [`GmailProvider`] - Gmail API with OAuth 2.0
//!
//! # Example
//!
//! ```ignore
//! use mailrules::providers::email::MailProvider;
//!
//! async fn list_inbox(provider: &dyn MailProvider) {
//!     let ids = provider
//!         .list_message_ids("INBOX", 10)
//!         .await
//!         .expect("failed to list messages");
//!
//!     for id in ids {
//!         let message = provider.get_message(&id).await.expect("failed to fetch");
//!         println!("{}: {}", id, message.header("Subject").unwrap_or_default());
//!     }
//! }
//! ```

mod gmail;
mod traits;

pub use gmail::{GmailProvider, GMAIL_API_BASE, GMAIL_SCOPES};
pub use traits::{MailProvider, MessageHeader, ProviderError, ProviderMessage, Result};

#[cfg(test)]
pub use traits::MockMailProvider;
