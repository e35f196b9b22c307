//! Record and credential storage.
//!
//! - SQLite database holding the `email_details` record table
//! - JSON token file holding the provider's OAuth credentials

mod database;
pub mod queries;
mod schema;
pub mod token_store;

pub use database::{Database, DatabaseError, Result};
pub use token_store::{AuthorizedUser, TokenError, TokenStore};
