//! External service providers.
//!
//! - [`email`] - Mail providers (Gmail API)

pub mod email;
