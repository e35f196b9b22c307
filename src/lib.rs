//! mailrules - rule-driven Gmail triage
//!
//! This crate fetches recent messages from a Gmail mailbox into a local SQLite
//! store, then evaluates a JSON rule set against every stored record and
//! applies the matching rules' actions (mark read/unread, move to a label)
//! back through the Gmail API.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
