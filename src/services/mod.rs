//! Business services layer.
//!
//! This module contains the services that orchestrate the two runs, coordinating
//! between the mail provider, the record store, and the rule set.
//!
//! # Architecture
//!
//! ```text
//!        CLI (fetch / process)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Storage)
//! ```
//!
//! # Services Overview
//!
//! - [`IngestService`]: Lists, fetches, normalizes, and stores messages
//! - [`ProcessService`]: Evaluates stored records and applies rule actions
//! - [`RuleEngine`]: Pure rule evaluation
//! - [`ActionDispatcher`]: Turns rule actions into provider mutations

mod action_dispatcher;
mod ingest_service;
mod normalizer;
mod process_service;
mod rule_engine;

pub use action_dispatcher::{ActionDispatcher, DispatchOutcome, FolderOutcome};
pub use ingest_service::{
    normalize_date, record_from_message, IngestError, IngestReport, IngestService,
    DEFAULT_MAILBOX, DEFAULT_PAGE_SIZE,
};
pub use normalizer::clean_email_content;
pub use process_service::{ProcessReport, ProcessService};
pub use rule_engine::{
    evaluate_condition, parse_record_date, rule_matches, RuleEngine, TriggeredRule,
};
