//! Domain layer types.
//!
//! Stored email records, provider labels, identifier newtypes, and the
//! declarative rule model evaluated by the processing stage.

mod email;
mod label;
pub mod rule;
mod types;

pub use email::{EmailRecord, NewEmailRecord, RECORD_DATE_FORMAT};
pub use label::{system_labels, Label};
pub use rule::{
    Actions, CollectivePredicate, Condition, Field, NamedRule, Predicate, Rule, RuleError, RuleSet,
};
pub use types::{EmailId, LabelId};
