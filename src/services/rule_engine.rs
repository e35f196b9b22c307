//! Rule evaluation against stored records.
//!
//! The [`RuleEngine`] walks its [`RuleSet`] in declared order and reports
//! every active rule whose conditions hold for a record. It performs no I/O;
//! acting on the result is the dispatcher's job.

use chrono::NaiveDateTime;

use crate::domain::rule::{parse_rule_date, Result};
use crate::domain::{
    Actions, CollectivePredicate, Condition, EmailRecord, Field, Predicate, Rule, RuleError,
    RuleSet, RECORD_DATE_FORMAT,
};

/// A rule that matched a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggeredRule<'a> {
    pub name: &'a str,
    pub actions: &'a Actions,
}

/// Evaluates an ordered rule set.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: RuleSet,
}

impl RuleEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the active rules matching `record`, in rule order.
    ///
    /// Fails on the first malformed date encountered; no partial result is
    /// returned in that case.
    pub fn evaluate(&self, record: &EmailRecord) -> Result<Vec<TriggeredRule<'_>>> {
        let mut triggered = Vec::new();

        for named in self.rules.iter() {
            if !named.rule.active {
                continue;
            }

            if rule_matches(record, &named.rule)? {
                tracing::debug!(rule = %named.name, row_id = record.row_id, "Rule triggered");
                triggered.push(TriggeredRule {
                    name: &named.name,
                    actions: &named.rule.actions,
                });
            }
        }

        Ok(triggered)
    }
}

/// Applies the rule's collective predicate to its conditions.
///
/// Short-circuits in list order, so a malformed date after the deciding
/// condition is never reached. An empty `All` is true, an empty `Any` false.
pub fn rule_matches(record: &EmailRecord, rule: &Rule) -> Result<bool> {
    match rule.collective_predicate {
        CollectivePredicate::All => {
            for condition in &rule.conditions {
                if !evaluate_condition(record, condition)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CollectivePredicate::Any => {
            for condition in &rule.conditions {
                if evaluate_condition(record, condition)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Tests one condition against a record.
pub fn evaluate_condition(record: &EmailRecord, condition: &Condition) -> Result<bool> {
    let text = match &condition.field {
        Field::Subject => record.subject.as_deref(),
        Field::Sender => record.sender.as_deref(),
        Field::Receiver => record.receiver.as_deref(),
        Field::Message => record.message.as_deref(),
        Field::Date => return evaluate_date(record, condition),
        Field::Unrecognized(_) => return Ok(false),
    };

    let Some(text) = text else {
        return Ok(false);
    };

    Ok(match condition.predicate {
        Predicate::Contains => text.contains(condition.value.as_str()),
        Predicate::DoesNotContain => !text.contains(condition.value.as_str()),
        _ => false,
    })
}

fn evaluate_date(record: &EmailRecord, condition: &Condition) -> Result<bool> {
    let compare: fn(&NaiveDateTime, &NaiveDateTime) -> bool = match condition.predicate {
        Predicate::GreaterThan => |record, rule| record > rule,
        Predicate::LesserThan => |record, rule| record < rule,
        _ => return Ok(false),
    };

    let Some(raw) = record.date.as_deref() else {
        return Ok(false);
    };

    let record_date = parse_record_date(raw)?;
    let rule_date = parse_rule_date(&condition.value)?;
    Ok(compare(&record_date, &rule_date))
}

/// Parses a stored `YYYY-MM-DD HH:MM:SS` date.
pub fn parse_record_date(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, RECORD_DATE_FORMAT).map_err(|_| {
        RuleError::MalformedDate {
            value: value.to_string(),
            expected: RECORD_DATE_FORMAT,
        }
    })
}
