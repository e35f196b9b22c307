//! Declarative processing rules.
//!
//! A rule file maps rule names to a [`Rule`]: an activity flag, a flat list of
//! [`Condition`]s combined with [`CollectivePredicate::All`] or
//! [`CollectivePredicate::Any`], and the [`Actions`] to fire on a match.
//!
//! ```json
//! [
//!   {
//!     "Newsletter": {
//!       "active": 1,
//!       "collective_predicate": "Any",
//!       "conditions": [
//!         { "field": "sender", "predicate": "contains", "value": "news@" },
//!         { "field": "date", "predicate": "lesser than", "value": "2024-01-01" }
//!       ],
//!       "actions": { "mark_as_read": true, "move_to_folder": "Newsletters" }
//!     }
//!   }
//! ]
//! ```
//!
//! Unknown condition fields and predicates are kept as-is and evaluate to
//! false, so a newer rule file degrades instead of failing the whole batch.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Calendar date layout accepted in `date` conditions.
pub const RULE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while loading or evaluating rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rule file must be a JSON array of objects or a JSON object")]
    UnexpectedShape,

    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("malformed date '{value}', expected format {expected}")]
    MalformedDate {
        value: String,
        expected: &'static str,
    },
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Record field a condition inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Field {
    Subject,
    Sender,
    Receiver,
    Message,
    Date,
    /// A field name this version does not know.
    Unrecognized(String),
}

impl Field {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subject => "subject",
            Self::Sender => "sender",
            Self::Receiver => "receiver",
            Self::Message => "message",
            Self::Date => "date",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        match s.as_str() {
            "subject" => Self::Subject,
            "sender" => Self::Sender,
            "receiver" => Self::Receiver,
            "message" => Self::Message,
            "date" => Self::Date,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        match field {
            Field::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison a condition applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Predicate {
    Contains,
    DoesNotContain,
    GreaterThan,
    LesserThan,
    /// A predicate this version does not know.
    Unrecognized(String),
}

impl Predicate {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains => "contains",
            Self::DoesNotContain => "does not contain",
            Self::GreaterThan => "greater than",
            Self::LesserThan => "lesser than",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for Predicate {
    fn from(s: String) -> Self {
        match s.as_str() {
            "contains" => Self::Contains,
            "does not contain" => Self::DoesNotContain,
            "greater than" => Self::GreaterThan,
            "lesser than" => Self::LesserThan,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<Predicate> for String {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule combines its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectivePredicate {
    /// Every condition must hold.
    All,
    /// At least one condition must hold.
    Any,
}

/// A single test against one record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub predicate: Predicate,
    pub value: String,
}

impl Condition {
    pub fn new(field: Field, predicate: Predicate, value: impl Into<String>) -> Self {
        Self {
            field,
            predicate,
            value: value.into(),
        }
    }
}

/// Provider mutations fired when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actions {
    /// `true` marks the message read, `false` marks it unread.
    pub mark_as_read: bool,
    /// Name of the label to apply, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_to_folder: Option<String>,
}

/// A rule body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Inactive rules are skipped. Accepts `true`/`false` or a number, where
    /// only a value equal to 1 is active.
    #[serde(default, deserialize_with = "deserialize_active")]
    pub active: bool,
    pub collective_predicate: CollectivePredicate,
    pub conditions: Vec<Condition>,
    pub actions: Actions,
}

fn deserialize_active<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(active) => active,
        Flag::Int(n) => n == 1,
        Flag::Float(n) => n == 1.0,
    })
}

/// A rule together with the name it was declared under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRule {
    pub name: String,
    pub rule: Rule,
}

impl NamedRule {
    pub fn new(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

/// An ordered, immutable collection of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<NamedRule>,
}

impl RuleSet {
    /// Wraps already-built rules without validating them.
    pub fn new(rules: Vec<NamedRule>) -> Self {
        Self { rules }
    }

    /// Reads and validates a rule file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let rules = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), rules = rules.len(), "Loaded rule file");
        Ok(rules)
    }

    /// Parses and validates rules from JSON text.
    ///
    /// Accepts either an array of objects (each mapping names to rules) or a
    /// single object. Declaration order is preserved.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)?;

        let entries: Vec<(String, Value)> = match document {
            Value::Array(items) => {
                let mut entries = Vec::new();
                for item in items {
                    match item {
                        Value::Object(map) => entries.extend(map),
                        _ => return Err(RuleError::UnexpectedShape),
                    }
                }
                entries
            }
            Value::Object(map) => map.into_iter().collect(),
            _ => return Err(RuleError::UnexpectedShape),
        };

        let rules = entries
            .into_iter()
            .map(|(name, value)| {
                let rule = serde_json::from_value(value).map_err(|e| RuleError::InvalidRule {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                Ok(NamedRule { name, rule })
            })
            .collect::<Result<Vec<_>>>()?;

        let set = Self::new(rules);
        set.validate()?;
        Ok(set)
    }

    /// Rejects rules without conditions and date comparisons whose value
    /// cannot be parsed. Date conditions with other predicates are left to
    /// evaluate to false.
    pub fn validate(&self) -> Result<()> {
        for named in &self.rules {
            if named.rule.conditions.is_empty() {
                return Err(RuleError::InvalidRule {
                    name: named.name.clone(),
                    reason: "rule has no conditions".to_string(),
                });
            }

            for condition in &named.rule.conditions {
                let compares_dates = condition.field == Field::Date
                    && matches!(
                        condition.predicate,
                        Predicate::GreaterThan | Predicate::LesserThan
                    );
                if compares_dates {
                    parse_rule_date(&condition.value).map_err(|e| RuleError::InvalidRule {
                        name: named.name.clone(),
                        reason: e.to_string(),
                    })?;
                }
            }
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parses a rule's `YYYY-MM-DD` value as midnight of that day.
pub fn parse_rule_date(value: &str) -> Result<NaiveDateTime> {
    let malformed = || RuleError::MalformedDate {
        value: value.to_string(),
        expected: RULE_DATE_FORMAT,
    };

    NaiveDate::parse_from_str(value, RULE_DATE_FORMAT)
        .map_err(|_| malformed())?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RULES_JSON: &str = r#"[
        {
            "Promotions": {
                "active": 1,
                "collective_predicate": "Any",
                "conditions": [
                    {"field": "subject", "predicate": "contains", "value": "Sale"},
                    {"field": "date", "predicate": "greater than", "value": "2023-06-01"}
                ],
                "actions": {"mark_as_read": true, "move_to_folder": "Promotions"}
            },
            "Disabled": {
                "active": 0,
                "collective_predicate": "All",
                "conditions": [
                    {"field": "sender", "predicate": "does not contain", "value": "boss"}
                ],
                "actions": {"mark_as_read": false}
            }
        },
        {
            "Keep unread": {
                "active": true,
                "collective_predicate": "All",
                "conditions": [
                    {"field": "message", "predicate": "contains", "value": "urgent"}
                ],
                "actions": {"mark_as_read": false}
            }
        }
    ]"#;

    fn named<'a>(rules: &'a RuleSet, name: &str) -> &'a Rule {
        rules
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.rule)
            .unwrap()
    }

    #[test]
    fn parses_array_of_objects_in_declared_order() {
        let rules = RuleSet::from_json_str(RULES_JSON).unwrap();

        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Promotions", "Disabled", "Keep unread"]);

        let promotions = named(&rules, "Promotions");
        assert!(promotions.active);
        assert_eq!(promotions.collective_predicate, CollectivePredicate::Any);
        assert_eq!(
            promotions.conditions[1],
            Condition::new(Field::Date, Predicate::GreaterThan, "2023-06-01")
        );
        assert_eq!(
            promotions.actions.move_to_folder.as_deref(),
            Some("Promotions")
        );

        assert!(!named(&rules, "Disabled").active);
        assert!(named(&rules, "Keep unread").active);
    }

    #[test]
    fn parses_single_object_form() {
        let json = r#"{
            "Only": {
                "active": 1,
                "collective_predicate": "All",
                "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(named(&rules, "Only").actions.move_to_folder, None);
    }

    #[test]
    fn active_flag_other_than_one_is_inactive() {
        let json = r#"{
            "Two": {
                "active": 2,
                "collective_predicate": "All",
                "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        assert!(!named(&rules, "Two").active);
    }

    #[test]
    fn fractional_active_flag_compares_numerically() {
        let json = r#"[
            {
                "One": {
                    "active": 1.0,
                    "collective_predicate": "All",
                    "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                    "actions": {"mark_as_read": true}
                },
                "Half": {
                    "active": 0.5,
                    "collective_predicate": "All",
                    "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                    "actions": {"mark_as_read": true}
                }
            }
        ]"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        assert!(named(&rules, "One").active);
        assert!(!named(&rules, "Half").active);
    }

    #[test]
    fn missing_active_flag_is_inactive() {
        let json = r#"{
            "Implicit": {
                "collective_predicate": "Any",
                "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        assert!(!named(&rules, "Implicit").active);
    }

    #[test]
    fn unknown_field_and_predicate_are_preserved() {
        let json = r#"{
            "Future": {
                "active": 1,
                "collective_predicate": "Any",
                "conditions": [{"field": "cc", "predicate": "matches", "value": "x"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        let condition = &named(&rules, "Future").conditions[0];
        assert_eq!(condition.field, Field::Unrecognized("cc".to_string()));
        assert_eq!(condition.predicate, Predicate::Unrecognized("matches".to_string()));
    }

    #[test]
    fn unknown_collective_predicate_is_rejected() {
        let json = r#"{
            "Bad": {
                "active": 1,
                "collective_predicate": "None",
                "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let err = RuleSet::from_json_str(json).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRule { ref name, .. } if name == "Bad"));
    }

    #[test]
    fn missing_mark_as_read_is_rejected() {
        let json = r#"{
            "NoRead": {
                "active": 1,
                "collective_predicate": "All",
                "conditions": [{"field": "subject", "predicate": "contains", "value": "x"}],
                "actions": {"move_to_folder": "Archive"}
            }
        }"#;

        assert!(matches!(
            RuleSet::from_json_str(json),
            Err(RuleError::InvalidRule { .. })
        ));
    }

    #[test]
    fn empty_conditions_are_a_configuration_error() {
        let json = r#"{
            "Empty": {
                "active": 1,
                "collective_predicate": "All",
                "conditions": [],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let err = RuleSet::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("no conditions"));
    }

    #[test]
    fn malformed_rule_date_is_rejected_at_load() {
        let json = r#"{
            "BadDate": {
                "active": 1,
                "collective_predicate": "All",
                "conditions": [{"field": "date", "predicate": "greater than", "value": "01/02/2023"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let err = RuleSet::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("01/02/2023"));
    }

    #[test]
    fn date_condition_with_unknown_predicate_loads() {
        let json = r#"{
            "Future": {
                "active": 1,
                "collective_predicate": "All",
                "conditions": [{"field": "date", "predicate": "within", "value": "7 days"}],
                "actions": {"mark_as_read": true}
            }
        }"#;

        let rules = RuleSet::from_json_str(json).unwrap();
        assert_eq!(
            named(&rules, "Future").conditions[0].predicate,
            Predicate::Unrecognized("within".to_string())
        );
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(matches!(
            RuleSet::from_json_str("[1, 2]"),
            Err(RuleError::UnexpectedShape)
        ));
        assert!(matches!(
            RuleSet::from_json_str("\"rules\""),
            Err(RuleError::UnexpectedShape)
        ));
        assert!(matches!(RuleSet::from_json_str("{"), Err(RuleError::Parse(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuleSet::load(dir.path().join("rules.json")).unwrap_err();
        assert!(matches!(err, RuleError::Io { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, RULES_JSON).unwrap();

        let rules = RuleSet::load(&path).unwrap();
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn parse_rule_date_is_midnight() {
        let parsed = parse_rule_date("2024-01-01").unwrap();
        assert_eq!(parsed.to_string(), "2024-01-01 00:00:00");
        assert!(matches!(
            parse_rule_date("2024-13-01"),
            Err(RuleError::MalformedDate { .. })
        ));
    }

    #[test]
    fn condition_serializes_back_to_rule_file_strings() {
        let condition = Condition::new(Field::Sender, Predicate::DoesNotContain, "boss");
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field": "sender", "predicate": "does not contain", "value": "boss"})
        );
    }
}
