//! Rule pass over every stored record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::action_dispatcher::{ActionDispatcher, FolderOutcome};
use super::rule_engine::RuleEngine;
use crate::providers::email::MailProvider;
use crate::storage::queries::emails;
use crate::storage::{Database, DatabaseError};

/// Summary of one processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Records read from the store.
    pub records_processed: usize,
    /// Rule matches across all records.
    pub rules_triggered: usize,
    /// Matches whose actions all went through.
    pub actions_dispatched: usize,
    /// Folder moves skipped because no label had the requested name.
    pub folders_missing: usize,
    /// Errors encountered (non-fatal).
    pub errors: Vec<String>,
}

impl ProcessReport {
    /// Returns true if the run completed without errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Evaluates stored records and applies matching rules' actions.
pub struct ProcessService {
    db: Database,
    engine: RuleEngine,
    dispatcher: ActionDispatcher,
}

impl ProcessService {
    pub fn new(db: Database, provider: Arc<dyn MailProvider>, engine: RuleEngine) -> Self {
        Self {
            db,
            engine,
            dispatcher: ActionDispatcher::new(provider),
        }
    }

    /// Runs one processing pass over every stored record, oldest row first.
    ///
    /// Only store failures abort the run. A record with a malformed date is
    /// skipped; a failed action is recorded and processing moves on.
    pub async fn run(&self) -> Result<ProcessReport, DatabaseError> {
        tracing::info!("Processing Emails");

        self.db.ensure_schema().await?;
        let records = emails::fetch_all(&self.db).await?;

        let mut report = ProcessReport {
            records_processed: records.len(),
            ..Default::default()
        };

        for record in &records {
            let triggered = match self.engine.evaluate(record) {
                Ok(triggered) => triggered,
                Err(e) => {
                    tracing::warn!(row_id = record.row_id, error = %e, "Skipping record");
                    report.errors.push(format!("row {}: {}", record.row_id, e));
                    continue;
                }
            };

            if triggered.is_empty() {
                continue;
            }

            let Some(id) = record.identifier.as_ref() else {
                tracing::warn!(row_id = record.row_id, "Record has no message id, cannot apply actions");
                report.rules_triggered += triggered.len();
                report
                    .errors
                    .push(format!("row {}: no message id", record.row_id));
                continue;
            };

            for rule in triggered {
                report.rules_triggered += 1;
                tracing::info!(email_id = %id, rule = rule.name, "Applying rule");

                let outcome = self.dispatcher.dispatch(id, rule.actions).await;
                if matches!(outcome.folder, Ok(FolderOutcome::NotFound(_))) {
                    report.folders_missing += 1;
                }
                if outcome.is_success() {
                    report.actions_dispatched += 1;
                }
                for e in outcome.errors() {
                    report.errors.push(format!("{} ({}): {}", id, rule.name, e));
                }
            }
        }

        tracing::info!(
            records = report.records_processed,
            triggered = report.rules_triggered,
            dispatched = report.actions_dispatched,
            failed = report.errors.len(),
            "Processing Emails completed"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ProcessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessService")
            .field("db", &self.db)
            .field("rules", &self.engine.rules().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Actions, CollectivePredicate, Condition, EmailId, Field, Label, LabelId, NamedRule,
        NewEmailRecord, Predicate, Rule, RuleSet,
    };
    use crate::providers::email::{MockMailProvider, ProviderError};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn new_record(id: &str, subject: &str, date: &str) -> NewEmailRecord {
        NewEmailRecord {
            identifier: EmailId::from(id),
            subject: subject.to_string(),
            sender: "news@shop.example".to_string(),
            receiver: "me@example.com".to_string(),
            date: date.to_string(),
            message: "body".to_string(),
        }
    }

    fn subject_rule(needle: &str, folder: Option<&str>) -> Rule {
        Rule {
            active: true,
            collective_predicate: CollectivePredicate::All,
            conditions: vec![Condition::new(Field::Subject, Predicate::Contains, needle)],
            actions: Actions {
                mark_as_read: true,
                move_to_folder: folder.map(str::to_string),
            },
        }
    }

    fn date_rule() -> Rule {
        Rule {
            active: true,
            collective_predicate: CollectivePredicate::All,
            conditions: vec![Condition::new(Field::Date, Predicate::GreaterThan, "2020-01-01")],
            actions: Actions {
                mark_as_read: false,
                move_to_folder: None,
            },
        }
    }

    async fn seeded_db(records: &[NewEmailRecord]) -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("records.db")).await.unwrap();
        db.ensure_schema().await.unwrap();
        for record in records {
            emails::insert(&db, record).await.unwrap();
        }
        (dir, db)
    }

    #[tokio::test]
    async fn dispatches_matching_rules() {
        let (_dir, db) = seeded_db(&[
            new_record("m1", "Big Sale", "2023-01-01 00:00:00"),
            new_record("m2", "Meeting notes", "2023-01-02 00:00:00"),
        ])
        .await;

        let mut provider = MockMailProvider::new();
        provider
            .expect_set_unread_label()
            .with(eq(EmailId::from("m1")), eq(false))
            .times(1)
            .returning(|_, _| Ok(()));
        provider
            .expect_list_labels()
            .times(1)
            .returning(|| Ok(vec![Label::new("Label_4", "Promotions")]));
        provider
            .expect_add_label()
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = RuleEngine::new(RuleSet::new(vec![NamedRule::new(
            "Sales",
            subject_rule("Sale", Some("Promotions")),
        )]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert_eq!(
            report,
            ProcessReport {
                records_processed: 2,
                rules_triggered: 1,
                actions_dispatched: 1,
                folders_missing: 0,
                errors: vec![],
            }
        );
    }

    #[tokio::test]
    async fn malformed_record_date_skips_record() {
        let (_dir, db) = seeded_db(&[
            new_record("bad", "Sale", "01/01/2023"),
            new_record("good", "Sale", "2023-01-01 00:00:00"),
        ])
        .await;

        let mut provider = MockMailProvider::new();
        provider
            .expect_set_unread_label()
            .with(eq(EmailId::from("good")), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = RuleEngine::new(RuleSet::new(vec![NamedRule::new("Dated", date_rule())]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert_eq!(report.records_processed, 2);
        assert_eq!(report.actions_dispatched, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("row 1:"));
    }

    #[tokio::test]
    async fn dispatch_failure_continues_with_next_rule() {
        let (_dir, db) = seeded_db(&[new_record("m1", "Sale", "2023-01-01 00:00:00")]).await;

        let mut provider = MockMailProvider::new();
        provider
            .expect_set_unread_label()
            .with(eq(EmailId::from("m1")), eq(false))
            .times(1)
            .returning(|_, _| Err(ProviderError::RateLimited { retry_after_secs: None }));
        provider
            .expect_set_unread_label()
            .with(eq(EmailId::from("m1")), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = RuleEngine::new(RuleSet::new(vec![
            NamedRule::new("Sales", subject_rule("Sale", None)),
            NamedRule::new("Dated", date_rule()),
        ]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert_eq!(report.rules_triggered, 2);
        assert_eq!(report.actions_dispatched, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Sales"));
    }

    #[tokio::test]
    async fn read_failure_and_move_are_reported_separately() {
        let (_dir, db) = seeded_db(&[new_record("m1", "Sale", "2023-01-01 00:00:00")]).await;

        let mut provider = MockMailProvider::new();
        provider
            .expect_set_unread_label()
            .returning(|_, _| Err(ProviderError::Connection("reset".to_string())));
        provider
            .expect_list_labels()
            .returning(|| Ok(vec![Label::new("Label_4", "Promotions")]));
        provider
            .expect_add_label()
            .with(eq(EmailId::from("m1")), eq(LabelId::from("Label_4")))
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = RuleEngine::new(RuleSet::new(vec![NamedRule::new(
            "Sales",
            subject_rule("Sale", Some("Promotions")),
        )]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert_eq!(report.rules_triggered, 1);
        assert_eq!(report.actions_dispatched, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("reset"));
    }

    #[tokio::test]
    async fn missing_folder_is_counted_not_failed() {
        let (_dir, db) = seeded_db(&[new_record("m1", "Sale", "2023-01-01 00:00:00")]).await;

        let mut provider = MockMailProvider::new();
        provider.expect_set_unread_label().returning(|_, _| Ok(()));
        provider.expect_list_labels().returning(|| Ok(vec![]));
        provider.expect_add_label().never();

        let engine = RuleEngine::new(RuleSet::new(vec![NamedRule::new(
            "Sales",
            subject_rule("Sale", Some("Nowhere")),
        )]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.folders_missing, 1);
    }

    #[tokio::test]
    async fn empty_store_does_nothing() {
        let (_dir, db) = seeded_db(&[]).await;
        let provider = MockMailProvider::new();

        let engine = RuleEngine::new(RuleSet::new(vec![NamedRule::new("Dated", date_rule())]));
        let report = ProcessService::new(db, Arc::new(provider), engine)
            .run()
            .await
            .unwrap();

        assert_eq!(report, ProcessReport::default());
    }
}
