//! Email record operations.

use rusqlite::{params, Row};

use crate::domain::{EmailId, EmailRecord, NewEmailRecord};
use crate::storage::database::{Database, Result};

/// Inserts one record and returns its row id.
pub async fn insert(db: &Database, record: &NewEmailRecord) -> Result<i64> {
    let record = record.clone();

    db.with_conn(move |conn| {
        conn.execute(
            r#"
            INSERT INTO email_details (emailid, subject, sender, receiver, date, message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.identifier.0,
                record.subject,
                record.sender,
                record.receiver,
                record.date,
                record.message,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Returns every record in insertion order.
pub async fn fetch_all(db: &Database) -> Result<Vec<EmailRecord>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, emailid, subject, sender, receiver, date, message
            FROM email_details
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], row_to_record)?;
        let records: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(records?)
    })
    .await
}

/// Returns whether a record with this provider id is already stored.
pub async fn exists(db: &Database, identifier: &EmailId) -> Result<bool> {
    let identifier = identifier.clone();

    db.with_conn(move |conn| {
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM email_details WHERE emailid = ?1)",
            [&identifier.0],
            |row| row.get(0),
        )?;
        Ok(found)
    })
    .await
}

/// Counts stored records.
pub async fn count(db: &Database) -> Result<u32> {
    db.with_conn(|conn| {
        let count: u32 =
            conn.query_row("SELECT COUNT(*) FROM email_details", [], |row| row.get(0))?;
        Ok(count)
    })
    .await
}

fn row_to_record(row: &Row<'_>) -> std::result::Result<EmailRecord, rusqlite::Error> {
    let identifier: Option<String> = row.get(1)?;

    Ok(EmailRecord {
        row_id: row.get(0)?,
        identifier: identifier.map(EmailId),
        subject: row.get(2)?,
        sender: row.get(3)?,
        receiver: row.get(4)?,
        date: row.get(5)?,
        message: row.get(6)?,
    })
}
