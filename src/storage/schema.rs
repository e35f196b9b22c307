//! SQL schema definitions as const strings.

/// SQL to create the email record table.
///
/// `date` holds `YYYY-MM-DD HH:MM:SS` text so it sorts and compares
/// lexically.
pub const CREATE_EMAIL_DETAILS: &str = r#"
CREATE TABLE IF NOT EXISTS email_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emailid TEXT UNIQUE,
    subject TEXT,
    sender TEXT,
    receiver TEXT,
    date TEXT,
    message TEXT
)
"#;

/// SQL to create record indexes.
pub const CREATE_EMAIL_DETAILS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_email_details_date ON email_details(date)
"#;

/// Returns all schema statements in order.
pub fn all_migrations() -> &'static [&'static str] {
    &[CREATE_EMAIL_DETAILS, CREATE_EMAIL_DETAILS_INDEXES]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_to_fresh_connection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for statement in all_migrations() {
            conn.execute_batch(statement).unwrap();
        }

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('email_details') ORDER BY cid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            columns,
            vec!["id", "emailid", "subject", "sender", "receiver", "date", "message"]
        );
    }
}
