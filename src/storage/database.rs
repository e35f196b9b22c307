//! SQLite access with one connection per logical operation.
//!
//! Each call to [`Database::with_conn`] opens the database file, runs the
//! closure on a blocking thread, and closes the connection when the closure
//! returns, including on error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;

use super::schema;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database location {path}: {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database task failed: {0}")]
    TaskFailed(String),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Handle to the record database file.
///
/// Cloning is cheap; no connection is held between operations.
#[derive(Clone)]
pub struct Database {
    path: Arc<PathBuf>,
}

impl Database {
    /// Prepares a database at the given path, creating parent directories.
    ///
    /// Opens one connection to surface permission or corruption problems
    /// early. Call [`Database::ensure_schema`] before reading or writing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::Location {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let db = Self {
            path: Arc::new(path),
        };
        db.with_conn(|_| Ok(())).await?;

        tracing::debug!(path = %db.path.display(), "Database ready");
        Ok(db)
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the record table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            for statement in schema::all_migrations() {
                conn.execute_batch(statement)?;
            }
            Ok(())
        })
        .await?;

        tracing::debug!("Schema ensured");
        Ok(())
    }

    /// Executes a function with a freshly opened connection.
    ///
    /// The function runs in a blocking task to avoid blocking the async runtime.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.path);

        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(path.as_path())?;
            f(&conn)
        })
        .await
        .map_err(|e| DatabaseError::TaskFailed(e.to_string()))?
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish()
    }
}
