//! SQLite Database
//!
//! Embedded database for run transcripts using rusqlite with r2d2
//! connection pooling. The schema is only what the run recorder needs:
//! append-only step records and a runs table carrying the lifecycle
//! status. Everything else the platform persists lives in the excluded
//! service layer's own store.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled connection handle
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database service for transcript storage
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) a database file and initialize the schema.
    pub fn open_at(path: impl AsRef<Path>) -> AppResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// Uses a single-connection pool so every handle sees the same
    /// in-memory database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn get_connection(&self) -> AppResult<DbConnection> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Create the recorder tables if they don't exist.
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                graph_name TEXT NOT NULL,
                status TEXT NOT NULL,
                final_state TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                finalized_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS step_records (
                run_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                record TEXT NOT NULL,
                PRIMARY KEY (run_id, seq),
                FOREIGN KEY (run_id) REFERENCES runs(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_step_records_run_id
             ON step_records(run_id)",
            [],
        )?;

        Ok(())
    }
}
