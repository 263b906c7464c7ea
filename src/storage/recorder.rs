//! Run Recorder
//!
//! Persists the immutable, ordered transcript of every run. The contract:
//! - `append` fails with `UnknownRun` for a run id that was never opened
//! - sequence numbers are monotonic and gapless per run; a gap is rejected
//! - once `append` returns, the record is recoverable via `read`
//! - `finalize` seals the transcript; sealed transcripts reject appends
//! - records are never edited or removed after append
//!
//! Appends for the same run are serialized by the recorder; appends for
//! different runs proceed independently.
//!
//! Two implementations: `MemoryRecorder` for tests and ephemeral runs, and
//! `SqliteRecorder` backed by the pooled database for durability.

use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::{params, OptionalExtension};

use agentstack_core::{RunStatus, StepRecord, Transcript};

use crate::models::run::RunState;
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Trait
// ============================================================================

/// Append-only transcript store.
pub trait RunRecorder: Send + Sync {
    /// Register a run id so records can be appended to it.
    fn open(&self, run_id: &str, graph_name: &str) -> AppResult<()>;

    /// Append the next record. The record's `seq` must be exactly one past
    /// the last appended record (starting at 0).
    fn append(&self, run_id: &str, record: StepRecord) -> AppResult<()>;

    /// Seal the transcript with the run's terminal status and final state.
    fn finalize(&self, run_id: &str, status: RunStatus, final_state: &RunState) -> AppResult<()>;

    /// Read the full ordered transcript.
    fn read(&self, run_id: &str) -> AppResult<Transcript>;
}

// ============================================================================
// Memory Recorder
// ============================================================================

struct RunLog {
    graph_name: String,
    status: RunStatus,
    records: Vec<StepRecord>,
    sealed: bool,
}

/// In-memory recorder for tests and ephemeral runs.
pub struct MemoryRecorder {
    runs: Mutex<HashMap<String, RunLog>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRecorder for MemoryRecorder {
    fn open(&self, run_id: &str, graph_name: &str) -> AppResult<()> {
        let mut runs = lock(&self.runs)?;
        if runs.contains_key(run_id) {
            return Err(AppError::validation(format!(
                "run '{run_id}' is already open"
            )));
        }
        runs.insert(
            run_id.to_string(),
            RunLog {
                graph_name: graph_name.to_string(),
                status: RunStatus::Running,
                records: Vec::new(),
                sealed: false,
            },
        );
        Ok(())
    }

    fn append(&self, run_id: &str, record: StepRecord) -> AppResult<()> {
        let mut runs = lock(&self.runs)?;
        let log = runs
            .get_mut(run_id)
            .ok_or_else(|| AppError::unknown_run(run_id))?;
        if log.sealed {
            return Err(AppError::validation(format!(
                "transcript for run '{run_id}' is sealed"
            )));
        }
        let expected = log.records.len() as u64;
        if record.seq != expected {
            return Err(AppError::validation(format!(
                "out-of-order append for run '{run_id}': expected seq {expected}, got {}",
                record.seq
            )));
        }
        log.records.push(record);
        Ok(())
    }

    fn finalize(&self, run_id: &str, status: RunStatus, _final_state: &RunState) -> AppResult<()> {
        let mut runs = lock(&self.runs)?;
        let log = runs
            .get_mut(run_id)
            .ok_or_else(|| AppError::unknown_run(run_id))?;
        log.status = status;
        log.sealed = true;
        Ok(())
    }

    fn read(&self, run_id: &str) -> AppResult<Transcript> {
        let runs = lock(&self.runs)?;
        let log = runs
            .get(run_id)
            .ok_or_else(|| AppError::unknown_run(run_id))?;
        Ok(Transcript {
            run_id: run_id.to_string(),
            graph_name: log.graph_name.clone(),
            status: log.status.clone(),
            records: log.records.clone(),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> AppResult<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::internal("recorder lock poisoned"))
}

// ============================================================================
// SQLite Recorder
// ============================================================================

/// Durable recorder backed by the pooled SQLite database.
///
/// The append lock keeps the per-run sequence check and the insert atomic;
/// the row is committed before `append` returns.
pub struct SqliteRecorder {
    db: Database,
    append_lock: Mutex<()>,
}

impl SqliteRecorder {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            append_lock: Mutex::new(()),
        }
    }
}

impl RunRecorder for SqliteRecorder {
    fn open(&self, run_id: &str, graph_name: &str) -> AppResult<()> {
        let conn = self.db.get_connection()?;
        let status = serde_json::to_string(&RunStatus::Running)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO runs (id, graph_name, status) VALUES (?1, ?2, ?3)",
            params![run_id, graph_name, status],
        )?;
        if inserted == 0 {
            return Err(AppError::validation(format!(
                "run '{run_id}' is already open"
            )));
        }
        Ok(())
    }

    fn append(&self, run_id: &str, record: StepRecord) -> AppResult<()> {
        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| AppError::internal("recorder lock poisoned"))?;
        let conn = self.db.get_connection()?;

        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM runs WHERE id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        let status = status.ok_or_else(|| AppError::unknown_run(run_id))?;
        let parsed: RunStatus = serde_json::from_str(&status)?;
        if parsed.is_terminal() {
            return Err(AppError::validation(format!(
                "transcript for run '{run_id}' is sealed"
            )));
        }

        let expected: u64 = conn.query_row(
            "SELECT COUNT(*) FROM step_records WHERE run_id = ?1",
            params![run_id],
            |row| row.get::<_, i64>(0),
        )? as u64;
        if record.seq != expected {
            return Err(AppError::validation(format!(
                "out-of-order append for run '{run_id}': expected seq {expected}, got {}",
                record.seq
            )));
        }

        let payload = serde_json::to_string(&record)?;
        conn.execute(
            "INSERT INTO step_records (run_id, seq, record) VALUES (?1, ?2, ?3)",
            params![run_id, record.seq as i64, payload],
        )?;
        Ok(())
    }

    fn finalize(&self, run_id: &str, status: RunStatus, final_state: &RunState) -> AppResult<()> {
        let conn = self.db.get_connection()?;
        let status_json = serde_json::to_string(&status)?;
        let state_json = serde_json::to_string(final_state)?;
        let updated = conn.execute(
            "UPDATE runs
             SET status = ?2, final_state = ?3, finalized_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![run_id, status_json, state_json],
        )?;
        if updated == 0 {
            return Err(AppError::unknown_run(run_id));
        }
        Ok(())
    }

    fn read(&self, run_id: &str) -> AppResult<Transcript> {
        let conn = self.db.get_connection()?;

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT graph_name, status FROM runs WHERE id = ?1",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (graph_name, status_json) = row.ok_or_else(|| AppError::unknown_run(run_id))?;
        let status: RunStatus = serde_json::from_str(&status_json)?;

        let mut stmt = conn.prepare(
            "SELECT record FROM step_records WHERE run_id = ?1 ORDER BY seq ASC",
        )?;
        let records = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?
            .into_iter()
            .map(|payload| serde_json::from_str::<StepRecord>(&payload))
            .collect::<Result<Vec<StepRecord>, _>>()?;

        Ok(Transcript {
            run_id: run_id.to_string(),
            graph_name,
            status,
            records,
        })
    }
}
