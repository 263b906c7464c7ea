//! Error Handling
//!
//! Unified error type for the engine crate. Wraps the workspace crates'
//! error taxonomies (core, capability, tool, eval) and adds the
//! engine-level variants for storage, configuration, and run lifecycle.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use agentstack_core::CoreError;
use agentstack_evals::EvalError;
use agentstack_llm::LlmError;
use agentstack_tools::ToolError;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Core-layer errors
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Capability (reasoning/judge) errors
    #[error("Capability error: {0}")]
    Llm(#[from] LlmError),

    /// Tool registry and invocation errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Metric evaluation errors
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (graph compilation, config checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// A run id the recorder has never opened
    #[error("Unknown run: {0}")]
    UnknownRun(String),

    /// The step budget hit zero before a terminal node
    #[error("Step budget exceeded for run {run_id}")]
    BudgetExceeded { run_id: String },

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unknown-run error
    pub fn unknown_run(run_id: impl Into<String>) -> Self {
        Self::UnknownRun(run_id.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert AppError to a string for embedding layers
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
