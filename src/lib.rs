//! AgentStack
//!
//! Backend core of the AgentStack platform: a stateful, resumable-free
//! control-flow engine that walks an agent's reasoning/tool graph under a
//! step budget, records an immutable transcript of every step, and scores
//! transcripts against rubrics with a judge capability.
//!
//! ## Module Organization
//!
//! - `models` - graph definitions and per-run mutable state
//! - `services` - step executor, graph engine, evaluation harness, events
//! - `storage` - pooled SQLite database and the run recorder
//! - `config` - engine configuration surface (budgets, timeouts, concurrency)
//! - `utils` - unified `AppError`/`AppResult`
//!
//! The HTTP layer, authentication, and dashboards live outside this crate;
//! they drive it through `GraphEngine`, `EvalHarness`, and the `RunRecorder`.

pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// ── Errors ─────────────────────────────────────────────────────────────
pub use utils::error::{AppError, AppResult};

// ── Graph Model ────────────────────────────────────────────────────────
pub use models::graph::{
    ArgBinding, CompiledGraph, Edge, GraphDefinition, Guard, InputMapping, Node, NodeKind,
    ValueSource,
};
pub use models::run::{HistoryEntry, Role, RunOutcome, RunState};

// ── Engine ─────────────────────────────────────────────────────────────
pub use config::EngineConfig;
pub use services::engine::GraphEngine;
pub use services::events::{EventSink, ExecutionEvent};
pub use services::harness::{EvalCase, EvalHarness};
pub use services::step_executor::{StepDecision, StepExecutor};

// ── Storage ────────────────────────────────────────────────────────────
pub use storage::database::Database;
pub use storage::recorder::{MemoryRecorder, RunRecorder, SqliteRecorder};

// ── Re-exported workspace crates ───────────────────────────────────────
pub use agentstack_core as core;
pub use agentstack_evals as evals;
pub use agentstack_llm as llm;
pub use agentstack_tools as tools;
