//! AgentStack Core
//!
//! Foundational error types, the run transcript data model, and prompt
//! templating for the AgentStack workspace. This crate has zero dependencies
//! on engine-level code (database, LLM capabilities, tool execution).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `transcript` - Immutable run transcript model (`StepRecord`, `Transcript`, `RunStatus`)
//! - `template` - `{placeholder}` prompt template rendering
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror/chrono** - keeps build times minimal
//! 2. **Immutable records** - a `StepRecord` is never mutated after creation
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod template;
pub mod transcript;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Transcript Model ───────────────────────────────────────────────────
pub use transcript::{FailureKind, RunStatus, StepKind, StepRecord, Transcript};

// ── Templates ──────────────────────────────────────────────────────────
pub use template::render;
