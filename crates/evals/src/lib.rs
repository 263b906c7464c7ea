//! AgentStack Evals
//!
//! Rubric-based scoring of run transcripts with a judge capability:
//! - `rubric` - `Rubric`, `Criterion`, and the declared score kinds
//! - `judge` - `MetricEvaluator`: render judge prompt, call judge, parse score
//! - `report` - `Score`, per-case results, and batch report aggregation
//!
//! The judge capability may be stochastic; every `Score` therefore carries
//! the rubric version and the literal rendered prompt for auditability.
//! A judge response that cannot be parsed into the rubric's declared value
//! kind is always reported as an error, never defaulted.

pub mod judge;
pub mod report;
pub mod rubric;

// Re-export main types
pub use judge::{EvalError, EvalResult, MetricEvaluator};
pub use report::{CaseResult, CaseScore, EvalReport, MetricStats, Score, ScoreValue};
pub use rubric::{Criterion, Rubric, ScoreKind};
