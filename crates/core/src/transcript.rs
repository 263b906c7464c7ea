//! Run Transcript Model
//!
//! Defines the immutable record of an agent run:
//! - `StepRecord`: one executed step (inputs, output or error, timing)
//! - `StepKind`: reasoning, tool call, or terminal
//! - `RunStatus`: the run state machine's observable states
//! - `FailureKind`: classification of the fault that ended a failed run
//! - `Transcript`: the ordered, append-only sequence of step records
//!
//! A `StepRecord` is created once by the engine and never mutated after it
//! has been appended to a transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Step Kind
// ============================================================================

/// The kind of graph node a step record was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// A reasoning (LLM) step.
    Reasoning,
    /// A tool invocation step.
    ToolCall,
    /// A terminal transition. Does not consume step budget.
    Terminal,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Reasoning => write!(f, "reasoning"),
            StepKind::ToolCall => write!(f, "tool_call"),
            StepKind::Terminal => write!(f, "terminal"),
        }
    }
}

// ============================================================================
// Failure Kind
// ============================================================================

/// Classification of the fault that moved a run to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The reasoning capability faulted.
    Capability,
    /// A tool invocation faulted (including schema mismatches at invoke time).
    Tool,
    /// A step exceeded its configured timeout.
    Timeout,
    /// The run was cancelled by the caller.
    Cancelled,
    /// An unexpected engine-level fault.
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Capability => write!(f, "capability"),
            FailureKind::Tool => write!(f, "tool"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

// ============================================================================
// Run Status
// ============================================================================

/// Observable states of the run state machine.
///
/// `Pending → Running → {Completed, Failed, BudgetExceeded}`. The three end
/// states are terminal; a run is never resumed out of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created, not yet stepped.
    Pending,
    /// The engine is walking the graph.
    Running,
    /// A terminal node was reached.
    Completed,
    /// An unretried or unretryable step fault ended the run.
    Failed {
        kind: FailureKind,
        /// Node at which the fault occurred.
        node_id: String,
        error: String,
    },
    /// The step budget reached zero before a terminal node.
    BudgetExceeded,
}

impl RunStatus {
    /// Whether this status is one of the three end states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed { .. } | RunStatus::BudgetExceeded
        )
    }

    /// Whether the run finished at a terminal node.
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

// ============================================================================
// Step Record
// ============================================================================

/// One immutable entry in a run's transcript.
///
/// Sequence numbers are assigned by the engine, monotonic and gapless per
/// run, starting at 0. Retried attempts of the same node each get their own
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Monotonic per-run sequence number.
    pub seq: u64,
    /// Node that produced this record.
    pub node_id: String,
    /// Kind of the node.
    pub kind: StepKind,
    /// Snapshot of the step's input (rendered prompt or tool arguments).
    pub input: Value,
    /// The step's output, absent on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message when the step faulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// When the step finished (success or fault).
    pub finished_at: DateTime<Utc>,
}

impl StepRecord {
    /// Whether this record represents a faulted attempt.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Wall-clock duration of the step in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// The ordered, append-only record of everything a run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Run identifier.
    pub run_id: String,
    /// Name of the graph that was executed.
    pub graph_name: String,
    /// Terminal status once finalized, `Running` while the run is live.
    pub status: RunStatus,
    /// Step records in sequence order.
    pub records: Vec<StepRecord>,
}

impl Transcript {
    /// Number of non-terminal steps (the budget-consuming ones).
    pub fn non_terminal_steps(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind != StepKind::Terminal)
            .count()
    }

    /// The inclusive sequence range covered by this transcript, if any
    /// records exist.
    pub fn seq_range(&self) -> Option<(u64, u64)> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => Some((first.seq, last.seq)),
            _ => None,
        }
    }

    /// The node id sequence, in execution order.
    pub fn node_sequence(&self) -> Vec<String> {
        self.records.iter().map(|r| r.node_id.clone()).collect()
    }

    /// Render the records in `[lo, hi]` (inclusive) as plain text for judge
    /// prompts. `None` renders the full transcript.
    pub fn render_text(&self, range: Option<(u64, u64)>) -> String {
        let mut out = String::new();
        for record in &self.records {
            if let Some((lo, hi)) = range {
                if record.seq < lo || record.seq > hi {
                    continue;
                }
            }
            out.push_str(&format!("[{}] {} ({})", record.seq, record.node_id, record.kind));
            if let Some(ref output) = record.output {
                let text = match output {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push_str(&format!("\n  output: {}", text));
            }
            if let Some(ref error) = record.error {
                out.push_str(&format!("\n  error: {}", error));
            }
            out.push('\n');
        }
        out
    }
}
