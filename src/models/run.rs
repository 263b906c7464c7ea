//! Run State
//!
//! Mutable working memory for one graph execution: the conversation
//! history, the scratch key-value mapping, the current node pointer, and
//! the remaining step budget. A `RunState` is exclusively owned by its run;
//! concurrent runs never share one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentstack_core::RunStatus;

// ============================================================================
// History
// ============================================================================

/// Message roles, following the conversational schema of the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a run's working history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// A conversational message (the run input, reasoning outputs).
    Message { role: Role, content: String },
    /// A structured observation returned by a tool.
    Observation { tool: String, output: Value },
}

impl HistoryEntry {
    /// The entry's output rendered as text.
    pub fn as_text(&self) -> String {
        match self {
            HistoryEntry::Message { content, .. } => content.clone(),
            HistoryEntry::Observation { output, .. } => match output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Mutable state of one in-flight run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Run identifier.
    pub run_id: String,
    /// The run's original input text.
    pub input: String,
    /// Node the engine will execute next.
    pub current_node: String,
    /// Ordered messages and observations.
    pub history: Vec<HistoryEntry>,
    /// Scratch key-value mapping written by steps, read by guards and
    /// input mappings.
    pub scratch: HashMap<String, Value>,
    /// Non-terminal steps the run may still take.
    pub remaining_steps: u32,
    /// Current lifecycle status.
    pub status: RunStatus,
}

impl RunState {
    /// Initialize state for a new run at the graph's entry node.
    ///
    /// History starts empty; the input is carried separately and reaches
    /// prompts through the `{input}` template variable or an `input`
    /// argument binding.
    pub fn new(
        run_id: impl Into<String>,
        entry_node: impl Into<String>,
        step_budget: u32,
        input: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            input: input.into(),
            current_node: entry_node.into(),
            history: Vec::new(),
            scratch: HashMap::new(),
            remaining_steps: step_budget,
            status: RunStatus::Pending,
        }
    }

    /// Append a user message (seeded by the embedding service layer).
    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.history.push(HistoryEntry::Message {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Append an assistant message (a reasoning step's output).
    pub fn push_assistant_message(&mut self, content: impl Into<String>) {
        self.history.push(HistoryEntry::Message {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// Append a tool observation.
    pub fn push_observation(&mut self, tool: impl Into<String>, output: Value) {
        self.history.push(HistoryEntry::Observation {
            tool: tool.into(),
            output,
        });
    }

    /// The most recent history entry's output text, if any.
    pub fn last_output(&self) -> Option<String> {
        self.history.last().map(HistoryEntry::as_text)
    }

    /// The history rendered as plain text for prompt templates.
    pub fn history_text(&self) -> String {
        self.history
            .iter()
            .map(|entry| match entry {
                HistoryEntry::Message { role, content } => match role {
                    Role::User => format!("user: {content}"),
                    Role::Assistant => format!("assistant: {content}"),
                },
                HistoryEntry::Observation { tool, output } => {
                    format!("observation[{tool}]: {}", entry_text(output))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Template variables for prompt rendering: `input`, `history`,
    /// `last_output`, and one `scratch.<key>` entry per scratch key.
    pub fn template_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::from([
            ("input".to_string(), self.input.clone()),
            ("history".to_string(), self.history_text()),
            (
                "last_output".to_string(),
                self.last_output().unwrap_or_default(),
            ),
        ]);
        for (key, value) in &self.scratch {
            vars.insert(format!("scratch.{key}"), entry_text(value));
        }
        vars
    }
}

fn entry_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Run Outcome
// ============================================================================

/// Caller-visible summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier.
    pub run_id: String,
    /// Terminal status.
    pub status: RunStatus,
    /// Non-terminal steps taken.
    pub steps_taken: u32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl RunOutcome {
    /// Convert the outcome into a result, mapping `BudgetExceeded` and
    /// `Failed` to their error kinds for callers that want to bubble them.
    pub fn into_result(self) -> crate::utils::error::AppResult<Self> {
        use crate::utils::error::AppError;
        match &self.status {
            RunStatus::BudgetExceeded => Err(AppError::BudgetExceeded {
                run_id: self.run_id,
            }),
            RunStatus::Failed { kind, node_id, error } => Err(AppError::internal(format!(
                "run {} failed at node '{}' ({kind}): {error}",
                self.run_id, node_id
            ))),
            _ => Ok(self),
        }
    }
}
