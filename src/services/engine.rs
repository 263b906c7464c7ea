//! Graph Engine
//!
//! Owns the run state machine:
//! `Pending → Running → {Completed, Failed, BudgetExceeded}`.
//!
//! The engine walks a compiled graph node by node, charging one budget
//! unit per node visit (a visit's retry attempts share the unit; terminal
//! transitions are free), appending every attempt to the run recorder as
//! it happens, and emitting lifecycle events. Cancellation is checked
//! before each visit; a cancelled run is finalized as failed with a
//! cancelled reason, never left with an unflushed transcript.
//!
//! Given identical capability and tool responses the walk is fully
//! deterministic: edge tie-breaks follow declaration order and retry
//! counts are fixed per node, so replaying a transcript with scripted
//! capabilities reproduces the same node sequence.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use agentstack_core::{FailureKind, RunStatus};

use crate::config::EngineConfig;
use crate::models::graph::CompiledGraph;
use crate::models::run::{RunOutcome, RunState};
use crate::services::events::{EventSink, ExecutionEvent};
use crate::services::step_executor::{StepDecision, StepExecutor};
use crate::storage::recorder::RunRecorder;
use crate::utils::error::AppResult;

/// Executes agent graphs.
///
/// One engine serves many concurrent runs; each run owns its `RunState`
/// exclusively, so no locking happens inside a run.
pub struct GraphEngine {
    executor: StepExecutor,
    recorder: Arc<dyn RunRecorder>,
    events: EventSink,
    config: EngineConfig,
}

impl GraphEngine {
    pub fn new(
        executor: StepExecutor,
        recorder: Arc<dyn RunRecorder>,
        events: EventSink,
        config: EngineConfig,
    ) -> Self {
        Self {
            executor,
            recorder,
            events,
            config,
        }
    }

    /// The recorder this engine appends transcripts to.
    pub fn recorder(&self) -> Arc<dyn RunRecorder> {
        Arc::clone(&self.recorder)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one run of `graph` with the configured step budget.
    ///
    /// All three end states come back as an `Ok(RunOutcome)`; errors are
    /// reserved for infrastructure faults (recorder failures, unknown
    /// nodes). Use `RunOutcome::into_result()` to bubble non-completed
    /// outcomes as errors.
    pub async fn run(
        &self,
        graph: &CompiledGraph,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> AppResult<RunOutcome> {
        let run_id = Uuid::new_v4().to_string();
        self.run_with_id(graph, input, run_id, cancel).await
    }

    /// Execute one run with a caller-supplied run id.
    pub async fn run_with_id(
        &self,
        graph: &CompiledGraph,
        input: impl Into<String>,
        run_id: String,
        cancel: CancellationToken,
    ) -> AppResult<RunOutcome> {
        let started = Instant::now();
        let budget = self.config.default_step_budget;
        let mut state = RunState::new(&run_id, graph.entry_node(), budget, input);

        self.recorder.open(&run_id, graph.name())?;
        state.status = RunStatus::Running;
        self.events
            .emit(ExecutionEvent::RunStarted {
                run_id: run_id.clone(),
                graph_name: graph.name().to_string(),
            })
            .await;

        let mut seq: u64 = 0;
        let status = loop {
            if cancel.is_cancelled() {
                break RunStatus::Failed {
                    kind: FailureKind::Cancelled,
                    node_id: state.current_node.clone(),
                    error: "run cancelled".to_string(),
                };
            }

            let node = match graph.node(&state.current_node) {
                Some(node) => node,
                None => {
                    // Compilation rules this out; a miss is an engine bug.
                    error!(run_id = %run_id, node_id = %state.current_node, "unknown node");
                    break RunStatus::Failed {
                        kind: FailureKind::Internal,
                        node_id: state.current_node.clone(),
                        error: format!("unknown node '{}'", state.current_node),
                    };
                }
            };

            if node.kind.is_terminal() {
                // Terminal transitions are free of budget.
                let (record, _) = self.executor.execute(graph, node, &mut state, seq).await;
                self.append(&run_id, record).await?;
                break RunStatus::Completed;
            }

            if state.remaining_steps == 0 {
                break RunStatus::BudgetExceeded;
            }

            // One budget unit per node visit, shared by its retry attempts.
            state.remaining_steps -= 1;

            let retries = node.retries;
            let mut decision = None;
            let mut last_error = None;
            for attempt in 0..=retries {
                let (record, attempt_decision) =
                    self.executor.execute(graph, node, &mut state, seq).await;
                last_error = record.error.clone();
                self.append(&run_id, record).await?;
                seq += 1;

                match attempt_decision {
                    StepDecision::Faulted(_) if attempt < retries => {
                        info!(
                            run_id = %run_id,
                            node_id = %node.id,
                            attempt,
                            "step faulted, retrying"
                        );
                    }
                    other => {
                        decision = Some(other);
                        break;
                    }
                }
            }

            match decision {
                Some(StepDecision::Next(next)) => {
                    state.current_node = next;
                }
                Some(StepDecision::Finished) => break RunStatus::Completed,
                Some(StepDecision::Faulted(kind)) => {
                    break RunStatus::Failed {
                        kind,
                        node_id: node.id.clone(),
                        error: last_error.unwrap_or_else(|| "step fault".to_string()),
                    };
                }
                None => {
                    break RunStatus::Failed {
                        kind: FailureKind::Internal,
                        node_id: node.id.clone(),
                        error: "retry loop produced no decision".to_string(),
                    }
                }
            }
        };

        state.status = status.clone();
        self.recorder.finalize(&run_id, status.clone(), &state)?;

        let steps_taken = budget - state.remaining_steps;
        let duration_ms = started.elapsed().as_millis() as u64;
        self.events
            .emit(ExecutionEvent::RunFinished {
                run_id: run_id.clone(),
                status: status.clone(),
                steps_taken,
                duration_ms,
            })
            .await;

        Ok(RunOutcome {
            run_id,
            status,
            steps_taken,
            duration_ms,
        })
    }

    /// Append a record and emit its step event.
    async fn append(
        &self,
        run_id: &str,
        record: agentstack_core::StepRecord,
    ) -> AppResult<()> {
        let event = ExecutionEvent::StepRecorded {
            run_id: run_id.to_string(),
            node_id: record.node_id.clone(),
            seq: record.seq,
            duration_ms: record.duration_ms(),
            ok: !record.is_error(),
        };
        self.recorder.append(run_id, record)?;
        self.events.emit(event).await;
        Ok(())
    }
}
