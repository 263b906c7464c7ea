//! Evaluation Harness
//!
//! Runs a batch of (graph, input) cases through the engine and scores each
//! resulting transcript against every rubric with the metric evaluator.
//! Cases run in parallel up to the configured concurrency limit; failure
//! isolation is per-case. A run that did not complete scores as
//! ungradeable for rubrics that require a completed transcript, and judge
//! faults surface as that score's ungradeable reason; the batch itself
//! never aborts. Cancelling a batch propagates to in-flight runs, which
//! finalize as failed with a cancelled reason.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use agentstack_core::{FailureKind, RunStatus, Transcript};
use agentstack_evals::{CaseResult, CaseScore, EvalReport, MetricEvaluator, Rubric};
use serde::{Deserialize, Serialize};

use crate::models::graph::CompiledGraph;
use crate::services::engine::GraphEngine;
use crate::services::events::{EventSink, ExecutionEvent};
use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Types
// ============================================================================

/// One batch evaluation case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    /// Case identifier.
    pub id: String,
    /// Input handed to the run.
    pub input: String,
}

impl EvalCase {
    pub fn new(id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Batch evaluation of an agent graph.
pub struct EvalHarness {
    engine: Arc<GraphEngine>,
    evaluator: Arc<MetricEvaluator>,
    events: EventSink,
}

impl EvalHarness {
    pub fn new(
        engine: Arc<GraphEngine>,
        evaluator: Arc<MetricEvaluator>,
        events: EventSink,
    ) -> Self {
        Self {
            engine,
            evaluator,
            events,
        }
    }

    /// Execute every case and aggregate the scores into a report.
    ///
    /// The report's per-metric statistics cover only cases that produced a
    /// valid score.
    pub async fn run_batch(
        &self,
        graph: Arc<CompiledGraph>,
        cases: Vec<EvalCase>,
        rubrics: Arc<Vec<Rubric>>,
        cancel: CancellationToken,
    ) -> AppResult<EvalReport> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let concurrency = self.engine.config().batch_concurrency;
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let mut handles = Vec::with_capacity(cases.len());
        for case in cases {
            let engine = Arc::clone(&self.engine);
            let evaluator = Arc::clone(&self.evaluator);
            let graph = Arc::clone(&graph);
            let rubrics = Arc::clone(&rubrics);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.child_token();
            let events = self.events.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| AppError::internal("batch semaphore closed"))?;
                run_case(&engine, &evaluator, &graph, &rubrics, case, cancel, events).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| AppError::internal(format!("case task panicked: {e}")))??;
            results.push(result);
        }

        let thresholds: HashMap<String, f64> = rubrics
            .iter()
            .map(|r| (r.name.clone(), r.pass_threshold))
            .collect();

        Ok(EvalReport::from_cases(
            batch_id,
            graph.name().to_string(),
            results,
            &thresholds,
            cancel.is_cancelled(),
            started.elapsed().as_millis() as u64,
        ))
    }
}

/// Run one case end to end: engine run, transcript read, one score per
/// rubric. All faults are contained in the returned `CaseResult`.
async fn run_case(
    engine: &GraphEngine,
    evaluator: &MetricEvaluator,
    graph: &CompiledGraph,
    rubrics: &[Rubric],
    case: EvalCase,
    cancel: CancellationToken,
    events: EventSink,
) -> AppResult<CaseResult> {
    let outcome = match engine.run(graph, &case.input, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Infrastructure fault: the case is ungradeable across the
            // board, but the batch carries on.
            warn!(case_id = %case.id, error = %e, "case run errored");
            return Ok(CaseResult {
                case_id: case.id,
                run_id: String::new(),
                run_status: RunStatus::Failed {
                    kind: FailureKind::Internal,
                    node_id: String::new(),
                    error: e.to_string(),
                },
                scores: rubrics
                    .iter()
                    .map(|r| CaseScore::Ungradeable {
                        metric: r.name.clone(),
                        reason: format!("run error: {e}"),
                    })
                    .collect(),
            });
        }
    };

    let transcript = engine.recorder().read(&outcome.run_id)?;
    let mut scores = Vec::with_capacity(rubrics.len());
    for rubric in rubrics {
        let score = score_case(evaluator, &transcript, rubric).await;
        events
            .emit(ExecutionEvent::ScoreRecorded {
                run_id: outcome.run_id.clone(),
                metric: rubric.name.clone(),
                outcome: match &score {
                    CaseScore::Scored(s) => format!("{:?}", s.value),
                    CaseScore::Ungradeable { reason, .. } => format!("ungradeable: {reason}"),
                },
            })
            .await;
        scores.push(score);
    }

    Ok(CaseResult {
        case_id: case.id,
        run_id: outcome.run_id,
        run_status: outcome.status,
        scores,
    })
}

/// Score one (transcript, rubric) pair, mapping every fault to an
/// ungradeable entry rather than an error.
async fn score_case(
    evaluator: &MetricEvaluator,
    transcript: &Transcript,
    rubric: &Rubric,
) -> CaseScore {
    if rubric.requires_completed && !transcript.status.is_completed() {
        return CaseScore::Ungradeable {
            metric: rubric.name.clone(),
            reason: format!(
                "run did not complete: {}",
                status_label(&transcript.status)
            ),
        };
    }

    match evaluator.evaluate(transcript, rubric).await {
        Ok(score) => CaseScore::Scored(score),
        Err(e) => CaseScore::Ungradeable {
            metric: rubric.name.clone(),
            reason: e.to_string(),
        },
    }
}

fn status_label(status: &RunStatus) -> String {
    match status {
        RunStatus::Pending => "pending".to_string(),
        RunStatus::Running => "running".to_string(),
        RunStatus::Completed => "completed".to_string(),
        RunStatus::BudgetExceeded => "budget_exceeded".to_string(),
        RunStatus::Failed { kind, .. } => format!("failed ({kind})"),
    }
}
