//! Execution Events
//!
//! Structured events the core emits for an external telemetry/dashboard
//! sink: run lifecycle, per-step durations, and per-metric scores. Every
//! event is mirrored to `tracing`; an optional mpsc channel carries them to
//! the embedding layer. The downstream schema is the sink's concern.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use agentstack_core::RunStatus;

/// Events emitted during graph execution and batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A run moved from Pending to Running.
    RunStarted { run_id: String, graph_name: String },
    /// A step record was appended to a run's transcript.
    StepRecorded {
        run_id: String,
        node_id: String,
        seq: u64,
        duration_ms: u64,
        ok: bool,
    },
    /// A run reached one of its terminal states.
    RunFinished {
        run_id: String,
        status: RunStatus,
        steps_taken: u32,
        duration_ms: u64,
    },
    /// A metric score (or ungradeable outcome) was produced for a case.
    ScoreRecorded {
        run_id: String,
        metric: String,
        outcome: String,
    },
}

/// Sink for execution events.
///
/// Cloneable and cheap; a null sink only mirrors to `tracing`.
#[derive(Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ExecutionEvent>>,
}

impl EventSink {
    /// A sink that only logs via `tracing`.
    pub fn null() -> Self {
        Self { tx: None }
    }

    /// A sink backed by a channel, plus the receiving half for the
    /// embedding layer.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    /// Emit an event. Never fails; a closed channel is logged and dropped.
    pub async fn emit(&self, event: ExecutionEvent) {
        match &event {
            ExecutionEvent::RunStarted { run_id, graph_name } => {
                info!(run_id = %run_id, graph = %graph_name, "run started");
            }
            ExecutionEvent::StepRecorded {
                run_id,
                node_id,
                seq,
                duration_ms,
                ok,
            } => {
                info!(
                    run_id = %run_id,
                    node_id = %node_id,
                    seq,
                    duration_ms,
                    ok,
                    "step recorded"
                );
            }
            ExecutionEvent::RunFinished {
                run_id,
                status,
                steps_taken,
                duration_ms,
            } => {
                info!(
                    run_id = %run_id,
                    status = ?status,
                    steps_taken,
                    duration_ms,
                    "run finished"
                );
            }
            ExecutionEvent::ScoreRecorded {
                run_id,
                metric,
                outcome,
            } => {
                info!(run_id = %run_id, metric = %metric, outcome = %outcome, "score recorded");
            }
        }

        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                warn!("event sink receiver dropped");
            }
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_sink_does_not_fail() {
        let sink = EventSink::null();
        sink.emit(ExecutionEvent::RunStarted {
            run_id: "run-1".to_string(),
            graph_name: "g".to_string(),
        })
        .await;
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (sink, mut rx) = EventSink::channel(8);
        sink.emit(ExecutionEvent::StepRecorded {
            run_id: "run-1".to_string(),
            node_id: "chat".to_string(),
            seq: 0,
            duration_ms: 12,
            ok: true,
        })
        .await;

        match rx.recv().await {
            Some(ExecutionEvent::StepRecorded { node_id, seq, .. }) => {
                assert_eq!(node_id, "chat");
                assert_eq!(seq, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_tolerated() {
        let (sink, rx) = EventSink::channel(1);
        drop(rx);
        sink.emit(ExecutionEvent::RunFinished {
            run_id: "run-1".to_string(),
            status: RunStatus::Completed,
            steps_taken: 2,
            duration_ms: 40,
        })
        .await;
    }

    #[test]
    fn test_event_serialization() {
        let event = ExecutionEvent::ScoreRecorded {
            run_id: "run-1".to_string(),
            metric: "quality".to_string(),
            outcome: "4.0".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"score_recorded\""));
    }
}
