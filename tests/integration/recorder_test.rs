//! Transcript ordering and durability tests.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use agentstack::core::{RunStatus, StepKind, StepRecord};
use agentstack::{Database, MemoryRecorder, RunRecorder, RunState, SqliteRecorder};

fn record(seq: u64, node: &str) -> StepRecord {
    let now = Utc::now();
    StepRecord {
        seq,
        node_id: node.to_string(),
        kind: StepKind::Reasoning,
        input: json!("prompt"),
        output: Some(json!(format!("output-{seq}"))),
        error: None,
        started_at: now,
        finished_at: now,
    }
}

fn sqlite_recorder() -> SqliteRecorder {
    SqliteRecorder::new(Database::new_in_memory().unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_stay_ordered_and_gapless() {
    let recorder: Arc<dyn RunRecorder> = Arc::new(MemoryRecorder::new());

    let mut handles = Vec::new();
    for run in 0..8 {
        let recorder = Arc::clone(&recorder);
        let run_id = format!("run-{run}");
        recorder.open(&run_id, "graph").unwrap();
        handles.push(tokio::spawn(async move {
            for seq in 0..50u64 {
                recorder.append(&run_id, record(seq, "node")).unwrap();
                if seq % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every run reads back strictly increasing, gapless sequence numbers.
    for run in 0..8 {
        let transcript = recorder.read(&format!("run-{run}")).unwrap();
        let seqs: Vec<u64> = transcript.records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }
}

#[test]
fn sqlite_append_is_recoverable_once_returned() {
    let recorder = sqlite_recorder();
    recorder.open("run-1", "graph").unwrap();
    recorder.append("run-1", record(0, "a")).unwrap();

    // Visible immediately, before finalize.
    let transcript = recorder.read("run-1").unwrap();
    assert_eq!(transcript.records.len(), 1);
    assert_eq!(transcript.records[0].output, Some(json!("output-0")));
    assert_eq!(transcript.status, RunStatus::Running);
}

#[test]
fn sqlite_rejects_gaps_and_unknown_runs() {
    let recorder = sqlite_recorder();

    assert!(recorder.append("ghost", record(0, "a")).is_err());

    recorder.open("run-1", "graph").unwrap();
    recorder.append("run-1", record(0, "a")).unwrap();
    assert!(recorder.append("run-1", record(2, "c")).is_err());
    assert!(recorder.append("run-1", record(0, "a")).is_err());

    // The valid next append still works.
    recorder.append("run-1", record(1, "b")).unwrap();
}

#[test]
fn finalized_transcript_is_sealed_and_status_visible() {
    let recorder = sqlite_recorder();
    recorder.open("run-1", "graph").unwrap();
    recorder.append("run-1", record(0, "a")).unwrap();

    let state = RunState::new("run-1", "a", 5, "input");
    recorder
        .finalize("run-1", RunStatus::BudgetExceeded, &state)
        .unwrap();

    let transcript = recorder.read("run-1").unwrap();
    assert_eq!(transcript.status, RunStatus::BudgetExceeded);
    assert!(recorder.append("run-1", record(1, "b")).is_err());
}

#[test]
fn transcripts_survive_database_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transcripts.db");

    {
        let recorder = SqliteRecorder::new(Database::open_at(&path).unwrap());
        recorder.open("run-1", "graph").unwrap();
        for seq in 0..3 {
            recorder.append("run-1", record(seq, "n")).unwrap();
        }
        let state = RunState::new("run-1", "n", 5, "input");
        recorder
            .finalize("run-1", RunStatus::Completed, &state)
            .unwrap();
    }

    let recorder = SqliteRecorder::new(Database::open_at(&path).unwrap());
    let transcript = recorder.read("run-1").unwrap();
    assert_eq!(transcript.records.len(), 3);
    assert_eq!(transcript.status, RunStatus::Completed);
    assert_eq!(transcript.seq_range(), Some((0, 2)));
}
