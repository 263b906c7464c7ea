//! Full graph execution scenarios.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use agentstack::core::{FailureKind, RunStatus, StepKind};
use agentstack::llm::{FailingCapability, ScriptedCapability};
use agentstack::{Database, RunRecorder, SqliteRecorder};

use crate::helpers::{engine_with, search_graph};

#[tokio::test]
async fn search_scenario_completes_within_budget() {
    // graph = start(reasoning) -> search(tool) -> end, budget = 5.
    let (engine, recorder) = engine_with(
        Arc::new(ScriptedCapability::new(["search:cats"])),
        5,
    );
    let graph = search_graph();

    let outcome = engine
        .run(&graph, "find cats", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    let transcript = recorder.read(&outcome.run_id).unwrap();
    assert_eq!(transcript.non_terminal_steps(), 2);
    assert_eq!(transcript.node_sequence(), vec!["start", "search", "end"]);
    assert_eq!(transcript.records[0].output, Some(json!("search:cats")));
    assert_eq!(transcript.records[1].output, Some(json!("3 results")));
    assert_eq!(transcript.records[2].kind, StepKind::Terminal);
}

#[tokio::test]
async fn search_scenario_budget_one_exceeds_before_tool() {
    let (engine, recorder) = engine_with(
        Arc::new(ScriptedCapability::new(["search:cats"])),
        1,
    );
    let graph = search_graph();

    let outcome = engine
        .run(&graph, "find cats", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::BudgetExceeded);

    // The reasoning step consumed the sole unit; the tool node never ran.
    let transcript = recorder.read(&outcome.run_id).unwrap();
    assert_eq!(transcript.node_sequence(), vec!["start"]);
}

#[tokio::test]
async fn budget_bounds_non_terminal_steps() {
    for budget in [1u32, 2, 3, 5] {
        let (engine, recorder) = engine_with(
            Arc::new(ScriptedCapability::new(["search:cats"])),
            budget,
        );
        let graph = search_graph();
        let outcome = engine
            .run(&graph, "find cats", CancellationToken::new())
            .await
            .unwrap();

        let transcript = recorder.read(&outcome.run_id).unwrap();
        assert!(
            transcript.non_terminal_steps() <= budget as usize,
            "budget {budget} exceeded: {} steps",
            transcript.non_terminal_steps()
        );
        assert!(matches!(
            outcome.status,
            RunStatus::Completed | RunStatus::BudgetExceeded
        ));
    }
}

#[tokio::test]
async fn identical_inputs_produce_identical_transcripts() {
    let graph = search_graph();
    let mut observed = Vec::new();

    for _ in 0..2 {
        let (engine, recorder) = engine_with(
            Arc::new(ScriptedCapability::new(["search:cats"])),
            5,
        );
        let outcome = engine
            .run(&graph, "find cats", CancellationToken::new())
            .await
            .unwrap();
        let transcript = recorder.read(&outcome.run_id).unwrap();
        observed.push((
            transcript.node_sequence(),
            transcript
                .records
                .iter()
                .map(|r| (r.output.clone(), r.error.clone()))
                .collect::<Vec<_>>(),
        ));
    }

    assert_eq!(observed[0], observed[1]);
}

#[tokio::test]
async fn always_faulting_node_surfaces_failed_run() {
    let (engine, recorder) = engine_with(Arc::new(FailingCapability::default()), 5);
    let graph = search_graph();

    let outcome = engine
        .run(&graph, "find cats", CancellationToken::new())
        .await
        .unwrap();
    match &outcome.status {
        RunStatus::Failed {
            kind,
            node_id,
            error,
        } => {
            assert_eq!(*kind, FailureKind::Capability);
            assert_eq!(node_id, "start");
            assert!(!error.is_empty());
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    // The failing step and its error are retrievable from the transcript.
    let transcript = recorder.read(&outcome.run_id).unwrap();
    assert_eq!(transcript.records.len(), 1);
    assert!(transcript.records[0].is_error());
    assert_eq!(transcript.status, outcome.status);
}

#[tokio::test]
async fn engine_runs_against_sqlite_recorder() {
    use agentstack::llm::LlmCapability;
    use agentstack::tools::ToolRegistry;
    use agentstack::{EngineConfig, EventSink, GraphEngine, StepExecutor};

    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(crate::helpers::SearchTool))
        .unwrap();
    let recorder: Arc<dyn RunRecorder> =
        Arc::new(SqliteRecorder::new(Database::new_in_memory().unwrap()));
    let config = EngineConfig::default();
    let reasoning: Arc<dyn LlmCapability> =
        Arc::new(ScriptedCapability::new(["search:cats"]));
    let engine = GraphEngine::new(
        StepExecutor::new(Arc::new(registry), reasoning, config.step_timeout()),
        Arc::clone(&recorder),
        EventSink::null(),
        config,
    );

    let graph = search_graph();
    let outcome = engine
        .run(&graph, "find cats", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    let transcript = recorder.read(&outcome.run_id).unwrap();
    assert_eq!(transcript.node_sequence(), vec!["start", "search", "end"]);
    assert_eq!(transcript.status, RunStatus::Completed);
}
