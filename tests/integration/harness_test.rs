//! Batch evaluation scenarios.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use agentstack::core::RunStatus;
use agentstack::evals::{CaseScore, Criterion, MetricEvaluator, Rubric, ScoreKind, ScoreValue};
use agentstack::llm::{LlmCapability, ScriptedCapability, StaticCapability};
use agentstack::tools::ToolRegistry;
use agentstack::{
    EngineConfig, EvalCase, EvalHarness, EventSink, GraphEngine, MemoryRecorder, RunRecorder,
    StepExecutor,
};

use crate::helpers::{search_graph, SearchTool};

fn quality_rubric() -> Rubric {
    Rubric {
        name: "quality".to_string(),
        version: "1".to_string(),
        criteria: vec![Criterion {
            description: "Found relevant results".to_string(),
            weight: 1.0,
        }],
        judge_template: "Rate {metric} 0-5.\n{criteria}\n{transcript}".to_string(),
        kind: ScoreKind::Numeric { min: 0.0, max: 5.0 },
        pass_threshold: 3.0,
        requires_completed: true,
        transcript_range: None,
    }
}

fn harness_with(
    reasoning: Arc<dyn LlmCapability>,
    judge: Arc<dyn LlmCapability>,
    budget: u32,
) -> EvalHarness {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool)).unwrap();
    let recorder: Arc<dyn RunRecorder> = Arc::new(MemoryRecorder::new());
    let config = EngineConfig {
        default_step_budget: budget,
        step_timeout_ms: 0,
        batch_concurrency: 2,
    };
    let executor = StepExecutor::new(Arc::new(registry), reasoning, config.step_timeout());
    let engine = Arc::new(GraphEngine::new(
        executor,
        recorder,
        EventSink::null(),
        config,
    ));
    EvalHarness::new(
        engine,
        Arc::new(MetricEvaluator::new(judge)),
        EventSink::null(),
    )
}

#[tokio::test]
async fn faulting_case_is_isolated_and_stats_cover_valid_cases_only() {
    // Three cases; the second one's reasoning step faults unretried.
    let reasoning = Arc::new(ScriptedCapability::from_results([
        Ok("search:one".to_string()),
        Err(agentstack::llm::LlmError::other("model refused")),
        Ok("search:three".to_string()),
    ]));
    // One judge response per surviving case.
    let judge = Arc::new(ScriptedCapability::new([
        r#"{"score": 4, "rationale": "good"}"#,
        r#"{"score": 2, "rationale": "weak"}"#,
    ]));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool)).unwrap();
    let recorder: Arc<dyn RunRecorder> = Arc::new(MemoryRecorder::new());
    let config = EngineConfig {
        default_step_budget: 5,
        step_timeout_ms: 0,
        // Sequential so the scripted capabilities line up with case order.
        batch_concurrency: 1,
    };
    let executor = StepExecutor::new(
        Arc::new(registry),
        reasoning as Arc<dyn LlmCapability>,
        None,
    );
    let engine = Arc::new(GraphEngine::new(
        executor,
        recorder,
        EventSink::null(),
        config,
    ));
    let harness = EvalHarness::new(
        engine,
        Arc::new(MetricEvaluator::new(judge as Arc<dyn LlmCapability>)),
        EventSink::null(),
    );

    let report = harness
        .run_batch(
            Arc::new(search_graph()),
            vec![
                EvalCase::new("case-1", "q1"),
                EvalCase::new("case-2", "q2"),
                EvalCase::new("case-3", "q3"),
            ],
            Arc::new(vec![quality_rubric()]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.cases.len(), 3);

    // Cases 1 and 3 carry valid scores.
    match &report.cases[0].scores[0] {
        CaseScore::Scored(score) => assert_eq!(score.value, ScoreValue::Numeric(4.0)),
        other => panic!("case 1 should be scored, got {other:?}"),
    }
    match &report.cases[2].scores[0] {
        CaseScore::Scored(score) => assert_eq!(score.value, ScoreValue::Numeric(2.0)),
        other => panic!("case 3 should be scored, got {other:?}"),
    }

    // Case 2 failed and is ungradeable, not a synthesized zero.
    assert!(matches!(
        report.cases[1].run_status,
        RunStatus::Failed { .. }
    ));
    assert!(matches!(
        &report.cases[1].scores[0],
        CaseScore::Ungradeable { .. }
    ));

    // Aggregates cover the two valid cases only: mean of 4 and 2.
    let stats = &report.metrics["quality"];
    assert_eq!(stats.scored_cases, 2);
    assert_eq!(stats.ungradeable_cases, 1);
    assert!((stats.mean - 3.0).abs() < f64::EPSILON);
    assert!((stats.variance - 1.0).abs() < f64::EPSILON);
    assert!(stats.passed);
}

#[tokio::test]
async fn unparseable_judge_response_never_becomes_a_score() {
    let harness = harness_with(
        Arc::new(ScriptedCapability::new(["search:cats"])),
        Arc::new(StaticCapability::new("I'd rather not say")),
        5,
    );

    let report = harness
        .run_batch(
            Arc::new(search_graph()),
            vec![EvalCase::new("case-1", "q")],
            Arc::new(vec![quality_rubric()]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    match &report.cases[0].scores[0] {
        CaseScore::Ungradeable { reason, .. } => assert!(reason.contains("unparseable")),
        other => panic!("expected Ungradeable, got {other:?}"),
    }
    assert_eq!(report.metrics["quality"].scored_cases, 0);
}

#[tokio::test]
async fn scores_are_tagged_for_auditability() {
    let harness = harness_with(
        Arc::new(ScriptedCapability::new(["search:cats"])),
        Arc::new(StaticCapability::new(r#"{"score": 5, "rationale": "spot on"}"#)),
        5,
    );

    let report = harness
        .run_batch(
            Arc::new(search_graph()),
            vec![EvalCase::new("case-1", "find cats")],
            Arc::new(vec![quality_rubric()]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let score = report.cases[0].scores[0].as_scored().expect("scored");
    assert_eq!(score.rubric_version, "1");
    assert_eq!(score.metric, "quality");
    assert_eq!(score.seq_range, Some((0, 2)));
    // The literal rendered judge prompt travels with the score.
    assert!(score.rendered_prompt.contains("3 results"));
    assert!(score.rendered_prompt.contains("Found relevant results"));
    assert_eq!(score.rationale.as_deref(), Some("spot on"));
}

#[tokio::test]
async fn multiple_rubrics_score_independently() {
    let mut pass_rubric = quality_rubric();
    pass_rubric.name = "finished".to_string();
    pass_rubric.kind = ScoreKind::pass_fail();
    pass_rubric.judge_template = "Did {metric} pass?\n{transcript}".to_string();
    // Categorical scores project onto 0/1; the threshold is a fraction.
    pass_rubric.pass_threshold = 0.5;

    // The judge answers the numeric rubric first, then the categorical one.
    let judge = Arc::new(ScriptedCapability::new([r#"{"score": 4}"#, "pass"]));
    let harness = harness_with(
        Arc::new(ScriptedCapability::new(["search:cats"])),
        judge as Arc<dyn LlmCapability>,
        5,
    );

    let report = harness
        .run_batch(
            Arc::new(search_graph()),
            vec![EvalCase::new("case-1", "q")],
            Arc::new(vec![quality_rubric(), pass_rubric]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.cases[0].scores.len(), 2);
    assert_eq!(report.metrics.len(), 2);
    assert!(report.metrics["quality"].passed);
    assert!(report.metrics["finished"].passed);
    match &report.cases[0].scores[1] {
        CaseScore::Scored(score) => {
            assert_eq!(score.value, ScoreValue::Categorical("pass".to_string()));
        }
        other => panic!("expected categorical score, got {other:?}"),
    }
}
