//! Scores and Reports
//!
//! Result types for the evaluation pipeline:
//! - `Score`: one judged (run, metric) result, tagged for auditability
//! - `CaseScore`: a scored or ungradeable entry for one (case, metric)
//! - `MetricStats`: aggregate statistics per metric across a batch
//! - `EvalReport`: the full batch report
//!
//! Aggregate statistics are computed only over cases that produced a valid
//! score; ungradeable entries are listed but excluded from the stats.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Score
// ============================================================================

/// The parsed value of a judge response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", content = "value")]
pub enum ScoreValue {
    Numeric(f64),
    Categorical(String),
}

impl ScoreValue {
    /// Numeric projection used for aggregation. Categorical values project
    /// onto 1.0 for the rubric's first allowed category and 0.0 otherwise,
    /// which is resolved by the evaluator at scoring time.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            ScoreValue::Numeric(n) => Some(*n),
            ScoreValue::Categorical(_) => None,
        }
    }
}

/// One immutable score for a (run, metric) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Metric (rubric) name.
    pub metric: String,
    /// Rubric version the score was produced under.
    pub rubric_version: String,
    /// Parsed judge value.
    pub value: ScoreValue,
    /// Numeric projection of `value` used for aggregation.
    pub numeric: f64,
    /// Judge's rationale text, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Run whose transcript was judged.
    pub run_id: String,
    /// Inclusive step-record sequence range the score was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_range: Option<(u64, u64)>,
    /// The literal prompt sent to the judge.
    pub rendered_prompt: String,
}

// ============================================================================
// Case Results
// ============================================================================

/// Outcome of one metric for one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseScore {
    /// The judge produced a valid score.
    Scored(Score),
    /// No valid score exists for this (case, metric).
    ///
    /// Covers runs that did not complete (for rubrics requiring a completed
    /// transcript) and judge faults or unparseable judge responses.
    Ungradeable { metric: String, reason: String },
}

impl CaseScore {
    pub fn metric(&self) -> &str {
        match self {
            CaseScore::Scored(score) => &score.metric,
            CaseScore::Ungradeable { metric, .. } => metric,
        }
    }

    pub fn as_scored(&self) -> Option<&Score> {
        match self {
            CaseScore::Scored(score) => Some(score),
            CaseScore::Ungradeable { .. } => None,
        }
    }
}

/// All metric outcomes for one batch case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case identifier.
    pub case_id: String,
    /// Run that executed this case.
    pub run_id: String,
    /// Terminal run status, serialized from the engine.
    pub run_status: agentstack_core::RunStatus,
    /// One entry per rubric.
    pub scores: Vec<CaseScore>,
}

// ============================================================================
// Metric Stats
// ============================================================================

/// Aggregate statistics for one metric across a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStats {
    /// Number of cases with a valid score.
    pub scored_cases: usize,
    /// Number of ungradeable cases.
    pub ungradeable_cases: usize,
    /// Mean of the numeric projections over scored cases.
    pub mean: f64,
    /// Population variance over scored cases.
    pub variance: f64,
    /// Threshold the mean is compared against.
    pub pass_threshold: f64,
    /// Whether the mean reached the threshold (false when nothing scored).
    pub passed: bool,
}

impl MetricStats {
    /// Compute stats from the numeric projections of scored cases.
    pub fn compute(values: &[f64], ungradeable: usize, pass_threshold: f64) -> Self {
        let scored = values.len();
        let mean = if scored == 0 {
            0.0
        } else {
            values.iter().sum::<f64>() / scored as f64
        };
        let variance = if scored == 0 {
            0.0
        } else {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / scored as f64
        };
        Self {
            scored_cases: scored,
            ungradeable_cases: ungradeable,
            mean,
            variance,
            pass_threshold,
            passed: scored > 0 && mean >= pass_threshold,
        }
    }
}

// ============================================================================
// Eval Report
// ============================================================================

/// The read-only report produced after a batch completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Batch identifier.
    pub batch_id: String,
    /// Graph the batch was executed against.
    pub graph_name: String,
    /// Per-case results, in case order.
    pub cases: Vec<CaseResult>,
    /// Per-metric aggregates, keyed by metric name.
    pub metrics: HashMap<String, MetricStats>,
    /// Whether the batch was cancelled before all cases finished.
    pub cancelled: bool,
    /// Wall-clock duration of the batch in milliseconds.
    pub duration_ms: u64,
}

impl EvalReport {
    /// Assemble the report from per-case results and rubric thresholds.
    ///
    /// `thresholds` maps metric name to its rubric's pass threshold.
    pub fn from_cases(
        batch_id: String,
        graph_name: String,
        cases: Vec<CaseResult>,
        thresholds: &HashMap<String, f64>,
        cancelled: bool,
        duration_ms: u64,
    ) -> Self {
        let mut values: HashMap<String, Vec<f64>> = HashMap::new();
        let mut ungradeable: HashMap<String, usize> = HashMap::new();

        for case in &cases {
            for score in &case.scores {
                match score {
                    CaseScore::Scored(s) => {
                        values.entry(s.metric.clone()).or_default().push(s.numeric);
                    }
                    CaseScore::Ungradeable { metric, .. } => {
                        *ungradeable.entry(metric.clone()).or_default() += 1;
                    }
                }
            }
        }

        let mut metrics = HashMap::new();
        for (metric, threshold) in thresholds {
            let scored = values.remove(metric).unwrap_or_default();
            let missing = ungradeable.remove(metric).unwrap_or(0);
            metrics.insert(
                metric.clone(),
                MetricStats::compute(&scored, missing, *threshold),
            );
        }

        Self {
            batch_id,
            graph_name,
            cases,
            metrics,
            cancelled,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentstack_core::RunStatus;

    fn scored(case: &str, metric: &str, numeric: f64) -> CaseResult {
        CaseResult {
            case_id: case.to_string(),
            run_id: format!("run-{case}"),
            run_status: RunStatus::Completed,
            scores: vec![CaseScore::Scored(Score {
                metric: metric.to_string(),
                rubric_version: "1".to_string(),
                value: ScoreValue::Numeric(numeric),
                numeric,
                rationale: None,
                run_id: format!("run-{case}"),
                seq_range: Some((0, 2)),
                rendered_prompt: "prompt".to_string(),
            })],
        }
    }

    fn ungradeable(case: &str, metric: &str) -> CaseResult {
        CaseResult {
            case_id: case.to_string(),
            run_id: format!("run-{case}"),
            run_status: RunStatus::BudgetExceeded,
            scores: vec![CaseScore::Ungradeable {
                metric: metric.to_string(),
                reason: "run did not complete".to_string(),
            }],
        }
    }

    #[test]
    fn test_metric_stats_mean_and_variance() {
        let stats = MetricStats::compute(&[2.0, 4.0], 0, 2.5);
        assert!((stats.mean - 3.0).abs() < f64::EPSILON);
        assert!((stats.variance - 1.0).abs() < f64::EPSILON);
        assert!(stats.passed);
    }

    #[test]
    fn test_metric_stats_empty() {
        let stats = MetricStats::compute(&[], 3, 0.5);
        assert_eq!(stats.scored_cases, 0);
        assert_eq!(stats.ungradeable_cases, 3);
        assert!(!stats.passed);
    }

    #[test]
    fn test_report_excludes_ungradeable_from_stats() {
        let cases = vec![
            scored("1", "quality", 4.0),
            ungradeable("2", "quality"),
            scored("3", "quality", 2.0),
        ];
        let thresholds = HashMap::from([("quality".to_string(), 3.0)]);
        let report = EvalReport::from_cases(
            "batch-1".to_string(),
            "g".to_string(),
            cases,
            &thresholds,
            false,
            1000,
        );

        let stats = &report.metrics["quality"];
        assert_eq!(stats.scored_cases, 2);
        assert_eq!(stats.ungradeable_cases, 1);
        assert!((stats.mean - 3.0).abs() < f64::EPSILON);
        assert!(stats.passed);
        assert_eq!(report.cases.len(), 3);
    }

    #[test]
    fn test_report_metric_with_no_scores() {
        let thresholds = HashMap::from([("quality".to_string(), 0.5)]);
        let report = EvalReport::from_cases(
            "batch-1".to_string(),
            "g".to_string(),
            vec![ungradeable("1", "quality")],
            &thresholds,
            false,
            10,
        );
        assert!(!report.metrics["quality"].passed);
    }

    #[test]
    fn test_case_score_accessors() {
        let entry = CaseScore::Ungradeable {
            metric: "quality".to_string(),
            reason: "judge parse error".to_string(),
        };
        assert_eq!(entry.metric(), "quality");
        assert!(entry.as_scored().is_none());
    }

    #[test]
    fn test_score_value_serialization() {
        let value = ScoreValue::Categorical("pass".to_string());
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"type\":\"categorical\""));
        let parsed: ScoreValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_report_serialization_roundtrip() {
        let thresholds = HashMap::from([("quality".to_string(), 3.0)]);
        let report = EvalReport::from_cases(
            "batch-1".to_string(),
            "g".to_string(),
            vec![scored("1", "quality", 4.0)],
            &thresholds,
            false,
            42,
        );
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: EvalReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.batch_id, "batch-1");
        assert_eq!(parsed.cases.len(), 1);
        assert!(parsed.metrics.contains_key("quality"));
    }
}
