//! Metric Evaluator
//!
//! Scores a run transcript against a rubric with a judge capability:
//! renders the rubric's judge prompt with the transcript substituted in,
//! invokes the judge, and parses the response into the rubric's declared
//! value kind. A response that cannot be parsed is a `JudgeParse` error;
//! no default score is ever synthesized.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use agentstack_core::{render, Transcript};
use agentstack_llm::{LlmCapability, LlmError};

use crate::report::{Score, ScoreValue};
use crate::rubric::{Rubric, ScoreKind};

// ============================================================================
// Errors
// ============================================================================

/// Errors from metric evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The judge capability faulted.
    #[error("Judge capability error: {0}")]
    Judge(#[from] LlmError),

    /// The judge's response could not be parsed into the rubric's declared
    /// value type.
    #[error("Judge response unparseable for metric '{metric}': {message}")]
    JudgeParse { metric: String, message: String },
}

/// Result type alias for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

// ============================================================================
// Metric Evaluator
// ============================================================================

/// Evaluates transcripts against rubrics using a judge capability.
///
/// Stateless per call; one evaluator is safely shared across concurrent
/// batch cases.
pub struct MetricEvaluator {
    judge: Arc<dyn LlmCapability>,
}

impl MetricEvaluator {
    pub fn new(judge: Arc<dyn LlmCapability>) -> Self {
        Self { judge }
    }

    /// Evaluate one transcript against one rubric.
    ///
    /// The judged transcript text is the rubric's declared sequence
    /// sub-range when present, otherwise the full transcript.
    pub async fn evaluate(
        &self,
        transcript: &Transcript,
        rubric: &Rubric,
    ) -> EvalResult<Score> {
        let range = rubric.transcript_range.or_else(|| transcript.seq_range());
        let prompt = self.render_judge_prompt(transcript, rubric);

        debug!(
            metric = %rubric.name,
            run_id = %transcript.run_id,
            judge = self.judge.name(),
            "invoking judge"
        );
        let response = self.judge.generate(&prompt).await?;
        let (value, rationale) = parse_judge_response(&response, rubric)?;
        let numeric = numeric_projection(&value, &rubric.kind);

        Ok(Score {
            metric: rubric.name.clone(),
            rubric_version: rubric.version.clone(),
            value,
            numeric,
            rationale,
            run_id: transcript.run_id.clone(),
            seq_range: range,
            rendered_prompt: prompt,
        })
    }

    fn render_judge_prompt(&self, transcript: &Transcript, rubric: &Rubric) -> String {
        let vars = HashMap::from([
            ("metric".to_string(), rubric.name.clone()),
            ("criteria".to_string(), rubric.criteria_text()),
            (
                "transcript".to_string(),
                transcript.render_text(rubric.transcript_range),
            ),
        ]);
        render(&rubric.judge_template, &vars)
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Parse a judge response into the rubric's declared value kind.
///
/// Accepts a JSON object `{"score": ..., "rationale": ...}` first, then a
/// bare value on the first non-empty line. Out-of-range numerics and
/// unknown categories are parse errors.
fn parse_judge_response(
    response: &str,
    rubric: &Rubric,
) -> EvalResult<(ScoreValue, Option<String>)> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(parse_error(rubric, "empty judge response"));
    }

    // Structured form first.
    if let Ok(obj) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(raw) = obj.get("score") {
            let rationale = obj
                .get("rationale")
                .and_then(|v| v.as_str())
                .map(String::from);
            let value = parse_raw_value(raw, rubric)?;
            return Ok((value, rationale));
        }
    }

    // Bare value on the first non-empty line; remaining lines are rationale.
    let mut lines = trimmed.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().unwrap_or_default().trim();
    let rest: Vec<&str> = lines.collect();
    let rationale = if rest.is_empty() {
        None
    } else {
        Some(rest.join("\n"))
    };

    let value = match &rubric.kind {
        ScoreKind::Numeric { .. } => {
            let number: f64 = first
                .trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.')
                .parse()
                .map_err(|_| {
                    parse_error(rubric, format!("expected a number, got '{first}'"))
                })?;
            parse_raw_value(&serde_json::json!(number), rubric)?
        }
        ScoreKind::Categorical { .. } => {
            parse_raw_value(&serde_json::Value::String(first.to_string()), rubric)?
        }
    };

    Ok((value, rationale))
}

fn parse_raw_value(raw: &serde_json::Value, rubric: &Rubric) -> EvalResult<ScoreValue> {
    match &rubric.kind {
        ScoreKind::Numeric { min, max } => {
            let number = raw.as_f64().ok_or_else(|| {
                parse_error(rubric, format!("expected a number, got {raw}"))
            })?;
            if number < *min || number > *max {
                return Err(parse_error(
                    rubric,
                    format!("score {number} outside declared range [{min}, {max}]"),
                ));
            }
            Ok(ScoreValue::Numeric(number))
        }
        ScoreKind::Categorical { allowed } => {
            let label = raw.as_str().ok_or_else(|| {
                parse_error(rubric, format!("expected a category, got {raw}"))
            })?;
            let matched = allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(label.trim()))
                .ok_or_else(|| {
                    parse_error(
                        rubric,
                        format!("category '{label}' not in declared set {allowed:?}"),
                    )
                })?;
            Ok(ScoreValue::Categorical(matched.clone()))
        }
    }
}

/// Numeric projection for aggregation: numerics pass through; the first
/// allowed category counts as 1.0, the rest as 0.0.
fn numeric_projection(value: &ScoreValue, kind: &ScoreKind) -> f64 {
    match (value, kind) {
        (ScoreValue::Numeric(n), _) => *n,
        (ScoreValue::Categorical(label), ScoreKind::Categorical { allowed }) => {
            if allowed.first().map(|a| a == label).unwrap_or(false) {
                1.0
            } else {
                0.0
            }
        }
        (ScoreValue::Categorical(_), _) => 0.0,
    }
}

fn parse_error(rubric: &Rubric, message: impl Into<String>) -> EvalError {
    EvalError::JudgeParse {
        metric: rubric.name.clone(),
        message: message.into(),
    }
}
