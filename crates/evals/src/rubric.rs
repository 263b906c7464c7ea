//! Rubric Types
//!
//! Defines the immutable evaluation configuration:
//! - `Rubric`: named metric with criteria, judge prompt template, and the
//!   declared score kind
//! - `Criterion`: one weighted scoring criterion
//! - `ScoreKind`: numeric scale or fixed category set
//!
//! Rubrics are configuration: loaded once, never mutated during a batch.

use serde::{Deserialize, Serialize};

// ============================================================================
// Score Kind
// ============================================================================

/// The value type a rubric's judge response must parse into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreKind {
    /// A numeric scale, inclusive on both ends.
    Numeric { min: f64, max: f64 },
    /// A fixed category set (e.g. ["pass", "fail"]).
    Categorical { allowed: Vec<String> },
}

impl ScoreKind {
    /// A 0..=1 numeric scale.
    pub fn unit_scale() -> Self {
        ScoreKind::Numeric { min: 0.0, max: 1.0 }
    }

    /// A pass/fail category pair.
    pub fn pass_fail() -> Self {
        ScoreKind::Categorical {
            allowed: vec!["pass".to_string(), "fail".to_string()],
        }
    }
}

// ============================================================================
// Criterion
// ============================================================================

/// One scoring criterion within a rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    /// What the judge should look for.
    pub description: String,
    /// Relative weight, rendered into the judge prompt.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

// ============================================================================
// Rubric
// ============================================================================

/// A named evaluation metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    /// Metric name (unique within a batch).
    pub name: String,
    /// Rubric version, stamped onto every score produced from it.
    #[serde(default = "default_version")]
    pub version: String,
    /// Ordered scoring criteria.
    pub criteria: Vec<Criterion>,
    /// Judge prompt template. Placeholders: `{metric}`, `{criteria}`,
    /// `{transcript}`.
    pub judge_template: String,
    /// Declared value type of the judge's answer.
    pub kind: ScoreKind,
    /// Numeric threshold a metric's aggregate must reach to pass. For
    /// categorical rubrics this is the minimum fraction of cases in the
    /// first allowed category.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    /// Whether this metric only applies to completed transcripts. Failed or
    /// budget-exceeded runs score as ungradeable when true.
    #[serde(default = "default_requires_completed")]
    pub requires_completed: bool,
    /// Optional inclusive sequence sub-range of the transcript to judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_range: Option<(u64, u64)>,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_pass_threshold() -> f64 {
    0.5
}

fn default_requires_completed() -> bool {
    true
}

impl Rubric {
    /// Render the criteria as a numbered list for the judge prompt.
    pub fn criteria_text(&self) -> String {
        self.criteria
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. (weight {}) {}", i + 1, c.weight, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
