//! Engine Configuration
//!
//! The configuration surface the core consumes: step budget default,
//! per-step timeout, and the batch evaluation concurrency limit. Loaded
//! from TOML by the embedding service layer; every field has a serde
//! default so partial files work.

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Configuration for graph execution and batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Step budget applied to runs that don't specify one. Must be positive.
    #[serde(default = "default_step_budget")]
    pub default_step_budget: u32,
    /// Per-step timeout for reasoning and tool calls in milliseconds
    /// (0 = no timeout). A timed-out step is treated as a capability fault.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// Maximum number of batch evaluation cases in flight at once.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_step_budget() -> u32 {
    25
}

fn default_step_timeout_ms() -> u64 {
    60_000
}

fn default_batch_concurrency() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_step_budget: default_step_budget(),
            step_timeout_ms: default_step_timeout_ms(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML configuration string and validate it.
    pub fn from_toml_str(raw: &str) -> AppResult<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| AppError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants. Called at startup; violations are fatal.
    pub fn validate(&self) -> AppResult<()> {
        if self.default_step_budget == 0 {
            return Err(AppError::validation(
                "default_step_budget must be a positive integer",
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(AppError::validation("batch_concurrency must be at least 1"));
        }
        Ok(())
    }

    /// The per-step timeout as a `Duration`, `None` when disabled.
    pub fn step_timeout(&self) -> Option<std::time::Duration> {
        if self.step_timeout_ms == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.step_timeout_ms))
        }
    }
}
