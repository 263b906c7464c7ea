//! Deterministic Capabilities
//!
//! Test doubles for the `LlmCapability` seam:
//! - `StaticCapability` always returns the same text
//! - `ScriptedCapability` returns a queue of canned responses in order
//! - `FailingCapability` always faults with a configured error
//!
//! These are what make engine runs replayable: with identical scripted
//! responses, two executions of the same graph produce identical
//! transcripts.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmCapability;
use super::types::{LlmError, LlmResult};

// ============================================================================
// StaticCapability
// ============================================================================

/// A capability that returns the same response for every prompt.
pub struct StaticCapability {
    response: String,
}

impl StaticCapability {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LlmCapability for StaticCapability {
    fn name(&self) -> &'static str {
        "static"
    }

    fn model(&self) -> &str {
        "static-1"
    }

    async fn generate(&self, _prompt: &str) -> LlmResult<String> {
        Ok(self.response.clone())
    }
}

// ============================================================================
// ScriptedCapability
// ============================================================================

/// A capability that replays a scripted sequence of responses.
///
/// Each `generate` call consumes the next entry. Calling past the end of
/// the script is an `LlmError::Other` so a test fails loudly instead of
/// silently looping.
pub struct ScriptedCapability {
    responses: Mutex<VecDeque<LlmResult<String>>>,
    /// Prompts seen so far, for assertions on rendered templates.
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCapability {
    /// Create a script of successful responses.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a script mixing successes and faults.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = LlmResult<String>>,
    {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// The prompts this capability has been called with, in order.
    pub fn seen_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of unconsumed script entries.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmCapability for ScriptedCapability {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| LlmError::other("script lock poisoned"))?
            .pop_front();
        match next {
            Some(result) => result,
            None => Err(LlmError::other("scripted capability exhausted")),
        }
    }
}

// ============================================================================
// FailingCapability
// ============================================================================

/// A capability that faults on every call.
pub struct FailingCapability {
    error: LlmError,
}

impl FailingCapability {
    pub fn new(error: LlmError) -> Self {
        Self { error }
    }
}

impl Default for FailingCapability {
    fn default() -> Self {
        Self::new(LlmError::ServerError {
            message: "capability unavailable".to_string(),
            status: Some(503),
        })
    }
}

#[async_trait]
impl LlmCapability for FailingCapability {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-1"
    }

    async fn generate(&self, _prompt: &str) -> LlmResult<String> {
        Err(self.error.clone())
    }

    async fn health_check(&self) -> LlmResult<()> {
        Err(self.error.clone())
    }
}
