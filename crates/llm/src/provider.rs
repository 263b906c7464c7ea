//! Capability Trait
//!
//! Defines the common interface for text-generation capabilities. The engine
//! uses one instance as the reasoning capability; the evaluation harness
//! uses another as the judge capability. Keeping the surface to a single
//! `generate` operation is what makes deterministic replay with scripted
//! doubles possible.

use async_trait::async_trait;

use super::types::LlmResult;

/// Trait that all text capabilities must implement.
#[async_trait]
pub trait LlmCapability: Send + Sync {
    /// Returns the capability name for identification (e.g. "openai").
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Generate a completion for the given prompt text.
    ///
    /// The prompt is fully rendered by the caller; the capability performs
    /// no templating of its own.
    async fn generate(&self, prompt: &str) -> LlmResult<String>;

    /// Check if the capability is healthy and reachable.
    ///
    /// For API providers this validates credentials; defaults to healthy
    /// for in-process capabilities.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
