//! Retry and Fallback Policies
//!
//! Resilience wrappers over `LlmCapability`:
//! - `RetryingCapability` retries retryable faults with exponential delay
//! - `FallbackChain` walks an ordered list of capabilities, switching to the
//!   next model once one exhausts its retries
//!
//! Rate limiting toward external providers is applied here, uniformly,
//! rather than inside individual engine components.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::provider::LlmCapability;
use super::types::{LlmError, LlmResult};

// ============================================================================
// Retry Config
// ============================================================================

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries on retryable errors (0 = single attempt).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

// ============================================================================
// RetryingCapability
// ============================================================================

/// Wraps a capability with bounded exponential retry.
pub struct RetryingCapability {
    inner: Arc<dyn LlmCapability>,
    config: RetryConfig,
}

impl RetryingCapability {
    pub fn new(inner: Arc<dyn LlmCapability>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn with_default_config(inner: Arc<dyn LlmCapability>) -> Self {
        Self::new(inner, RetryConfig::default())
    }
}

#[async_trait]
impl LlmCapability for RetryingCapability {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_delay_ms * (1 << (attempt - 1));
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }
            match self.inner.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    warn!(
                        capability = self.inner.name(),
                        model = self.inner.model(),
                        attempt,
                        error = %e,
                        "capability call failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| LlmError::other("retry loop exited without error")))
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.inner.health_check().await
    }
}

// ============================================================================
// FallbackChain
// ============================================================================

/// An ordered chain of capabilities with circular fallback.
///
/// Each call starts at the capability after the last one that failed
/// permanently, so a degraded primary does not get re-tried on every
/// request. When every capability in the chain has failed for one call,
/// the last error is returned.
pub struct FallbackChain {
    capabilities: Vec<Arc<dyn LlmCapability>>,
    current: std::sync::atomic::AtomicUsize,
}

impl FallbackChain {
    /// Create a chain. The order is the fallback order.
    pub fn new(capabilities: Vec<Arc<dyn LlmCapability>>) -> Self {
        Self {
            capabilities,
            current: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn current_index(&self) -> usize {
        self.current.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn advance(&self) {
        let len = self.capabilities.len().max(1);
        let next = (self.current_index() + 1) % len;
        self.current
            .store(next, std::sync::atomic::Ordering::Relaxed);
    }

    /// Name of the capability currently at the front of the rotation.
    pub fn active_model(&self) -> Option<String> {
        self.capabilities
            .get(self.current_index())
            .map(|c| c.model().to_string())
    }
}

#[async_trait]
impl LlmCapability for FallbackChain {
    fn name(&self) -> &'static str {
        "fallback-chain"
    }

    fn model(&self) -> &str {
        // The chain is model-agnostic; callers wanting the live model use
        // `active_model()`.
        "fallback"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        if self.capabilities.is_empty() {
            return Err(LlmError::ProviderUnavailable {
                message: "no capabilities configured in fallback chain".to_string(),
            });
        }

        let mut last_error = None;
        for _ in 0..self.capabilities.len() {
            let index = self.current_index();
            let capability = &self.capabilities[index];
            match capability.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        capability = capability.name(),
                        model = capability.model(),
                        error = %e,
                        "capability exhausted, switching to next model"
                    );
                    last_error = Some(e);
                    self.advance();
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::ProviderUnavailable {
            message: "all capabilities in fallback chain failed".to_string(),
        }))
    }

    async fn health_check(&self) -> LlmResult<()> {
        for capability in &self.capabilities {
            capability.health_check().await?;
        }
        Ok(())
    }
}
