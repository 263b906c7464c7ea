//! AgentStack LLM
//!
//! The text-generation capability seam for the engine and the evaluation
//! harness. Both the reasoning capability and the judge capability are the
//! same narrow interface: one `generate` operation, so deterministic test
//! doubles can be substituted for real providers.
//!
//! - `provider` - the `LlmCapability` trait
//! - `types` - `LlmError` taxonomy and retryability classification
//! - `retry` - bounded exponential retry and circular model fallback
//! - `scripted` - deterministic capabilities for tests and replays

pub mod provider;
pub mod retry;
pub mod scripted;
pub mod types;

// Re-export main types
pub use provider::LlmCapability;
pub use retry::{FallbackChain, RetryConfig, RetryingCapability};
pub use scripted::{FailingCapability, ScriptedCapability, StaticCapability};
pub use types::{LlmError, LlmResult};
