//! Integration Tests Module
//!
//! End-to-end tests for the AgentStack engine: full graph runs against the
//! durable recorder, the evaluation harness over batches, and the recorder
//! ordering guarantees under concurrency.

// Shared graph/tool/capability fixtures
mod helpers;

// Full graph execution scenarios (budgets, retries, determinism)
mod engine_test;

// Batch evaluation scenarios (isolation, judge strictness, aggregation)
mod harness_test;

// Transcript ordering and durability tests
mod recorder_test;
