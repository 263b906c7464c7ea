//! Step Executor
//!
//! Executes one node of a compiled graph against a run's mutable state:
//! reasoning nodes render their prompt template and call the reasoning
//! capability, tool nodes derive arguments and go through the tool
//! registry, terminal nodes just mark the run finished.
//!
//! Each call is a single attempt. A fault is caught and returned as a
//! failed `StepRecord` with a `Faulted` decision; the engine owns the
//! retry count and the decision to halt the run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use agentstack_core::{render, FailureKind, StepKind, StepRecord};
use agentstack_llm::{LlmCapability, LlmError};
use agentstack_tools::ToolRegistry;

use crate::models::graph::{CompiledGraph, Node, NodeKind};
use crate::models::run::RunState;

/// What the engine should do after a step attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDecision {
    /// Advance to this node.
    Next(String),
    /// The walk is over: a terminal node, or no outgoing edge matched.
    Finished,
    /// The attempt faulted; the engine decides between retry and halt.
    Faulted(FailureKind),
}

/// Executes single node attempts.
///
/// Stateless across calls; one executor serves every run of an engine.
pub struct StepExecutor {
    registry: Arc<ToolRegistry>,
    reasoning: Arc<dyn LlmCapability>,
    step_timeout: Option<Duration>,
}

impl StepExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        reasoning: Arc<dyn LlmCapability>,
        step_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            reasoning,
            step_timeout,
        }
    }

    /// Execute one attempt of `node`, mutating `state` on success.
    ///
    /// The returned record carries the attempt's sequence number `seq`;
    /// the engine appends it to the transcript either way.
    pub async fn execute(
        &self,
        graph: &CompiledGraph,
        node: &Node,
        state: &mut RunState,
        seq: u64,
    ) -> (StepRecord, StepDecision) {
        let started_at = Utc::now();

        let (kind, input, result) = match &node.kind {
            NodeKind::Terminal => {
                let record = StepRecord {
                    seq,
                    node_id: node.id.clone(),
                    kind: StepKind::Terminal,
                    input: Value::Null,
                    output: None,
                    error: None,
                    started_at,
                    finished_at: Utc::now(),
                };
                return (record, StepDecision::Finished);
            }
            NodeKind::Reasoning {
                prompt_template,
                store_as,
            } => {
                let prompt = render(prompt_template, &state.template_vars());
                debug!(node_id = %node.id, "executing reasoning step");
                let result = self.generate_with_timeout(&prompt).await;
                let outcome = result.map(|text| {
                    state.push_assistant_message(&text);
                    if let Some(key) = store_as {
                        state
                            .scratch
                            .insert(key.clone(), Value::String(text.clone()));
                    }
                    Value::String(text)
                });
                (StepKind::Reasoning, Value::String(prompt), outcome)
            }
            NodeKind::ToolCall {
                tool,
                input,
                store_as,
            } => {
                let args = input.resolve(state);
                debug!(node_id = %node.id, tool = %tool, "executing tool step");
                let result = self.invoke_with_timeout(tool, args.clone()).await;
                let outcome = result.map(|output| {
                    state.push_observation(tool, output.clone());
                    let key = store_as.clone().unwrap_or_else(|| node.id.clone());
                    state.scratch.insert(key, output.clone());
                    output
                });
                (StepKind::ToolCall, args, outcome)
            }
        };

        match result {
            Ok(output) => {
                let decision = match graph.next_node(&node.id, state) {
                    Some(next) => StepDecision::Next(next),
                    None => StepDecision::Finished,
                };
                let record = StepRecord {
                    seq,
                    node_id: node.id.clone(),
                    kind,
                    input,
                    output: Some(output),
                    error: None,
                    started_at,
                    finished_at: Utc::now(),
                };
                (record, decision)
            }
            Err((failure, message)) => {
                let record = StepRecord {
                    seq,
                    node_id: node.id.clone(),
                    kind,
                    input,
                    output: None,
                    error: Some(message),
                    started_at,
                    finished_at: Utc::now(),
                };
                (record, StepDecision::Faulted(failure))
            }
        }
    }

    /// Call the reasoning capability under the per-step timeout.
    async fn generate_with_timeout(
        &self,
        prompt: &str,
    ) -> Result<String, (FailureKind, String)> {
        let call = self.reasoning.generate(prompt);
        let result = match self.step_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(inner) => inner,
                Err(_) => Err(LlmError::timeout(format!(
                    "reasoning step exceeded {}ms",
                    timeout.as_millis()
                ))),
            },
            None => call.await,
        };
        result.map_err(|e| {
            let kind = match e {
                LlmError::Timeout { .. } => FailureKind::Timeout,
                _ => FailureKind::Capability,
            };
            (kind, e.to_string())
        })
    }

    /// Invoke a tool under the per-step timeout.
    async fn invoke_with_timeout(
        &self,
        tool: &str,
        args: Value,
    ) -> Result<Value, (FailureKind, String)> {
        let call = self.registry.invoke(tool, args);
        match self.step_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(inner) => inner.map_err(|e| (FailureKind::Tool, e.to_string())),
                Err(_) => Err((
                    FailureKind::Timeout,
                    format!("tool '{tool}' exceeded {}ms", timeout.as_millis()),
                )),
            },
            None => call.await.map_err(|e| (FailureKind::Tool, e.to_string())),
        }
    }
}
