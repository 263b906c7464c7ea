//! Shared fixtures for the integration suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use agentstack::llm::LlmCapability;
use agentstack::tools::{Tool, ToolRegistry, ToolResult};
use agentstack::{
    ArgBinding, CompiledGraph, Edge, EngineConfig, EventSink, GraphDefinition, GraphEngine,
    InputMapping, MemoryRecorder, Node, NodeKind, RunRecorder, StepExecutor, ValueSource,
};

/// A search tool that always finds three results.
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Searches an index"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    fn output_schema(&self) -> Value {
        json!({"type": "string"})
    }

    async fn invoke(&self, _args: Value) -> ToolResult<Value> {
        Ok(json!("3 results"))
    }
}

/// The spec's reference graph: start(reasoning) -> search(tool) -> end.
pub fn search_graph() -> CompiledGraph {
    GraphDefinition {
        name: "search-agent".to_string(),
        description: Some("Reason, search, stop".to_string()),
        nodes: HashMap::from([
            (
                "start".to_string(),
                Node {
                    id: "start".to_string(),
                    kind: NodeKind::Reasoning {
                        prompt_template: "{input}".to_string(),
                        store_as: None,
                    },
                    retries: 0,
                },
            ),
            (
                "search".to_string(),
                Node {
                    id: "search".to_string(),
                    kind: NodeKind::ToolCall {
                        tool: "search".to_string(),
                        input: InputMapping(vec![ArgBinding {
                            param: "query".to_string(),
                            source: ValueSource::LastOutput,
                        }]),
                        store_as: None,
                    },
                    retries: 0,
                },
            ),
            (
                "end".to_string(),
                Node {
                    id: "end".to_string(),
                    kind: NodeKind::Terminal,
                    retries: 0,
                },
            ),
        ]),
        edges: vec![
            Edge {
                from: "start".to_string(),
                to: "search".to_string(),
                guard: None,
            },
            Edge {
                from: "search".to_string(),
                to: "end".to_string(),
                guard: None,
            },
        ],
        entry_node: "start".to_string(),
    }
    .compile()
    .expect("reference graph compiles")
}

/// An engine over the in-memory recorder with the search tool registered.
pub fn engine_with(
    reasoning: Arc<dyn LlmCapability>,
    budget: u32,
) -> (GraphEngine, Arc<MemoryRecorder>) {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool)).expect("register search");

    let recorder = Arc::new(MemoryRecorder::new());
    let config = EngineConfig {
        default_step_budget: budget,
        step_timeout_ms: 0,
        batch_concurrency: 2,
    };
    let executor = StepExecutor::new(Arc::new(registry), reasoning, config.step_timeout());
    let engine = GraphEngine::new(
        executor,
        Arc::clone(&recorder) as Arc<dyn RunRecorder>,
        EventSink::null(),
        config,
    );
    (engine, recorder)
}
