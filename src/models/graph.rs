//! Agent Graph Model
//!
//! Defines the data structures for graph-structured agents:
//! - `GraphDefinition`: a directed graph of reasoning/tool nodes with edges
//! - `Node` / `NodeKind`: reasoning, tool-call, or terminal (closed variant)
//! - `Edge` / `Guard`: plain or guarded transitions; guards are pure
//!   predicates over run state, compiled once at load time
//! - `InputMapping`: how a tool node derives its arguments from run state
//! - `CompiledGraph`: a validated definition, immutable once a run starts
//!
//! Cycles are allowed; the step budget bounds them at execution time.
//! Edge declaration order is the deterministic tie-break when several
//! guards hold simultaneously.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::run::RunState;
use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Node
// ============================================================================

/// A node in an agent graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// What this node does when visited.
    pub kind: NodeKind,
    /// Retries after a step fault before the run is marked failed.
    /// The faulted node is re-executed with the same run state.
    #[serde(default)]
    pub retries: u32,
}

/// The closed set of node behaviors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Calls the reasoning capability with a rendered prompt template.
    Reasoning {
        /// Template rendered against run state (`{input}`, `{history}`,
        /// `{last_output}`, `{scratch.<key>}`).
        prompt_template: String,
        /// Scratch key to store the response under, in addition to history.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        store_as: Option<String>,
    },
    /// Invokes a registered tool with arguments derived from run state.
    ToolCall {
        /// Registered tool id.
        tool: String,
        /// Argument derivation rules.
        input: InputMapping,
        /// Scratch key for the tool output (defaults to the node id).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        store_as: Option<String>,
    },
    /// Explicit end marker; visiting it completes the run for free.
    Terminal,
}

impl NodeKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Terminal)
    }
}

// ============================================================================
// Input Mapping
// ============================================================================

/// Derivation of a tool's argument object from run state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputMapping(pub Vec<ArgBinding>);

/// Binds one tool parameter to a value source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgBinding {
    /// Parameter name in the tool's input object.
    pub param: String,
    /// Where the value comes from.
    pub source: ValueSource,
}

/// Sources an argument value can be drawn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValueSource {
    /// The run's original input text.
    Input,
    /// The most recent history entry's output text.
    LastOutput,
    /// A scratch-mapping key. Unset keys bind `null`, which the tool's
    /// input schema then reports.
    Scratch { key: String },
    /// A literal JSON value.
    Literal { value: Value },
}

impl InputMapping {
    /// Resolve the bindings into the tool's argument object.
    pub fn resolve(&self, state: &RunState) -> Value {
        let mut args = serde_json::Map::new();
        for binding in &self.0 {
            let value = match &binding.source {
                ValueSource::Input => Value::String(state.input.clone()),
                ValueSource::LastOutput => state
                    .last_output()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
                ValueSource::Scratch { key } => {
                    state.scratch.get(key).cloned().unwrap_or(Value::Null)
                }
                ValueSource::Literal { value } => value.clone(),
            };
            args.insert(binding.param.clone(), value);
        }
        Value::Object(args)
    }
}

// ============================================================================
// Edge
// ============================================================================

/// A directed transition between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Optional guard; a guard-less edge always matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Guard>,
}

/// Guard predicates over run state.
///
/// Guards are total: a guard over an unset scratch key evaluates false
/// instead of erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "guard", rename_all = "snake_case")]
pub enum Guard {
    /// The scratch value under `key` equals `value`.
    ScratchEquals { key: String, value: Value },
    /// The scratch value under `key` is set and truthy
    /// (not null, false, 0, "", or an empty array/object).
    ScratchTruthy { key: String },
    /// The last output text contains `needle`.
    LastOutputContains { needle: String },
}

impl Guard {
    /// Evaluate the guard against run state. Pure; no side effects.
    pub fn eval(&self, state: &RunState) -> bool {
        match self {
            Guard::ScratchEquals { key, value } => {
                state.scratch.get(key).map(|v| v == value).unwrap_or(false)
            }
            Guard::ScratchTruthy { key } => state
                .scratch
                .get(key)
                .map(is_truthy)
                .unwrap_or(false),
            Guard::LastOutputContains { needle } => state
                .last_output()
                .map(|out| out.contains(needle))
                .unwrap_or(false),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ============================================================================
// Graph Definition
// ============================================================================

/// A serializable agent graph definition.
///
/// Built from configuration, validated by `compile()` before any run
/// starts, and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Graph name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Map of node ids to nodes.
    pub nodes: HashMap<String, Node>,
    /// Edges in declaration order (the guard tie-break order).
    pub edges: Vec<Edge>,
    /// Id of the node where execution starts.
    pub entry_node: String,
}

impl GraphDefinition {
    /// Validate the definition and produce an executable graph.
    ///
    /// Checks, in order: the entry node exists; node map keys match node
    /// ids; every edge endpoint exists; every node is reachable from the
    /// entry; at least one reachable node is terminal (explicit `Terminal`
    /// kind, or no outgoing edges). Any violation is fatal configuration.
    pub fn compile(self) -> AppResult<CompiledGraph> {
        if !self.nodes.contains_key(&self.entry_node) {
            return Err(AppError::validation(format!(
                "entry node '{}' is not defined",
                self.entry_node
            )));
        }

        for (key, node) in &self.nodes {
            if key != &node.id {
                return Err(AppError::validation(format!(
                    "node map key '{}' does not match node id '{}'",
                    key, node.id
                )));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(AppError::validation(format!(
                        "edge references undefined node '{}'",
                        endpoint
                    )));
                }
            }
        }

        // Outgoing edge indices per node, preserving declaration order.
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            outgoing.entry(edge.from.clone()).or_default().push(idx);
        }

        // Reachability from the entry node.
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from([self.entry_node.clone()]);
        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            for &edge_idx in outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                queue.push_back(self.edges[edge_idx].to.clone());
            }
        }

        if let Some(unreachable) = self.nodes.keys().find(|id| !reachable.contains(*id)) {
            return Err(AppError::validation(format!(
                "node '{}' is not reachable from entry node '{}'",
                unreachable, self.entry_node
            )));
        }

        let has_terminal = self.nodes.values().any(|node| {
            node.kind.is_terminal()
                || outgoing
                    .get(&node.id)
                    .map(|edges| edges.is_empty())
                    .unwrap_or(true)
        });
        if !has_terminal {
            return Err(AppError::validation(format!(
                "graph '{}' has no terminal node",
                self.name
            )));
        }

        Ok(CompiledGraph {
            definition: self,
            outgoing,
        })
    }
}

// ============================================================================
// Compiled Graph
// ============================================================================

/// A validated, executable agent graph.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    definition: GraphDefinition,
    /// Outgoing edge indices per node id, in declaration order.
    outgoing: HashMap<String, Vec<usize>>,
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn entry_node(&self) -> &str {
        &self.definition.entry_node
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.definition.nodes.get(id)
    }

    /// Outgoing edges of a node, in declaration order.
    pub fn outgoing_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|&idx| &self.definition.edges[idx])
    }

    /// Decide the next node from `from` given the current run state.
    ///
    /// Edges are evaluated in declaration order; a guard-less edge always
    /// matches; the first match wins. `None` means the walk ends here.
    pub fn next_node(&self, from: &str, state: &RunState) -> Option<String> {
        for edge in self.outgoing_edges(from) {
            let matches = match &edge.guard {
                None => true,
                Some(guard) => guard.eval(state),
            };
            if matches {
                return Some(edge.to.clone());
            }
        }
        None
    }
}
