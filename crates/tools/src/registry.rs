//! Tool Registry
//!
//! Maps tool ids to callable capabilities with declared input/output
//! schemas. Registration rejects duplicate ids; invocation validates the
//! input before the call and the output after it, and wraps capability
//! faults with the originating tool's id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::schema::validate_value;

// ============================================================================
// Errors
// ============================================================================

/// Errors from tool registration and invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A tool with this id is already registered. Fatal at startup.
    #[error("Duplicate tool: {name}")]
    Duplicate { name: String },

    /// No tool registered under this id.
    #[error("Unknown tool: {name}")]
    Unknown { name: String },

    /// Input or output did not conform to the declared schema.
    #[error("Schema validation failed for tool '{name}': {}", errors.join("; "))]
    Schema { name: String, errors: Vec<String> },

    /// The tool's capability faulted; carries the original cause.
    #[error("Tool '{name}' execution failed: {message}")]
    Execution { name: String, message: String },
}

/// Result type alias for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

// ============================================================================
// Tool Trait
// ============================================================================

/// A callable capability with declared input and output schemas.
///
/// Implementations are registered into the `ToolRegistry` by the service
/// layer at startup and invoked by the step executor during graph runs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique id of this tool (e.g. "search", "calculator").
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema the invocation input must conform to.
    fn input_schema(&self) -> Value;

    /// JSON schema the tool's output must conform to.
    fn output_schema(&self) -> Value;

    /// Execute the tool with already-validated arguments.
    ///
    /// Faults should be returned as `ToolError::Execution`; the registry
    /// wraps any other message under the tool's id.
    async fn invoke(&self, args: Value) -> ToolResult<Value>;
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Registry of `Tool` implementations.
///
/// O(1) lookup by id with insertion-ordered iteration for deterministic
/// listings. The registry itself is stateless per call and safe to share
/// across concurrent runs behind an `Arc`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool.
    ///
    /// Returns `ToolError::Duplicate` if the id is taken. Callers treat
    /// this as fatal at startup rather than replacing the registration.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate { name });
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool definitions as JSON values in registration order.
    ///
    /// Suitable for prompt construction or documentation.
    pub fn definitions(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "input_schema": tool.input_schema(),
                    "output_schema": tool.output_schema(),
                })
            })
            .collect()
    }

    /// Invoke a tool by id.
    ///
    /// Validates `input` against the tool's input schema, executes, and
    /// validates the result against the output schema before returning it.
    pub async fn invoke(&self, name: &str, input: Value) -> ToolResult<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::Unknown {
                name: name.to_string(),
            })?;

        let input_errors = validate_value(&input, &tool.input_schema());
        if !input_errors.is_empty() {
            return Err(ToolError::Schema {
                name: name.to_string(),
                errors: input_errors,
            });
        }

        debug!(tool = name, "invoking tool");
        let output = tool.invoke(input).await.map_err(|e| match e {
            err @ ToolError::Execution { .. } => err,
            other => ToolError::Execution {
                name: name.to_string(),
                message: other.to_string(),
            },
        })?;

        let output_errors = validate_value(&output, &tool.output_schema());
        if !output_errors.is_empty() {
            return Err(ToolError::Schema {
                name: name.to_string(),
                errors: output_errors,
            });
        }

        Ok(output)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
