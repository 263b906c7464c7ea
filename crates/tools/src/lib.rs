//! AgentStack Tools
//!
//! The callable-capability layer of the platform:
//! - `Tool` - the trait a capability implements to become invocable
//! - `ToolRegistry` - id -> tool mapping with declared input/output schemas
//! - `schema` - structural JSON-schema subset validation
//!
//! The registry validates every invocation's input against the tool's
//! declared input schema and the tool's result against its output schema;
//! registration of a duplicate id is rejected, which callers treat as fatal
//! at startup.

pub mod registry;
pub mod schema;

// Re-export main types
pub use registry::{Tool, ToolError, ToolRegistry, ToolResult};
pub use schema::validate_value;
