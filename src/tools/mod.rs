//! Tool registry and the study-file tools exposed to the model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

mod files;

pub use files::{GetFileContent, ListFiles, SearchInFiles};

/// Failure of a tool handler. Reported back into the conversation rather
/// than failing the turn, so the model can react to it.
#[derive(Debug, Error)]
#[error("tool '{tool}' failed: {reason}")]
pub struct ToolError {
    pub tool: String,
    pub reason: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as advertised to the provider.
    fn name(&self) -> &str;

    /// Human-readable description for the capability manifest.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute with decoded JSON arguments. Each call must be side-effect
    /// isolated; the result must be JSON-serializable.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Static description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of available tools.
///
/// Registration order is preserved, so the manifest sent to the provider is
/// identical across calls within a process run.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the built-in study-file tools.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(GetFileContent));
        registry.register(Arc::new(ListFiles));
        registry.register(Arc::new(SearchInFiles));
        registry
    }

    /// Create a registry with no tools.
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Descriptors are static for the life of the process.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Look up a tool by its advertised name.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Descriptors for all registered tools, in registration order.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Capability manifest in the provider's function-calling wire shape.
    pub fn manifest(&self) -> Vec<Value> {
        self.list_tools()
            .into_iter()
            .map(|descriptor| {
                json!({
                    "type": "function",
                    "function": {
                        "name": descriptor.name,
                        "description": descriptor.description,
                        "parameters": descriptor.parameters,
                    }
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
