//! Tool registry
//!
//! An explicitly constructed lookup table from tool name to capability.
//! Registries are created at application start and passed by handle into the
//! engine; there are no ambient globals. Lookup is read-mostly; registration
//! is a single map insert per key.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::{Tool, ToolContext, ToolDefinition};
use crate::error::{EngineError, EngineResult};

/// Registry mapping tool names to capabilities
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool under its definition name, replacing any previous
    /// registration for that name
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        tracing::debug!(tool = %name, "registering tool");
        let mut tools = self.tools.write().await;
        tools.insert(name, tool);
    }

    /// Look up a tool by name
    pub async fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Definitions of all registered tools
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        tools.values().map(|t| t.definition()).collect()
    }

    /// Look up and invoke a tool in one call
    pub async fn invoke(
        &self,
        name: &str,
        params: Value,
        context: ToolContext,
    ) -> EngineResult<Value> {
        let tool = self
            .lookup(name)
            .await
            .ok_or_else(|| EngineError::ToolNotFound(name.to_string()))?;

        tool.execute(params, context)
            .await
            .map_err(|e| EngineError::ToolExecution {
                tool: name.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
