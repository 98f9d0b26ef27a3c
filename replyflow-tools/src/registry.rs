use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    core::Tool,
    error::{Result, ToolError},
};

/// Tools available to a pipeline, looked up by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(ToolError::invalid_parameters(format!(
                "Tool already registered: {name}"
            )));
        }
        tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Get a tool by name, failing with `NotFound` when absent
    pub async fn require_tool(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get_tool(name)
            .await
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// List all tool names, sorted
    pub async fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
