//! Tool trait: the abstraction over agent capabilities.
//!
//! A tool takes the free-text `Action Input` the model wrote and returns
//! text that becomes the step's observation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ToolError;

#[async_trait]
pub trait Tool: Send + Sync {
    /// The name the model uses in `Action:` lines.
    fn name(&self) -> &str;

    /// A description of what this tool does (shown to the model).
    fn description(&self) -> &str;

    /// Execute the tool with the model's action input.
    async fn execute(&self, input: &str) -> std::result::Result<String, ToolError>;
}

/// The tools available to one agent loop, addressed by case-insensitive name.
///
/// Keeps registration order for prompt rendering.
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

fn tool_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ToolSet {
    /// Build the set. A later tool with the same normalized name shadows an
    /// earlier one.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let tools: Vec<Arc<dyn Tool>> = tools.into_iter().collect();
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (tool_key(t.name()), i))
            .collect();
        Self { tools, index }
    }

    /// Look a tool up by exact name, ignoring case and surrounding whitespace.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(&tool_key(name)).map(|&i| &self.tools[i])
    }

    /// Run the named tool.
    pub async fn execute(&self, name: &str, input: &str) -> std::result::Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(input).await
    }

    /// `name: description` blocks, one per tool.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}\n\n", t.name(), t.description()))
            .collect()
    }

    /// Comma-separated tool names, in registration order.
    pub fn names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
