use async_trait::async_trait;
use serde_json::Value;

/// Execution side of a tool. Adapted Unizo tools implement this so they can
/// be mixed with a host application's own tools in a [`super::ToolRegistry`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: &Value) -> Result<String, String>;
}

/// A tool definition: schema for the LLM + handler for execution.
pub struct ToolDef {
    pub name: String,
    pub schema: Value,
    pub(crate) handler: Box<dyn ToolHandler>,
}
