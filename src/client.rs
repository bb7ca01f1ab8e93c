use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::actions::Action;
use crate::config::ToolSetConfig;
use crate::error::UnizoError;
use crate::mcp::{CallToolResult, McpSession, SseSession};
use crate::schema::ToolSchema;

/// Core client for the Unizo ticketing MCP server. Holds at most one session;
/// every adapter wraps a shared `Arc<UnizoToolSet>`.
pub struct UnizoToolSet {
    config: ToolSetConfig,
    session: Mutex<Option<Arc<dyn McpSession>>>,
}

impl UnizoToolSet {
    pub fn new(api_key: impl Into<String>) -> Result<Self, UnizoError> {
        Self::with_config(ToolSetConfig::new(api_key)?)
    }

    pub fn with_config(config: ToolSetConfig) -> Result<Self, UnizoError> {
        if config.api_key.trim().is_empty() {
            error!("UNIZO_API_KEY is not provided or empty");
            return Err(UnizoError::InvalidConfig("UNIZO_API_KEY is required".into()));
        }
        info!(server_url = %config.server_url, "UnizoToolSet initialized");
        Ok(Self {
            config,
            session: Mutex::new(None),
        })
    }

    /// Use an already initialized session instead of opening one.
    pub fn with_session(self, session: impl McpSession + 'static) -> Self {
        let session: Arc<dyn McpSession> = Arc::new(session);
        Self {
            config: self.config,
            session: Mutex::new(Some(session)),
        }
    }

    pub fn config(&self) -> &ToolSetConfig {
        &self.config
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Open the SSE session, initialize it and log the advertised tools.
    /// A no-op when a session already exists.
    pub async fn connect(&self) -> Result<(), UnizoError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        *slot = Some(self.open_session().await?);
        Ok(())
    }

    async fn open_session(&self) -> Result<Arc<dyn McpSession>, UnizoError> {
        debug!(url = %self.config.server_url, "connecting to Unizo MCP server");
        let session = SseSession::connect(&self.config).await?;
        session.initialize().await?;
        let tools = session.list_tools().await?;
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        info!(tools = ?names, "connected to Unizo MCP server");
        Ok(Arc::new(session))
    }

    async fn session(&self) -> Result<Arc<dyn McpSession>, UnizoError> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }
        let session = self.open_session().await?;
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Tool schemas advertised by the server. A non-empty `actions` slice
    /// keeps only the tools named by those actions.
    pub async fn get_tools(&self, actions: Option<&[Action]>) -> Result<Vec<ToolSchema>, UnizoError> {
        let session = self
            .session()
            .await
            .map_err(|e| UnizoError::ToolDiscovery(Box::new(e)))?;
        let listed = session.list_tools().await.map_err(|e| {
            error!(error = %e, "error fetching tools");
            UnizoError::ToolDiscovery(Box::new(e))
        })?;

        let mut tools: Vec<ToolSchema> = listed.iter().map(ToolSchema::from_mcp).collect();
        if let Some(actions) = actions.filter(|a| !a.is_empty()) {
            tools.retain(|t| actions.iter().any(|a| a.as_str() == t.name));
        }

        info!(count = tools.len(), "fetched tools");
        debug!(tools = ?tools, "tool schemas");
        Ok(tools)
    }

    pub async fn execute_action(&self, action: Action, params: Value) -> Result<Value, UnizoError> {
        self.execute_tool(action.as_str(), params).await
    }

    /// Call a tool by name and unwrap its result payload.
    pub async fn execute_tool(&self, name: &str, params: Value) -> Result<Value, UnizoError> {
        let wrap = |e: UnizoError| {
            error!(action = name, error = %e, "error executing action");
            UnizoError::ToolExecution {
                action: name.to_string(),
                source: Box::new(e),
            }
        };

        let session = self.session().await.map_err(wrap)?;
        let result = session.call_tool(name, params).await.map_err(wrap)?;
        let value = unwrap_result(name, result).map_err(wrap)?;
        info!(action = name, "executed action successfully");
        Ok(value)
    }

    /// Close and forget the session. Safe to call more than once.
    pub async fn cleanup(&self) -> Result<(), UnizoError> {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.close().await?;
        }
        info!("UnizoToolSet cleaned up");
        Ok(())
    }
}

/// Structured content wins; otherwise text items are decoded as JSON (plain
/// text is kept as a string). One item is returned bare, several as an array.
fn unwrap_result(name: &str, result: CallToolResult) -> Result<Value, UnizoError> {
    if result.is_error {
        let message = result
            .content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(UnizoError::ToolError {
            tool: name.to_string(),
            message,
        });
    }

    if let Some(structured) = result.structured_content {
        if is_truthy(&structured) {
            return Ok(structured);
        }
    }

    let mut items: Vec<Value> = result
        .content
        .iter()
        .filter_map(|c| c.as_text())
        .map(|text| serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
        .collect();

    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(Value::Array(items))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
