//! Session double and fixture tools shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::UnizoError;
use crate::mcp::{CallToolResult, Content, InitializeResult, McpSession, McpTool};

fn tool(name: &str, description: &str, input_schema: Value) -> McpTool {
    McpTool {
        name: name.into(),
        description: Some(description.into()),
        input_schema,
    }
}

pub(crate) fn mock_tools() -> Vec<McpTool> {
    vec![
        tool(
            "list_services",
            "List all available services",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        tool(
            "create_ticket",
            "Create a new ticket",
            json!({
                "type": "object",
                "properties": {
                    "ticket_name": {"type": "string", "description": "Ticket name"},
                    "ticket_description": {"type": "string", "description": "Ticket description"},
                    "ticket_status": {"type": "string", "description": "Ticket status"},
                    "ticket_priority": {"type": "string", "description": "Ticket priority"},
                    "ticket_type": {"type": "string", "description": "Ticket type"},
                    "integration_id": {"type": "string", "description": "Integration ID"},
                    "organization_id": {"type": "string", "description": "Organization ID"},
                    "collection_id": {"type": "string", "description": "Collection ID"}
                },
                "required": ["ticket_name", "integration_id", "organization_id", "collection_id"]
            }),
        ),
        tool(
            "list_tickets",
            "List tickets in a collection",
            json!({
                "type": "object",
                "properties": {
                    "collection_id": {"type": "string", "description": "Collection ID"}
                },
                "required": ["collection_id"]
            }),
        ),
        tool(
            "health_check",
            "Check server health",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
    ]
}

pub(crate) fn ticket_result() -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(
            json!({"status": "ok", "ticket_id": "T-001"}).to_string(),
        )],
        structured_content: None,
        is_error: false,
    }
}

/// Scripted [`McpSession`]. Tool calls pop queued results; once the queue is
/// empty the default ticket result is returned.
pub(crate) struct MockSession {
    tools: Mutex<Vec<McpTool>>,
    results: Mutex<VecDeque<Result<CallToolResult, UnizoError>>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Option<Duration>,
    fail_list: bool,
}

impl MockSession {
    pub(crate) fn new() -> Self {
        Self {
            tools: Mutex::new(mock_tools()),
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            fail_list: false,
        }
    }

    pub(crate) fn with_tools(self, tools: Vec<McpTool>) -> Self {
        *self.tools.lock().unwrap() = tools;
        self
    }

    pub(crate) fn with_result(self, result: Result<CallToolResult, UnizoError>) -> Self {
        self.results.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl McpSession for MockSession {
    async fn initialize(&self) -> Result<InitializeResult, UnizoError> {
        Ok(InitializeResult::default())
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, UnizoError> {
        if self.fail_list {
            return Err(UnizoError::Transport("connection lost".into()));
        }
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, UnizoError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(ticket_result()))
    }
}

/// Lets a test keep a handle on the double after handing it to a toolset.
#[async_trait]
impl McpSession for std::sync::Arc<MockSession> {
    async fn initialize(&self) -> Result<InitializeResult, UnizoError> {
        (**self).initialize().await
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, UnizoError> {
        (**self).list_tools().await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, UnizoError> {
        (**self).call_tool(name, arguments).await
    }
}
