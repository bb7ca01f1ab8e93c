//! Crew tools: CrewAI's `BaseTool` convention. Both entry points always
//! return a payload; failures and timeouts come back as `{"error": "..."}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info};

use crate::actions::Action;
use crate::client::UnizoToolSet;
use crate::error::UnizoError;
use crate::schema::{ArgsSchema, ToolSchema};
use crate::tools::{ToolHandler, ToolRegistry};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CrewTool {
    name: String,
    description: String,
    args_schema: ArgsSchema,
    /// Known action behind this tool; `None` for server tools outside [`Action`].
    action: Option<Action>,
    toolset: Arc<UnizoToolSet>,
    timeout: Duration,
}

impl CrewTool {
    pub fn new(tool: &ToolSchema, toolset: Arc<UnizoToolSet>) -> Self {
        debug!(tool = %tool.name, description = %tool.description, "created crew tool");
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            args_schema: ArgsSchema::from_tool(tool),
            action: tool.name.parse().ok(),
            toolset,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn args_schema(&self) -> &ArgsSchema {
        &self.args_schema
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn schema(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.args_schema.to_json_schema(),
        })
    }

    pub async fn run_async(&self, params: Value) -> Value {
        self.run_inner(params)
            .await
            .unwrap_or_else(|message| json!({ "error": message }))
    }

    async fn run_inner(&self, params: Value) -> Result<Value, String> {
        debug!(tool = %self.name, params = %params, "tool called");
        if let Err(message) = self.args_schema.validate(&params) {
            let err = UnizoError::InvalidParameters {
                tool: self.name.clone(),
                message,
            };
            return Err(self.failure(&err));
        }

        match tokio::time::timeout(self.timeout, self.toolset.execute_tool(&self.name, params)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.failure(&e)),
            Err(_) => {
                error!(tool = %self.name, "tool timed out");
                Err(format!("Tool {} timed out after {:?}", self.name, self.timeout))
            }
        }
    }

    /// Blocking entry point. Works from plain threads and from inside a
    /// multi-thread runtime; a current-thread runtime cannot be blocked on.
    pub fn run(&self, params: Value) -> Value {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.run_async(params)))
            }
            Ok(_) => {
                error!(tool = %self.name, "run called inside a current-thread runtime");
                json!({
                    "error": format!(
                        "Failed to execute {}: cannot block inside a current-thread runtime, use run_async",
                        self.name
                    )
                })
            }
            Err(_) => match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(self.run_async(params)),
                Err(e) => {
                    error!(tool = %self.name, error = %e, "failed to start runtime");
                    json!({ "error": format!("Failed to execute {}: {e}", self.name) })
                }
            },
        }
    }

    fn failure(&self, err: &UnizoError) -> String {
        error!(tool = %self.name, error = %err, "error executing tool");
        format!("Failed to execute {}: {err}", self.name)
    }
}

#[async_trait]
impl ToolHandler for CrewTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        self.run_inner(input.clone()).await.map(|v| v.to_string())
    }
}

pub struct UnizoCrewAIToolSet {
    toolset: Arc<UnizoToolSet>,
    timeout: Duration,
}

impl UnizoCrewAIToolSet {
    pub fn new(api_key: impl Into<String>) -> Result<Self, UnizoError> {
        Ok(Self::from_toolset(Arc::new(UnizoToolSet::new(api_key)?)))
    }

    pub fn from_toolset(toolset: Arc<UnizoToolSet>) -> Self {
        Self {
            toolset,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Timeout applied to every tool this toolset builds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn toolset(&self) -> &Arc<UnizoToolSet> {
        &self.toolset
    }

    pub async fn get_tools(&self, actions: Option<&[Action]>) -> Result<Vec<CrewTool>, UnizoError> {
        let tools: Vec<CrewTool> = self
            .toolset
            .get_tools(actions)
            .await?
            .iter()
            .map(|t| CrewTool::new(t, Arc::clone(&self.toolset)).with_timeout(self.timeout))
            .collect();
        info!(count = tools.len(), "converted tools for CrewAI");
        Ok(tools)
    }

    pub async fn registry(&self, actions: Option<&[Action]>) -> Result<ToolRegistry, UnizoError> {
        let registry = self
            .get_tools(actions)
            .await?
            .into_iter()
            .fold(ToolRegistry::new(), |reg, tool| {
                let name = tool.name.clone();
                let schema = tool.schema();
                reg.add(name, schema, tool)
            });
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{CallToolResult, Content};
    use crate::testing::MockSession;

    fn crew(session: MockSession) -> UnizoCrewAIToolSet {
        let toolset = UnizoToolSet::new("test_key").unwrap().with_session(session);
        UnizoCrewAIToolSet::from_toolset(Arc::new(toolset))
    }

    async fn health_check(ts: &UnizoCrewAIToolSet) -> CrewTool {
        ts.get_tools(Some(&[Action::HealthCheck]))
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn converts_every_tool() {
        let tools = crew(MockSession::new()).get_tools(None).await.unwrap();
        assert_eq!(tools.len(), 4);
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert!(names.contains(&"list_tickets"));
        let list = tools.iter().find(|t| t.name() == "list_tickets").unwrap();
        assert_eq!(list.description(), "List tickets in a collection");
        assert!(list.args_schema().field("collection_id").unwrap().required);
    }

    #[tokio::test]
    async fn run_async_returns_result() {
        let ts = crew(MockSession::new());
        let tool = health_check(&ts).await;
        let out = tool.run_async(json!({})).await;
        assert_eq!(out["status"], "ok");
    }

    #[tokio::test]
    async fn failure_becomes_error_payload() {
        let ts = crew(
            MockSession::new().with_result(Err(UnizoError::Transport("connection lost".into()))),
        );
        let tool = health_check(&ts).await;
        let out = tool.run_async(json!({})).await;
        let message = out["error"].as_str().unwrap();
        assert!(message.starts_with("Failed to execute health_check: "));
        assert!(message.contains("connection lost"));
    }

    #[tokio::test]
    async fn invalid_params_become_error_payload() {
        let ts = crew(MockSession::new());
        let tool = ts
            .get_tools(Some(&[Action::ListTickets]))
            .await
            .unwrap()
            .remove(0);
        let out = tool.run_async(json!({"collection_id": 12})).await;
        assert!(out["error"]
            .as_str()
            .unwrap()
            .contains("collection_id: input should be a valid string"));
    }

    #[tokio::test]
    async fn timeout_becomes_error_payload() {
        let ts = crew(MockSession::new().with_delay(Duration::from_millis(500)))
            .with_timeout(Duration::from_millis(20));
        let tool = health_check(&ts).await;
        let out = tool.run_async(json!({})).await;
        assert_eq!(out["error"], "Tool health_check timed out after 20ms");
    }

    #[test]
    fn run_outside_runtime() {
        let ts = crew(MockSession::new());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let tool = runtime.block_on(health_check(&ts));
        drop(runtime);

        let out = tool.run(json!({}));
        assert_eq!(out["ticket_id"], "T-001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_inside_multi_thread_runtime() {
        let ts = crew(MockSession::new());
        let tool = health_check(&ts).await;
        let out = tool.run(json!({}));
        assert_eq!(out["status"], "ok");
    }

    #[tokio::test]
    async fn run_inside_current_thread_runtime_reports_error() {
        let ts = crew(MockSession::new());
        let tool = health_check(&ts).await;
        let out = tool.run(json!({}));
        assert!(out["error"].as_str().unwrap().contains("use run_async"));
    }

    #[tokio::test]
    async fn handler_maps_error_payload_to_err() {
        let ts = crew(
            MockSession::new().with_result(Err(UnizoError::Transport("connection lost".into()))),
        );
        let registry = ts.registry(None).await.unwrap();
        let err = registry.execute("health_check", &json!({})).await.unwrap_err();
        assert!(err.contains("connection lost"));
        let ok = registry.execute("health_check", &json!({})).await.unwrap();
        assert!(ok.contains("T-001"));
    }

    #[tokio::test]
    async fn handler_keeps_error_shaped_results() {
        let result = CallToolResult {
            content: vec![Content::text(r#"{"error":"none"}"#)],
            structured_content: None,
            is_error: false,
        };
        let ts = crew(MockSession::new().with_result(Ok(result)));
        let registry = ts.registry(None).await.unwrap();
        let out = registry.execute("health_check", &json!({})).await.unwrap();
        assert_eq!(out, r#"{"error":"none"}"#);
    }

    #[tokio::test]
    async fn tools_know_their_action() {
        let custom = crate::mcp::McpTool {
            name: "custom_tool".into(),
            description: None,
            input_schema: json!({"type": "object"}),
        };
        let mut tools = crate::testing::mock_tools();
        tools.push(custom);
        let ts = crew(MockSession::new().with_tools(tools));
        let tools = ts.get_tools(None).await.unwrap();
        let action_of = |name: &str| tools.iter().find(|t| t.name() == name).unwrap().action();
        assert_eq!(action_of("create_ticket"), Some(Action::CreateTicket));
        assert_eq!(action_of("custom_tool"), None);
    }
}
