//! Structured tools: a name, a description, a typed argument schema and an
//! async entry point, in the shape LangChain's `StructuredTool` expects.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::actions::Action;
use crate::client::UnizoToolSet;
use crate::error::UnizoError;
use crate::schema::{ArgsSchema, ToolSchema};
use crate::tools::{ToolHandler, ToolRegistry};

pub struct StructuredTool {
    name: String,
    description: String,
    args_schema: ArgsSchema,
    toolset: Arc<UnizoToolSet>,
}

impl StructuredTool {
    pub fn new(tool: &ToolSchema, toolset: Arc<UnizoToolSet>) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            args_schema: ArgsSchema::from_tool(tool),
            toolset,
        }
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

    /// Registry-style definition: name, description, input_schema.
    pub fn schema(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.args_schema.to_json_schema(),
        })
    }

    /// Validate `params` against the argument schema and forward the call.
    ///
    /// Some agents wrap the real arguments in a `properties` key, either as
    /// an object or as a JSON string; unless the tool itself declares a
    /// `properties` argument, that wrapper is unpacked first.
    pub async fn ainvoke(&self, params: Value) -> Result<Value, UnizoError> {
        debug!(tool = %self.name, params = %params, "tool called with raw params");
        let params = self.unwrap_properties(params)?;
        debug!(tool = %self.name, params = %params, "tool executing");

        self.args_schema.validate(&params).map_err(|message| {
            error!(tool = %self.name, error = %message, "schema validation failed");
            UnizoError::InvalidParameters {
                tool: self.name.clone(),
                message,
            }
        })?;
        self.toolset.execute_tool(&self.name, params).await
    }

    fn unwrap_properties(&self, params: Value) -> Result<Value, UnizoError> {
        if self.args_schema.field("properties").is_some() {
            return Ok(params);
        }
        let inner = match params.get("properties") {
            Some(Value::String(raw)) => Some(serde_json::from_str(raw).map_err(|e| {
                error!(tool = %self.name, error = %e, "failed to parse properties");
                UnizoError::InvalidParameters {
                    tool: self.name.clone(),
                    message: format!("invalid JSON in properties: {e}"),
                }
            })?),
            Some(inner @ Value::Object(_)) => Some(inner.clone()),
            _ => None,
        };
        Ok(inner.unwrap_or(params))
    }
}

#[async_trait]
impl ToolHandler for StructuredTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        self.ainvoke(input.clone())
            .await
            .map(|v| v.to_string())
            .map_err(|e| e.to_string())
    }
}

pub struct UnizoLangChainToolSet {
    toolset: Arc<UnizoToolSet>,
}

impl UnizoLangChainToolSet {
    pub fn new(api_key: impl Into<String>) -> Result<Self, UnizoError> {
        Ok(Self::from_toolset(Arc::new(UnizoToolSet::new(api_key)?)))
    }

    pub fn from_toolset(toolset: Arc<UnizoToolSet>) -> Self {
        Self { toolset }
    }

    pub fn toolset(&self) -> &Arc<UnizoToolSet> {
        &self.toolset
    }

    pub async fn get_tools(&self, actions: Option<&[Action]>) -> Result<Vec<StructuredTool>, UnizoError> {
        let tools: Vec<StructuredTool> = self
            .toolset
            .get_tools(actions)
            .await?
            .iter()
            .map(|t| StructuredTool::new(t, Arc::clone(&self.toolset)))
            .collect();
        info!(count = tools.len(), "converted tools for LangChain");
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
    use crate::testing::MockSession;

    fn toolset_with(session: MockSession) -> (UnizoLangChainToolSet, Arc<MockSession>) {
        let session = Arc::new(session);
        let toolset = UnizoToolSet::new("test_key")
            .unwrap()
            .with_session(Arc::clone(&session));
        (UnizoLangChainToolSet::from_toolset(Arc::new(toolset)), session)
    }

    async fn create_ticket(ts: &UnizoLangChainToolSet) -> StructuredTool {
        ts.get_tools(Some(&[Action::CreateTicket]))
            .await
            .unwrap()
            .remove(0)
    }

    fn valid_params() -> Value {
        json!({
            "ticket_name": "Test",
            "integration_id": "i1",
            "organization_id": "o1",
            "collection_id": "c1"
        })
    }

    #[tokio::test]
    async fn converts_every_tool() {
        let (ts, _) = toolset_with(MockSession::new());
        let tools = ts.get_tools(None).await.unwrap();
        assert_eq!(tools.len(), 4);
        let create = tools.iter().find(|t| t.name() == "create_ticket").unwrap();
        assert_eq!(create.description(), "Create a new ticket");
        assert_eq!(create.args_schema().title, "create_ticketSchema");
        assert!(create.args_schema().field("ticket_name").unwrap().required);
        assert!(!create.args_schema().field("ticket_status").unwrap().required);
    }

    #[tokio::test]
    async fn invoke_forwards_valid_params() {
        let (ts, session) = toolset_with(MockSession::new());
        let tool = create_ticket(&ts).await;
        let result = tool.ainvoke(valid_params()).await.unwrap();
        assert_eq!(result["ticket_id"], "T-001");
        assert_eq!(session.calls(), vec![("create_ticket".to_string(), valid_params())]);
    }

    #[tokio::test]
    async fn invalid_params_never_reach_server() {
        let (ts, session) = toolset_with(MockSession::new());
        let tool = create_ticket(&ts).await;
        let err = tool
            .ainvoke(json!({"ticket_name": "Test"}))
            .await
            .unwrap_err();
        match err {
            UnizoError::InvalidParameters { tool, message } => {
                assert_eq!(tool, "create_ticket");
                assert!(message.contains("integration_id: field required"));
            }
            other => panic!("expected invalid parameters, got {other:?}"),
        }
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn properties_string_is_unwrapped() {
        let (ts, session) = toolset_with(MockSession::new());
        let tool = create_ticket(&ts).await;
        let wrapped = json!({ "properties": valid_params().to_string() });
        tool.ainvoke(wrapped).await.unwrap();
        assert_eq!(session.calls()[0].1, valid_params());
    }

    #[tokio::test]
    async fn properties_object_is_unwrapped() {
        let (ts, session) = toolset_with(MockSession::new());
        let tool = create_ticket(&ts).await;
        tool.ainvoke(json!({ "properties": valid_params() })).await.unwrap();
        assert_eq!(session.calls()[0].1, valid_params());
    }

    #[tokio::test]
    async fn broken_properties_json_rejected() {
        let (ts, _) = toolset_with(MockSession::new());
        let tool = create_ticket(&ts).await;
        let err = tool
            .ainvoke(json!({ "properties": "{not json" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid JSON in properties"));
    }

    #[tokio::test]
    async fn registry_dispatches_to_tools() {
        let (ts, _) = toolset_with(MockSession::new());
        let registry = ts.registry(None).await.unwrap();
        assert_eq!(registry.len(), 4);
        let schema = registry.schema("list_tickets").unwrap();
        assert_eq!(schema["input_schema"]["required"][0], "collection_id");

        let out = registry
            .execute("list_tickets", &json!({"collection_id": "c1"}))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["status"], "ok");

        let err = registry.execute("list_tickets", &json!({})).await.unwrap_err();
        assert!(err.contains("collection_id: field required"));
    }
}
