use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::actions::Action;
use crate::client::UnizoToolSet;
use crate::error::UnizoError;
use crate::inference::{ChatProvider, OpenAiProvider};
use crate::schema::ToolSchema;
use crate::types::{ChatRequest, ToolCall};

pub const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 1000;

/// Function-calling definition for one tool.
pub fn openai_tool(tool: &ToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters.to_value(),
        }
    })
}

/// Unizo tools in OpenAI function-calling form, plus a single-round chat driver.
pub struct UnizoOpenAIToolSet {
    toolset: Arc<UnizoToolSet>,
    provider: Box<dyn ChatProvider>,
}

impl UnizoOpenAIToolSet {
    pub fn new(api_key: impl Into<String>, openai_api_key: impl Into<String>) -> Result<Self, UnizoError> {
        let toolset = Arc::new(UnizoToolSet::new(api_key)?);
        Ok(Self::with_provider(toolset, OpenAiProvider::new(openai_api_key)))
    }

    pub fn with_provider(toolset: Arc<UnizoToolSet>, provider: impl ChatProvider + 'static) -> Self {
        Self {
            toolset,
            provider: Box::new(provider),
        }
    }

    pub fn toolset(&self) -> &Arc<UnizoToolSet> {
        &self.toolset
    }

    pub async fn get_tools(&self, actions: Option<&[Action]>) -> Result<Vec<Value>, UnizoError> {
        let tools: Vec<Value> = self
            .toolset
            .get_tools(actions)
            .await?
            .iter()
            .map(openai_tool)
            .collect();
        info!(count = tools.len(), "converted tools for OpenAI");
        Ok(tools)
    }

    /// Answer `query` with one round of tool use: a completion, every
    /// requested tool call, then one follow-up completion. Returns the
    /// collected text and the updated message history.
    pub async fn process_query(
        &self,
        query: &str,
        previous_messages: &[Value],
        model: &str,
    ) -> Result<(String, Vec<Value>), UnizoError> {
        let mut messages = previous_messages.to_vec();
        messages.push(json!({ "role": "user", "content": query }));
        let tools = self.get_tools(None).await?;

        let response = self
            .provider
            .complete(build_request(model, &messages, &tools))
            .await
            .map_err(|e| {
                error!(error = %e, "OpenAI API error");
                UnizoError::from(e)
            })?;

        let mut final_text = Vec::new();
        if let Some(ref text) = response.content {
            final_text.push(text.clone());
        }

        if response.tool_calls.is_empty() {
            if let Some(text) = response.content {
                messages.push(json!({ "role": "assistant", "content": text }));
            }
            return Ok((final_text.join("\n"), messages));
        }

        let calls: Vec<Value> = response
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect();
        messages.push(json!({
            "role": "assistant",
            "content": response.content,
            "tool_calls": calls,
        }));

        for call in &response.tool_calls {
            let output = match self.run_tool_call(call).await {
                Ok(result) => {
                    final_text.push(format!("[Tool {} result: {}]", call.name, result));
                    result
                }
                Err(e) => {
                    error!(tool = %call.name, error = %e, "tool call error");
                    final_text.push(format!("[Error calling tool {}: {}]", call.name, e));
                    json!({ "error": e.to_string() })
                }
            };
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "content": output.to_string(),
            }));
        }

        match self
            .provider
            .complete(build_request(model, &messages, &tools))
            .await
        {
            Ok(next) => {
                if let Some(text) = next.content {
                    final_text.push(text.clone());
                    messages.push(json!({ "role": "assistant", "content": text }));
                }
            }
            Err(e) => {
                error!(error = %e, "OpenAI follow-up API error");
                final_text.push(format!("[Error in follow-up response: {e}]"));
            }
        }

        Ok((final_text.join("\n"), messages))
    }

    async fn run_tool_call(&self, call: &ToolCall) -> Result<Value, UnizoError> {
        let args: Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments)?
        };
        self.toolset.execute_tool(&call.name, args).await
    }
}

fn build_request(model: &str, messages: &[Value], tools: &[Value]) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        max_tokens: MAX_TOKENS,
        messages: messages.to_vec(),
        tools: tools.to_vec(),
        tool_choice: Some("auto".into()),
    }
}
