pub mod actions;
pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod inference;
pub mod mcp;
pub mod models;
pub mod schema;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{Action, UnknownAction};
pub use adapters::{
    openai_tool, CrewTool, StructuredTool, UnizoCrewAIToolSet, UnizoLangChainToolSet,
    UnizoOpenAIToolSet,
};
pub use client::UnizoToolSet;
pub use config::{ToolSetConfig, DEFAULT_SERVER_URL};
pub use error::{InferenceError, UnizoError};
pub use inference::{ChatProvider, OpenAiProvider};
pub use mcp::{McpSession, SseSession};
pub use models::{Collection, Integration, Organization, Service, TicketData, TicketSummary};
pub use schema::{ArgsSchema, FieldType, ToolSchema};
pub use tools::{ToolHandler, ToolRegistry};
pub use types::{ChatRequest, ChatResponse, ToolCall, Usage};
