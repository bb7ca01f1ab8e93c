use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum UnizoError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("not connected to the MCP server")]
    NotConnected,
    #[error("failed to fetch tools: {0}")]
    ToolDiscovery(#[source] Box<UnizoError>),
    #[error("failed to execute action {action}: {source}")]
    ToolExecution {
        action: String,
        #[source]
        source: Box<UnizoError>,
    },
    #[error("invalid parameters for {tool}: {message}")]
    InvalidParameters { tool: String, message: String },
    #[error("tool {tool} reported an error: {message}")]
    ToolError { tool: String, message: String },
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}
