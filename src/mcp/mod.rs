pub mod protocol;
pub mod session;
pub mod sse;

pub use protocol::{CallToolResult, Content, InitializeResult, McpTool};
pub use session::{McpSession, SseSession};
pub use sse::{SseDecoder, SseEvent};
