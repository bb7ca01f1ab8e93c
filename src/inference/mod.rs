pub mod openai;

use async_trait::async_trait;

use crate::error::InferenceError;
use crate::types::{ChatRequest, ChatResponse};

/// Pure chat completion call. No state, no history. Request in, response out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError>;
}

/// Blanket impl so `Box<dyn ChatProvider>` can be passed where a provider is expected.
#[async_trait]
impl ChatProvider for Box<dyn ChatProvider> {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        (**self).complete(request).await
    }
}

pub use openai::OpenAiProvider;
