use std::time::Duration;

use crate::error::UnizoError;

pub const DEFAULT_SERVER_URL: &str = "http://api.unizo.ai/mcp/ticketing";

/// Connection settings for a toolset.
#[derive(Debug, Clone)]
pub struct ToolSetConfig {
    pub api_key: String,
    pub server_url: String,
    /// Upper bound for opening the stream and receiving the POST endpoint.
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ToolSetConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, UnizoError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            tracing::error!("UNIZO_API_KEY is not provided or empty");
            return Err(UnizoError::InvalidConfig("UNIZO_API_KEY is required".into()));
        }
        Ok(Self {
            api_key,
            server_url: DEFAULT_SERVER_URL.into(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
        })
    }

    /// Reads `UNIZO_API_KEY` and, if set, `UNIZO_SERVER_URL`.
    pub fn from_env() -> Result<Self, UnizoError> {
        let api_key = std::env::var("UNIZO_API_KEY").unwrap_or_default();
        let mut config = Self::new(api_key)?;
        if let Ok(url) = std::env::var("UNIZO_SERVER_URL") {
            if !url.trim().is_empty() {
                config.server_url = url;
            }
        }
        Ok(config)
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
