use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{
    methods, CallToolResult, ClientInfo, InitializeResult, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool, RequestId, PROTOCOL_VERSION,
};
use super::sse::{SseDecoder, SseEvent};
use crate::config::ToolSetConfig;
use crate::error::UnizoError;

/// An initialized conversation with an MCP server. The toolset only talks to
/// the server through this trait, so tests and custom transports can stand in
/// for the network.
#[async_trait]
pub trait McpSession: Send + Sync {
    async fn initialize(&self) -> Result<InitializeResult, UnizoError>;
    async fn list_tools(&self) -> Result<Vec<McpTool>, UnizoError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, UnizoError>;
    async fn close(&self) -> Result<(), UnizoError> {
        Ok(())
    }
}

type Reply = Result<JsonRpcResponse, UnizoError>;
type Pending = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Reply>>>>;

/// MCP over HTTP+SSE: one long-lived GET stream carries server messages,
/// requests are POSTed to the endpoint the stream announces.
pub struct SseSession {
    client: reqwest::Client,
    endpoint: Url,
    pending: Pending,
    next_id: AtomicU64,
    request_timeout: Duration,
    shutdown: CancellationToken,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SseSession {
    /// Open the event stream and wait for the server to announce its POST endpoint.
    pub async fn connect(config: &ToolSetConfig) -> Result<Self, UnizoError> {
        let base = Url::parse(&config.server_url).map_err(|e| {
            UnizoError::InvalidConfig(format!("invalid server url {}: {e}", config.server_url))
        })?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            UnizoError::InvalidConfig("API key is not a valid header value".into())
        })?;
        headers.insert(HeaderName::from_static("apikey"), key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| UnizoError::Transport(format!("failed to build HTTP client: {e}")))?;

        debug!(url = %base, "connecting to SSE MCP server");
        let connect_timeout = UnizoError::Timeout {
            after: config.connect_timeout,
        };
        let response = tokio::time::timeout(
            config.connect_timeout,
            client
                .get(base.clone())
                .header(ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| connect_timeout)?
        .map_err(|e| UnizoError::Transport(format!("failed to open event stream: {e}")))?;
        let response = ensure_success(response, "GET", &base).await?;

        let pending: Pending = Arc::default();
        let shutdown = CancellationToken::new();
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_events(
            response,
            base.clone(),
            Arc::clone(&pending),
            endpoint_tx,
            shutdown.clone(),
        ));

        let endpoint = match tokio::time::timeout(config.connect_timeout, endpoint_rx).await {
            Ok(Ok(Ok(url))) => url,
            Ok(Ok(Err(e))) => {
                shutdown.cancel();
                return Err(e);
            }
            Ok(Err(_)) => {
                shutdown.cancel();
                return Err(UnizoError::Transport(
                    "event stream closed before the endpoint was announced".into(),
                ));
            }
            Err(_) => {
                shutdown.cancel();
                return Err(UnizoError::Timeout {
                    after: config.connect_timeout,
                });
            }
        };
        debug!(endpoint = %endpoint, "received message endpoint");

        Ok(Self {
            client,
            endpoint,
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
            shutdown,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// The URL requests are POSTed to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Reply>>> {
        lock(&self.pending)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, UnizoError> {
        let request = JsonRpcRequest::new(self.next_id.fetch_add(1, Ordering::SeqCst), method, params);
        let id = request.id.clone();
        let (tx, rx) = oneshot::channel();
        register_waiter(&self.pending, &self.shutdown, id.clone(), tx)?;

        debug!(%id, method, "sending MCP request");
        if let Err(e) = self.post(&request).await {
            self.pending().remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply?,
            Ok(Err(_)) => {
                return Err(UnizoError::Transport(
                    "session closed while awaiting a response".into(),
                ))
            }
            Err(_) => {
                self.pending().remove(&id);
                warn!(%id, method, "MCP request timed out");
                return Err(UnizoError::Timeout {
                    after: self.request_timeout,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(UnizoError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<(), UnizoError> {
        self.post(&JsonRpcNotification::new(method)).await
    }

    async fn post(&self, body: &impl Serialize) -> Result<(), UnizoError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| UnizoError::Transport(format!("failed to send message: {e}")))?;
        ensure_success(response, "POST", &self.endpoint).await?;
        Ok(())
    }
}

#[async_trait]
impl McpSession for SseSession {
    async fn initialize(&self) -> Result<InitializeResult, UnizoError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": ClientInfo::default(),
        });
        let raw = self.request(methods::INITIALIZE, Some(params)).await?;
        let result: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| UnizoError::Protocol(format!("malformed initialize result: {e}")))?;
        self.notify(methods::INITIALIZED).await?;

        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = %result.protocol_version,
            "MCP session initialized"
        );
        Ok(result)
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, UnizoError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let raw = self.request(methods::TOOLS_LIST, params).await?;
            let page: ListToolsResult = serde_json::from_value(raw)
                .map_err(|e| UnizoError::Protocol(format!("malformed tools/list result: {e}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, UnizoError> {
        let params = json!({ "name": name, "arguments": arguments });
        let raw = self.request(methods::TOOLS_CALL, Some(params)).await?;
        serde_json::from_value(raw)
            .map_err(|e| UnizoError::Protocol(format!("malformed tools/call result: {e}")))
    }

    async fn close(&self) -> Result<(), UnizoError> {
        self.shutdown.cancel();
        let reader = lock(&self.reader).take();
        if let Some(handle) = reader {
            let _ = handle.await;
        }
        debug!("SSE session closed");
        Ok(())
    }
}

impl Drop for SseSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn ensure_success(
    response: reqwest::Response,
    verb: &str,
    url: &Url,
) -> Result<reqwest::Response, UnizoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(UnizoError::Authentication(format!("{verb} {url} returned {status}: {body}")));
    }
    Err(UnizoError::Transport(format!("{verb} {url} returned {status}: {body}")))
}

/// Background reader: decodes the event stream, announces the endpoint once,
/// and routes responses to their waiters. When the stream stops every
/// waiter is failed.
async fn read_events(
    response: reqwest::Response,
    base: Url,
    pending: Pending,
    endpoint_tx: oneshot::Sender<Result<Url, UnizoError>>,
    shutdown: CancellationToken,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    let reason = loop {
        let chunk = tokio::select! {
            _ = shutdown.cancelled() => break "session closed".to_string(),
            chunk = stream.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => {
                for event in decoder.feed(&bytes) {
                    handle_event(event, &base, &pending, &mut endpoint_tx);
                }
            }
            Some(Err(e)) => break format!("event stream error: {e}"),
            None => break "event stream ended".to_string(),
        }
    };
    debug!(reason = %reason, "SSE reader stopped");

    if let Some(tx) = endpoint_tx.take() {
        let _ = tx.send(Err(UnizoError::Transport(reason.clone())));
    }
    fail_pending(&pending, &shutdown, &reason);
}

/// Add a waiter unless the reader has stopped. The cancellation check and
/// the insert happen under the same lock `fail_pending` drains with.
fn register_waiter(
    pending: &Pending,
    shutdown: &CancellationToken,
    id: RequestId,
    tx: oneshot::Sender<Reply>,
) -> Result<(), UnizoError> {
    let mut waiters = lock(pending);
    if shutdown.is_cancelled() {
        return Err(UnizoError::NotConnected);
    }
    waiters.insert(id, tx);
    Ok(())
}

/// Mark the session stopped and fail every registered waiter with `Transport`.
fn fail_pending(pending: &Pending, shutdown: &CancellationToken, reason: &str) {
    let drained: Vec<_> = {
        let mut waiters = lock(pending);
        shutdown.cancel();
        waiters.drain().collect()
    };
    for (id, waiter) in drained {
        debug!(%id, "failing pending request");
        let _ = waiter.send(Err(UnizoError::Transport(reason.to_string())));
    }
}

fn handle_event(
    event: SseEvent,
    base: &Url,
    pending: &Pending,
    endpoint_tx: &mut Option<oneshot::Sender<Result<Url, UnizoError>>>,
) {
    match event.event.as_str() {
        "endpoint" => {
            let Some(tx) = endpoint_tx.take() else {
                debug!(data = %event.data, "ignoring repeated endpoint event");
                return;
            };
            let endpoint = base.join(event.data.trim()).map_err(|e| {
                UnizoError::Protocol(format!("invalid endpoint {:?}: {e}", event.data))
            });
            let _ = tx.send(endpoint);
        }
        "message" => match serde_json::from_str::<JsonRpcMessage>(&event.data) {
            Ok(JsonRpcMessage::Response(response)) => {
                let waiter = lock(pending).remove(&response.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(Ok(response));
                    }
                    None => warn!(id = %response.id, "response for unknown request"),
                }
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                debug!(method = %notification.method, "server notification");
            }
            Ok(JsonRpcMessage::Request(request)) => {
                warn!(method = %request.method, "ignoring server-initiated request");
            }
            Err(e) => warn!(error = %e, data = %event.data, "unparseable SSE message"),
        },
        other => debug!(event = other, "ignoring SSE event"),
    }
}
