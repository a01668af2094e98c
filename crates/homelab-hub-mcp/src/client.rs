//! Backend client for the homelab-hub inventory API.
//!
//! The dispatcher talks to [`InventoryBackend`] instead of reqwest directly,
//! which keeps every tool testable against an in-memory mock.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::HomelabConfig;
use crate::error::BackendError;

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One call against the backend API. `path` is relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    /// Query pairs, URL-encoded by the HTTP client.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self::new(Method::Post, path, body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, None)
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

/// Abstraction over the inventory backend.
///
/// Implementations must be shareable across concurrently running tool calls.
pub trait InventoryBackend: Send + Sync + 'static {
    fn send(
        &self,
        request: BackendRequest,
    ) -> impl Future<Output = BackendResult<Value>> + Send;
}

// ── HttpBackend: real implementation backed by reqwest ───────────

/// reqwest client bound to one backend URL and optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &HomelabConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::new(None, format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.url().to_string(),
            token: config.token().map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl InventoryBackend for HttpBackend {
    async fn send(&self, request: BackendRequest) -> BackendResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        log::debug!("{:?} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(BackendError::transport)?;
        let status = response.status();
        let text = response.text().await.map_err(BackendError::transport)?;
        parse_response(status, &text)
    }
}

/// Turn a status and raw body into the parsed payload or a [`BackendError`].
///
/// On failure the body's `error` field is preferred over the reason phrase.
/// An empty success body parses as `null`.
pub fn parse_response(status: StatusCode, body: &str) -> BackendResult<Value> {
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string))
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });
        return Err(BackendError::new(Some(status.as_u16()), message));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        BackendError::new(Some(status.as_u16()), format!("Invalid JSON response: {}", e))
    })
}

// ── MockBackend for testing ──────────────────────────────────────
