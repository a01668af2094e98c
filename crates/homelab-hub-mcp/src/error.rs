//! Error types for tool calls.
//!
//! `ValidationError` never reaches the network, `BackendError` is the single
//! normalized shape of every failed backend call, and `ToolError` is what the
//! dispatcher hands back to the MCP layer.

use std::fmt;

use thiserror::Error;

/// Argument or tool-name problems detected before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument '{param}' for {tool}")]
    MissingArgument {
        tool: &'static str,
        param: &'static str,
    },

    #[error("Argument '{param}' for {tool} must be of type {expected}")]
    InvalidType {
        tool: &'static str,
        param: &'static str,
        expected: &'static str,
    },

    #[error("Argument '{param}' for {tool} must be one of: {allowed}")]
    NotAllowed {
        tool: &'static str,
        param: &'static str,
        allowed: String,
    },
}

/// A failed backend call: non-success status, unparsable body, or a request
/// that never got a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}", status_prefix(.status_code), .message)]
pub struct BackendError {
    /// HTTP status, `None` when the request failed before a response arrived.
    pub status_code: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// Error for a request that produced no HTTP response at all.
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(None, format!("Request failed: {}", err))
    }
}

fn status_prefix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!("HTTP {}: ", code))
        .unwrap_or_default()
}

/// Everything a tool call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend failure surfaced to the tool caller.
    #[error(transparent)]
    Execution(#[from] BackendError),
}

impl ToolError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::Validation(_))
    }
}
