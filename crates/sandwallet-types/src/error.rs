//! Error payloads carried by `_ERROR` actions and recorded in state.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failure, used for display and for the corrupted-key
/// decision flow. Never required on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Connection or authentication not established
    Precondition,
    /// Failure surfaced verbatim by the chain SDK
    Sdk,
    /// Persisted secret key bytes did not reconstruct a keypair
    Corruption,
    /// A message could not be decoded at the bridge
    Transport,
}

/// Payload of every `_ERROR` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Error recorded inside an async-state slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl StateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    pub fn is_corruption(&self) -> bool {
        self.kind == Some(ErrorKind::Corruption)
    }
}

impl From<&ErrorPayload> for StateError {
    fn from(payload: &ErrorPayload) -> Self {
        Self {
            message: payload.message.clone(),
            kind: payload.kind,
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StateError {}

/// Errors raised while decoding bridge traffic.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid JSON on the bridge: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload for {action}: {message}")]
    InvalidPayload { action: String, message: String },

    #[error("Missing payload for {action}")]
    MissingPayload { action: String },

    #[error("Envelope carries neither an action nor console output")]
    EmptyEnvelope,

    #[error("Statement does not invoke the sandbox entry point: {0}")]
    NotADispatchStatement(String),

    #[error("Statement passes {0} arguments, expected 1 or 2")]
    BadArity(usize),
}
