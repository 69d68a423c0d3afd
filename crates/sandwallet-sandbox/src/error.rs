//! Error types for the sandbox side of the bridge.
//!
//! [`SdkError`] covers failures reported by the wrapped chain SDK,
//! [`SandboxError`] everything a handler can fail with. A handler error never
//! crosses the bridge as-is; it is logged and converted into the `_ERROR`
//! payload of the action being handled.

use sandwallet_types::{ErrorKind, ErrorPayload, WireError};
use std::error::Error as StdError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SandboxError>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Failures surfaced by the chain SDK.
#[derive(Error, Debug)]
pub enum SdkError {
    /// Cluster id did not resolve to an endpoint
    #[error("Invalid cluster: {cluster}")]
    InvalidCluster { cluster: String },

    /// RPC request failed or the endpoint is unreachable
    #[error("RPC request failed: {message}")]
    Rpc {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Program rejected an instruction or instruction could not be built
    #[error("Program error: {message}")]
    Program {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Account not found: {address}")]
    AccountNotFound { address: String },

    /// Account exists but does not hold the expected layout
    #[error("Invalid account data for {address}: {message}")]
    InvalidAccountData { address: String, message: String },

    #[error("Airdrop not available on {cluster}")]
    AirdropUnavailable { cluster: String },

    #[error("Transaction {signature} not confirmed after {attempts} attempts")]
    ConfirmationTimeout { signature: String, attempts: u32 },
}

impl SdkError {
    pub fn invalid_cluster<S: Into<String>>(cluster: S) -> Self {
        Self::InvalidCluster {
            cluster: cluster.into(),
        }
    }

    pub fn rpc<S: Into<String>>(message: S) -> Self {
        Self::Rpc {
            message: message.into(),
            source: None,
        }
    }

    pub fn rpc_with_source<S: Into<String>, E: Into<BoxError>>(message: S, source: E) -> Self {
        Self::Rpc {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn program<S: Into<String>>(message: S) -> Self {
        Self::Program {
            message: message.into(),
            source: None,
        }
    }

    pub fn program_with_source<S: Into<String>, E: Into<BoxError>>(message: S, source: E) -> Self {
        Self::Program {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn account_not_found<S: Into<String>>(address: S) -> Self {
        Self::AccountNotFound {
            address: address.into(),
        }
    }

    pub fn invalid_account_data<A: Into<String>, M: Into<String>>(address: A, message: M) -> Self {
        Self::InvalidAccountData {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn airdrop_unavailable<S: Into<String>>(cluster: S) -> Self {
        Self::AirdropUnavailable {
            cluster: cluster.into(),
        }
    }

    pub fn confirmation_timeout<S: Into<String>>(signature: S, attempts: u32) -> Self {
        Self::ConfirmationTimeout {
            signature: signature.into(),
            attempts,
        }
    }
}

/// Failures of a sandbox handler or of the sandbox runtime.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// A session handle the operation needs is missing
    #[error("{message}")]
    Precondition { message: String },

    /// Persisted key material did not reconstruct a usable keypair
    #[error("Stored secret key is corrupted: {message}")]
    Corruption { message: String },

    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("Bridge message rejected: {0}")]
    Wire(#[from] WireError),

    /// The script asset does not declare the dispatch entry point
    #[error("Sandbox script does not declare {entry}")]
    MissingEntryPoint { entry: String },
}

impl SandboxError {
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn not_connected() -> Self {
        Self::precondition("Connection not established")
    }

    pub fn not_authenticated() -> Self {
        Self::precondition("Authentication required")
    }

    pub fn corruption<S: Into<String>>(message: S) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    pub fn missing_entry_point<S: Into<String>>(entry: S) -> Self {
        Self::MissingEntryPoint {
            entry: entry.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::Precondition { .. } => ErrorKind::Precondition,
            SandboxError::Corruption { .. } => ErrorKind::Corruption,
            SandboxError::Sdk(_) => ErrorKind::Sdk,
            SandboxError::Wire(_) | SandboxError::MissingEntryPoint { .. } => ErrorKind::Transport,
        }
    }

    /// The `_ERROR` payload for this failure. The source chain, if any, goes
    /// into `stack`.
    pub fn to_payload(&self) -> ErrorPayload {
        let payload = ErrorPayload::new(self.to_string()).with_kind(self.kind());
        let mut chain = Vec::new();
        let mut source = self.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        if chain.is_empty() {
            payload
        } else {
            payload.with_stack(chain.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_messages() {
        assert_eq!(
            SandboxError::not_connected().to_payload(),
            ErrorPayload::new("Connection not established").with_kind(ErrorKind::Precondition)
        );
        assert_eq!(
            SandboxError::not_authenticated().to_string(),
            "Authentication required"
        );
    }

    #[test]
    fn test_sdk_error_is_transparent() {
        let err: SandboxError = SdkError::invalid_cluster("moonnet").into();
        let payload = err.to_payload();
        assert_eq!(payload.message, "Invalid cluster: moonnet");
        assert_eq!(payload.kind, Some(ErrorKind::Sdk));
        assert!(payload.stack.is_none());
    }

    #[test]
    fn test_source_chain_goes_to_stack() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = SandboxError::from(SdkError::rpc_with_source("getVersion failed", io));
        let payload = err.to_payload();
        assert_eq!(payload.message, "RPC request failed: getVersion failed");
        assert_eq!(payload.stack.as_deref(), Some("caused by: refused"));
    }

    #[test]
    fn test_rejected_statement_is_transport() {
        let err = SandboxError::from(WireError::BadArity(3));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().starts_with("Bridge message rejected"));
    }
}
