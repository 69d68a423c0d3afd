//! Error types for the host side.

use sandwallet_sandbox::SandboxError;
use sandwallet_types::WireError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

/// Key-value persistence failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file is not valid JSON: {path}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization<P: Into<PathBuf>>(path: P, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the host end of the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A sandbox asset could not be loaded
    #[error("Sandbox asset unavailable: {path}")]
    AssetUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sandbox asset is empty: {path}")]
    AssetEmpty { path: PathBuf },

    #[error("Sandbox failed to start: {0}")]
    Boot(#[from] SandboxError),

    #[error("Bridge message rejected: {0}")]
    Wire(#[from] WireError),

    #[error("Sandbox endpoint closed")]
    Closed,
}

impl BridgeError {
    pub fn asset_unavailable<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::AssetUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn asset_empty<P: Into<PathBuf>>(path: P) -> Self {
        Self::AssetEmpty { path: path.into() }
    }
}

/// Errors surfaced to the embedding application.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The bridge never became ready, so nothing can be dispatched
    #[error("Bridge is not ready")]
    NotReady,

    #[error("No decision is pending")]
    NoPendingDecision,

    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    Timeout { seconds: u64, waiting_for: String },
}

impl HostError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(seconds: u64, waiting_for: S) -> Self {
        Self::Timeout {
            seconds,
            waiting_for: waiting_for.into(),
        }
    }
}
