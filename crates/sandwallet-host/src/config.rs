//! Environment variable configuration for the sandwallet host
//!
//! Every value has a default; invalid values fall back to the default.
//! A `.env` file is honoured when the binary loads it through `dotenvy`.

use crate::error::{HostError, Result};
use sandwallet_constants::{DEFAULT_CLUSTER, DEFAULT_CONFIRM_ATTEMPTS, DEFAULT_CONFIRM_INTERVAL_MS};
use sandwallet_types::Cluster;
use std::path::PathBuf;
use std::time::Duration;

/// Network configuration from environment variables
pub mod network {
    use super::*;
    use std::env;

    /// Cluster id the workflow connects to
    pub fn cluster() -> String {
        env::var("SANDWALLET_CLUSTER").unwrap_or_else(|_| DEFAULT_CLUSTER.to_string())
    }

    /// Number of confirmation polls after an airdrop
    pub fn confirm_attempts() -> u32 {
        env::var("SANDWALLET_CONFIRM_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONFIRM_ATTEMPTS)
    }

    /// Delay between confirmation polls in milliseconds
    pub fn confirm_interval_ms() -> u64 {
        env::var("SANDWALLET_CONFIRM_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONFIRM_INTERVAL_MS)
    }
}

/// Filesystem locations from environment variables
pub mod paths {
    use super::*;
    use std::env;

    /// JSON file backing the key-value store
    pub fn store_path() -> PathBuf {
        env::var("SANDWALLET_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".sandwallet/store.json"))
    }

    /// Directory holding `sandbox.html` and `sandbox.js`
    pub fn assets_dir() -> PathBuf {
        env::var("SANDWALLET_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/sandbox")))
    }
}

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub cluster: String,
    pub store_path: PathBuf,
    pub assets_dir: PathBuf,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self {
            cluster: network::cluster(),
            store_path: paths::store_path(),
            assets_dir: paths::assets_dir(),
            confirm_attempts: network::confirm_attempts(),
            confirm_interval: Duration::from_millis(network::confirm_interval_ms()),
        }
    }

    /// Reject a cluster id no connection could ever be opened for.
    pub fn validate(&self) -> Result<Cluster> {
        self.cluster
            .parse()
            .map_err(|e| HostError::configuration(format!("SANDWALLET_CLUSTER: {e}")))
    }
}
