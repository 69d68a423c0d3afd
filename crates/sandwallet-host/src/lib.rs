//! Host side of the sandwallet bridge.
//!
//! The host owns the authoritative state tree, boots the sandbox from its
//! static assets, forwards dispatched actions as statements, folds the
//! sandbox's results back in and drives the connect -> authenticate -> list
//! workflow through auto-dispatch rules.

pub mod assets;
pub mod bridge;
pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod logging;
pub mod store;

pub use config::HostConfig;
pub use error::{BridgeError, HostError, StoreError};
pub use host::{Decision, WalletHost, WalletUi};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
