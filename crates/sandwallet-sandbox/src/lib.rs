//! Sandboxed side of the sandwallet bridge.
//!
//! Owns the chain session (connection and keypair handles) and answers the
//! host's request actions with `_SUCCESS`/`_ERROR` actions. Nothing but
//! action and console envelopes leaves this crate's runtime.

pub mod dispatcher;
pub mod error;
pub mod keys;
pub mod mock;
pub mod outbox;
pub mod records;
pub mod rpc;
pub mod runtime;
pub mod sdk;

pub use dispatcher::{SandboxDispatcher, SandboxOptions};
pub use error::{SandboxError, SdkError};
pub use mock::MockChain;
pub use rpc::RpcChain;
pub use runtime::{spawn_sandbox, SandboxHandle};
pub use sdk::{ChainConnection, ChainSdk};
