//! Global tracing subscriber for the `sandwallet` binary.

use tracing::subscriber::{self, SetGlobalDefaultError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Directives used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVES: &str = "info,sandwallet=debug";

/// Install the process-wide subscriber. Fails if one is already installed.
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(false));
    subscriber::set_global_default(subscriber)
}
