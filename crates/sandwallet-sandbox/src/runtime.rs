//! Sandbox endpoint of the bridge.
//!
//! The sandbox shares nothing with the host but two string channels:
//! dispatch statements flow in, JSON envelopes flow out.

use crate::dispatcher::{SandboxDispatcher, SandboxOptions};
use crate::error::{Result, SandboxError};
use crate::outbox::Outbox;
use crate::sdk::ChainSdk;
use sandwallet_constants::SANDBOX_ENTRY;
use sandwallet_types::{SequenceTracker, Statement};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running sandbox.
pub struct SandboxHandle {
    /// Host-to-sandbox dispatch statements
    pub statements: mpsc::UnboundedSender<String>,
    /// Sandbox-to-host envelopes
    pub envelopes: mpsc::UnboundedReceiver<String>,
    pub dispatcher: Arc<SandboxDispatcher>,
    pub task: JoinHandle<()>,
}

/// Boot a sandbox from its script asset.
///
/// The script must declare the dispatch entry point the host's statements
/// invoke; anything else is rejected before a session is created.
pub fn spawn_sandbox(
    script: &str,
    sdk: Arc<dyn ChainSdk>,
    options: SandboxOptions,
) -> Result<SandboxHandle> {
    if !script.contains(SANDBOX_ENTRY) {
        return Err(SandboxError::missing_entry_point(SANDBOX_ENTRY));
    }

    let (statement_tx, mut statement_rx) = mpsc::unbounded_channel::<String>();
    let (envelope_tx, envelope_rx) = mpsc::unbounded_channel::<String>();
    let outbox = Outbox::new(envelope_tx);
    let dispatcher = SandboxDispatcher::new(sdk, outbox.clone(), &options);
    info!(session_id = %dispatcher.session_id(), "Sandbox started");

    let task = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let mut inbound = SequenceTracker::default();
            while let Some(source) = statement_rx.recv().await {
                let statement = match Statement::parse(&source) {
                    Ok(statement) => statement,
                    Err(e) => {
                        let e = SandboxError::from(e);
                        warn!(error = %e, kind = ?e.kind(), "Rejected host statement");
                        outbox.error(e.to_string());
                        continue;
                    }
                };
                let seq = statement.meta.map(|meta| meta.seq);
                if let Some(missed) = seq.and_then(|seq| inbound.observe(seq)) {
                    warn!(missed, ?seq, "Host statements dropped");
                }
                dispatcher.dispatch(statement.action, seq).await;
            }
            debug!(session_id = %dispatcher.session_id(), "Host endpoint closed, sandbox stopping");
        }
    });

    Ok(SandboxHandle {
        statements: statement_tx,
        envelopes: envelope_rx,
        dispatcher,
        task,
    })
}
