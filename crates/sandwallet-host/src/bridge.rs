//! Host end of the bridge transport.
//!
//! Outbound: every action becomes a numbered dispatch statement. Inbound:
//! envelopes are decoded and their sequence numbers checked for gaps.
//! Console envelopes are replayed into the host log.

use crate::assets::SandboxAssets;
use crate::error::BridgeError;
use sandwallet_sandbox::{spawn_sandbox, ChainSdk, SandboxOptions};
use sandwallet_types::{
    Action, ConsoleLevel, ConsoleMessage, SandboxMessage, SequenceTracker, Statement,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct HostBridge {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
    next_seq: u64,
    inbound_seq: SequenceTracker,
    sandbox_task: JoinHandle<()>,
}

impl HostBridge {
    /// Load the sandbox assets and boot the sandbox from its script.
    pub async fn boot(
        assets_dir: &Path,
        sdk: Arc<dyn ChainSdk>,
        options: SandboxOptions,
    ) -> Result<Self, BridgeError> {
        let assets = SandboxAssets::load(assets_dir).await?;
        let sandbox = spawn_sandbox(&assets.script, sdk, options)?;
        info!(session_id = %sandbox.dispatcher.session_id(), "Bridge ready");
        Ok(Self {
            outbound: sandbox.statements,
            inbound: sandbox.envelopes,
            next_seq: 0,
            inbound_seq: SequenceTracker::default(),
            sandbox_task: sandbox.task,
        })
    }

    /// Post `action` to the sandbox; returns the statement's sequence number.
    pub fn send(&mut self, action: &Action) -> Result<u64, BridgeError> {
        let seq = self.next_seq + 1;
        let statement = Statement::new(action.clone(), seq).render()?;
        self.outbound.send(statement).map_err(|_| BridgeError::Closed)?;
        self.next_seq = seq;
        debug!(action = %action.type_name(), seq, "Statement sent");
        Ok(seq)
    }

    /// Next decodable message. `None` once the sandbox has gone away.
    pub async fn recv(&mut self) -> Option<SandboxMessage> {
        loop {
            let raw = self.inbound.recv().await?;
            if let Some(message) = self.decode(&raw) {
                return Some(message);
            }
        }
    }

    fn decode(&mut self, raw: &str) -> Option<SandboxMessage> {
        match SandboxMessage::from_json(raw) {
            Ok(message) => {
                if let SandboxMessage::Action(envelope) = &message {
                    if let Some(missed) = envelope.seq.and_then(|seq| self.inbound_seq.observe(seq)) {
                        warn!(missed, seq = ?envelope.seq, "Sandbox messages dropped");
                    }
                }
                Some(message)
            }
            Err(e) => {
                warn!(error = %e, "Undecodable sandbox envelope ignored");
                None
            }
        }
    }
}

impl Drop for HostBridge {
    fn drop(&mut self) {
        self.sandbox_task.abort();
    }
}

/// Replay relayed sandbox console output into the host log.
pub fn replay_console(message: &ConsoleMessage) {
    for (level, args) in message.entries() {
        let text = render_args(args);
        match level {
            ConsoleLevel::Group => info!(target: "sandbox", "▶ {text}"),
            ConsoleLevel::Log => info!(target: "sandbox", "{text}"),
            ConsoleLevel::Error => error!(target: "sandbox", "{text}"),
            ConsoleLevel::GroupEnd => debug!(target: "sandbox", "◀ {text}"),
        }
    }
}

fn render_args(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
