//! Sandbox-to-host posting: numbered action envelopes and console relay.

use sandwallet_types::{Action, ActionEnvelope, ConsoleMessage, SandboxMessage};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
    seq: Arc<AtomicU64>,
}

impl Outbox {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Post an action answering the host request numbered `epoch`.
    pub fn post_action(&self, action: Action, epoch: Option<u64>) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.post(SandboxMessage::Action(ActionEnvelope {
            action,
            seq: Some(seq),
            epoch,
        }));
    }

    pub fn console(&self, message: ConsoleMessage) {
        self.post(SandboxMessage::Console(message));
    }

    pub fn log(&self, text: impl Into<String>) {
        self.console(ConsoleMessage::log(vec![Value::String(text.into())]));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.console(ConsoleMessage::error(vec![Value::String(text.into())]));
    }

    fn post(&self, message: SandboxMessage) {
        match message.to_json() {
            Ok(json) => {
                if self.tx.send(json).is_err() {
                    warn!("Host endpoint closed, envelope dropped");
                }
            }
            Err(e) => error!(error = %e, "Failed to encode envelope"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_envelopes_are_numbered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outbox = Outbox::new(tx);
        outbox.post_action(Action::ConnectSuccess, Some(1));
        outbox.log("between");
        outbox.post_action(Action::TokenList, None);

        let first = SandboxMessage::from_json(&rx.try_recv().unwrap()).unwrap();
        let console = SandboxMessage::from_json(&rx.try_recv().unwrap()).unwrap();
        let second = SandboxMessage::from_json(&rx.try_recv().unwrap()).unwrap();
        assert!(matches!(first, SandboxMessage::Action(ActionEnvelope { seq: Some(1), epoch: Some(1), .. })));
        assert!(matches!(console, SandboxMessage::Console(_)));
        assert!(matches!(second, SandboxMessage::Action(ActionEnvelope { seq: Some(2), epoch: None, .. })));
    }
}
