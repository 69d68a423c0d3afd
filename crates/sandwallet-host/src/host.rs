//! The host: owner of the state tree and of the bridge to the sandbox.

use crate::bridge::{replay_console, HostBridge};
use crate::config::HostConfig;
use crate::error::{BridgeError, HostError, Result};
use crate::hooks::next_auto_dispatch;
use crate::store::{persist_account, KeyValueStore};
use sandwallet_core::{
    account_view, connection_view, pending_decision, reduce_with_epoch, token_info_view,
    token_list_view, workflow_phase, View, WorkflowPhase,
};
use sandwallet_sandbox::{ChainSdk, SandboxOptions};
use sandwallet_types::{
    AccountData, AccountRequest, Action, ActionEnvelope, ConnectionData, SandboxMessage, State,
    StateError, Token,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Answer to a corrupted persisted key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Discard the stored key and generate a new funded account
    Recreate,
    /// Leave the account slice failed
    Abort,
}

pub struct WalletHost {
    state: State,
    bridge: Option<HostBridge>,
    store: Arc<dyn KeyValueStore>,
    cluster: String,
}

impl WalletHost {
    /// Boot the bridge and kick off the workflow.
    ///
    /// A bridge that fails to boot leaves the host not ready: no views are
    /// exposed and nothing can be dispatched.
    pub async fn start(
        config: &HostConfig,
        sdk: Arc<dyn ChainSdk>,
        store: Arc<dyn KeyValueStore>,
        options: SandboxOptions,
    ) -> Self {
        let bridge = match HostBridge::boot(&config.assets_dir, sdk, options).await {
            Ok(bridge) => Some(bridge),
            Err(e) => {
                error!(error = %e, assets = %config.assets_dir.display(), "Bridge failed to boot");
                None
            }
        };
        let mut host = Self {
            state: State::default(),
            bridge,
            store,
            cluster: config.cluster.clone(),
        };
        if host.is_ready() {
            host.settle();
        }
        host
    }

    pub fn is_ready(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn phase(&self) -> WorkflowPhase {
        workflow_phase(&self.state)
    }

    /// Views for UI consumers; `None` until the bridge is ready.
    pub fn ui(&self) -> Option<WalletUi<'_>> {
        self.is_ready().then_some(WalletUi { state: &self.state })
    }

    /// Fold `action` locally and forward it to the sandbox.
    ///
    /// A request for a slice that is already loading is dropped and `None`
    /// returned; otherwise the statement's sequence number, which is also the
    /// epoch its result must carry.
    pub fn dispatch(&mut self, action: Action) -> Result<Option<u64>> {
        let seq = self.forward(action)?;
        self.settle();
        Ok(seq)
    }

    fn forward(&mut self, action: Action) -> Result<Option<u64>> {
        let bridge = self.bridge.as_mut().ok_or(HostError::NotReady)?;
        if let Some(kind) = action.kind().filter(|_| action.is_request()) {
            if self.state.is_loading(kind.slice()) {
                debug!(action = %kind, "Slice busy, dispatch dropped");
                return Ok(None);
            }
        }
        let seq = bridge.send(&action)?;
        self.state = reduce_with_epoch(&self.state, &action, Some(seq));
        Ok(Some(seq))
    }

    /// Evaluate the auto-dispatch rules until none fires.
    fn settle(&mut self) {
        while let Some(action) = next_auto_dispatch(&self.state, &self.cluster, self.store.as_ref()) {
            debug!(action = %action.type_name(), "Auto-dispatch");
            match self.forward(action) {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Auto-dispatch failed");
                    break;
                }
            }
        }
    }

    /// Apply one message from the sandbox.
    pub fn handle_message(&mut self, message: SandboxMessage) {
        match message {
            SandboxMessage::Console(console) => replay_console(&console),
            SandboxMessage::Action(envelope) => self.apply(envelope),
        }
    }

    fn apply(&mut self, envelope: ActionEnvelope) {
        let ActionEnvelope { action, epoch, .. } = envelope;
        let next = reduce_with_epoch(&self.state, &action, epoch);
        if next == self.state {
            if action.kind().is_some() && !action.is_request() {
                warn!(action = %action.type_name(), ?epoch, "Result not applied (stale or no matching request)");
            }
            return;
        }
        self.state = next;
        debug!(action = %action.type_name(), ?epoch, phase = %self.phase(), "State updated");

        if let Action::AccountGetSuccess(account) = &action {
            persist_account(self.store.as_ref(), account);
        }
        self.settle();
    }

    /// Wait for the next sandbox message and apply it.
    pub async fn next_event(&mut self) -> Result<()> {
        let bridge = self.bridge.as_mut().ok_or(HostError::NotReady)?;
        let message = bridge
            .recv()
            .await
            .ok_or(HostError::Bridge(BridgeError::Closed))?;
        self.handle_message(message);
        Ok(())
    }

    /// Process messages until `done` holds for the state.
    pub async fn run_until<F>(&mut self, limit: Duration, waiting_for: &str, done: F) -> Result<()>
    where
        F: Fn(&State) -> bool,
    {
        let pump = async {
            while !done(&self.state) {
                self.next_event().await?;
            }
            Ok::<(), HostError>(())
        };
        timeout(limit, pump)
            .await
            .map_err(|_| HostError::timeout(limit.as_secs(), waiting_for))?
    }

    /// Process messages until the workflow is ready or has failed.
    pub async fn run_to_completion(&mut self, limit: Duration) -> Result<WorkflowPhase> {
        self.run_until(limit, "workflow", |state| workflow_phase(state).is_terminal())
            .await?;
        Ok(self.phase())
    }

    /// The corrupted persisted key waiting for a [`Decision`], if any.
    pub fn pending_decision(&self) -> Option<&StateError> {
        pending_decision(&self.state)
    }

    pub fn resolve_corrupted_account(&mut self, decision: Decision) -> Result<()> {
        if self.pending_decision().is_none() {
            return Err(HostError::NoPendingDecision);
        }
        match decision {
            Decision::Recreate => {
                info!("Recreating account, stored key discarded");
                self.dispatch(Action::AccountGet(AccountRequest::default()))?;
            }
            Decision::Abort => info!("Account recreation declined"),
        }
        Ok(())
    }
}

/// Read-only views handed to UI consumers.
#[derive(Debug, Clone, Copy)]
pub struct WalletUi<'a> {
    state: &'a State,
}

impl<'a> WalletUi<'a> {
    pub fn connection(&self) -> View<'a, ConnectionData> {
        connection_view(self.state)
    }

    pub fn account(&self) -> View<'a, AccountData> {
        account_view(self.state)
    }

    pub fn token_list(&self) -> View<'a, Vec<Token>> {
        token_list_view(self.state)
    }

    pub fn token(&self, address: &str) -> View<'a, Token> {
        token_info_view(self.state, address)
    }

    pub fn phase(&self) -> WorkflowPhase {
        workflow_phase(self.state)
    }

    pub fn pending_decision(&self) -> Option<&'a StateError> {
        pending_decision(self.state)
    }
}
