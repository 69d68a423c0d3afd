//! Flattened read-only views over [`State`] for UI consumers.

use sandwallet_types::{
    AccountData, AsyncState, ConnectionData, Slice, State, StateError, Token,
};
use serde::Serialize;
use std::fmt;

/// `{data, loading, error, success}` for one slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View<'a, T> {
    pub data: Option<&'a T>,
    pub loading: bool,
    pub success: bool,
    pub error: Option<StateError>,
}

impl<'a, T> View<'a, T> {
    fn of(slice: &'a AsyncState<T>) -> Self {
        Self {
            data: slice.data.as_ref(),
            loading: slice.loading,
            success: slice.success,
            error: slice.error.clone(),
        }
    }
}

pub fn connection_view(state: &State) -> View<'_, ConnectionData> {
    View::of(&state.connection)
}

/// Account view. While the connection is not yet established the account is
/// reported as loading, and a connection failure surfaces as its error.
pub fn account_view(state: &State) -> View<'_, AccountData> {
    let connection = &state.connection;
    match state.account().filter(|account| !account.is_idle()) {
        Some(account) => View::of(account),
        None => View {
            data: None,
            loading: connection.loading || connection.is_idle(),
            success: false,
            error: connection.error.clone(),
        },
    }
}

/// Token list view, inheriting loading/error from the account above it.
pub fn token_list_view(state: &State) -> View<'_, Vec<Token>> {
    match state.token_list().filter(|list| !list.is_idle()) {
        Some(list) => View::of(list),
        None => {
            let account = account_view(state);
            View {
                data: None,
                loading: account.loading || account.success,
                success: false,
                error: account.error,
            }
        }
    }
}

/// A single token looked up by its token account address.
pub fn token_info_view<'a>(state: &'a State, address: &str) -> View<'a, Token> {
    let list = token_list_view(state);
    let token = list
        .data
        .and_then(|tokens| tokens.iter().find(|token| token.address() == address));
    let error = match (token, &list.error) {
        (Some(_), _) => None,
        (None, Some(error)) => Some(error.clone()),
        (None, None) if !list.loading => Some(StateError::new("Token not found")),
        (None, None) => None,
    };
    View {
        data: token,
        loading: token.is_none() && list.loading,
        success: token.is_some(),
        error,
    }
}

/// Coarse progress of the connect -> authenticate -> list workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowPhase {
    Disconnected,
    Connecting,
    Connected,
    FetchingAccount,
    Authenticated,
    FetchingTokens,
    Ready,
    /// Terminal. Nothing retries automatically.
    Failed { stage: Slice, message: String },
}

impl WorkflowPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowPhase::Ready | WorkflowPhase::Failed { .. })
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowPhase::Disconnected => f.write_str("disconnected"),
            WorkflowPhase::Connecting => f.write_str("connecting"),
            WorkflowPhase::Connected => f.write_str("connected"),
            WorkflowPhase::FetchingAccount => f.write_str("fetching account"),
            WorkflowPhase::Authenticated => f.write_str("authenticated"),
            WorkflowPhase::FetchingTokens => f.write_str("fetching tokens"),
            WorkflowPhase::Ready => f.write_str("ready"),
            WorkflowPhase::Failed { stage, message } => write!(f, "failed at {stage}: {message}"),
        }
    }
}

pub fn workflow_phase(state: &State) -> WorkflowPhase {
    let connection = &state.connection;
    if let Some(error) = &connection.error {
        return failed(Slice::Connection, error);
    }
    if connection.loading {
        return WorkflowPhase::Connecting;
    }
    if !connection.success {
        return WorkflowPhase::Disconnected;
    }

    let Some(account) = state.account().filter(|account| !account.is_idle()) else {
        return WorkflowPhase::Connected;
    };
    if let Some(error) = &account.error {
        return failed(Slice::Account, error);
    }
    if account.loading {
        return WorkflowPhase::FetchingAccount;
    }

    let Some(list) = state.token_list().filter(|list| !list.is_idle()) else {
        return WorkflowPhase::Authenticated;
    };
    if let Some(error) = &list.error {
        return failed(Slice::TokenList, error);
    }
    if list.loading {
        return WorkflowPhase::FetchingTokens;
    }
    WorkflowPhase::Ready
}

fn failed(stage: Slice, error: &StateError) -> WorkflowPhase {
    WorkflowPhase::Failed {
        stage,
        message: error.message.clone(),
    }
}

/// The persisted key failed to reconstruct and the user has to choose
/// between recreating the account and aborting.
pub fn pending_decision(state: &State) -> Option<&StateError> {
    state
        .account()?
        .error
        .as_ref()
        .filter(|error| error.is_corruption())
}
