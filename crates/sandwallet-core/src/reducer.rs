//! Nested slice reducers: connection -> account -> tokenList.
//!
//! Each slice reducer returns `None` when the action leaves its slice
//! untouched, so parents only rebuild the path that actually changed and
//! never materialize a child slice for an action that does not concern it.
//!
//! Transitions for a slice and its action family:
//! - request: `{loading}`, data retained; ignored while already loading
//! - success: `{success, data: payload}`
//! - error: `{error}`, data retained
//!
//! Result actions carrying an epoch other than the slice's in-flight epoch
//! are stale and dropped.

use sandwallet_types::{
    AccountData, AccountState, Action, AsyncState, ConnectionData, ConnectionState, ErrorPayload,
    State, TokenListState,
};
use tracing::trace;

/// Fold one action into the tree.
pub fn reduce(state: &State, action: &Action) -> State {
    reduce_with_epoch(state, action, None)
}

/// Fold one action tagged with the host sequence number it belongs to.
///
/// For requests `epoch` is recorded as the slice's in-flight epoch; for
/// results it must match that epoch to be applied.
pub fn reduce_with_epoch(state: &State, action: &Action, epoch: Option<u64>) -> State {
    trace!(action = %action.type_name(), ?epoch, "reduce");
    State {
        connection: reduce_connection(&state.connection, action, epoch)
            .unwrap_or_else(|| state.connection.clone()),
    }
}

/// Fold a sequence of actions, left to right.
pub fn fold<'a>(state: &State, actions: impl IntoIterator<Item = &'a Action>) -> State {
    actions
        .into_iter()
        .fold(state.clone(), |state, action| reduce(&state, action))
}

fn begin<T: Clone>(slice: &AsyncState<T>, epoch: Option<u64>) -> Option<AsyncState<T>> {
    if slice.loading {
        return None;
    }
    Some(AsyncState {
        loading: true,
        success: false,
        error: None,
        data: slice.data.clone(),
        epoch,
    })
}

fn is_stale<T>(slice: &AsyncState<T>, epoch: Option<u64>) -> bool {
    matches!((slice.epoch, epoch), (Some(current), Some(incoming)) if current != incoming)
}

fn succeed<T>(slice: &AsyncState<T>, data: Option<T>, epoch: Option<u64>) -> Option<AsyncState<T>> {
    if is_stale(slice, epoch) {
        return None;
    }
    Some(AsyncState {
        loading: false,
        success: true,
        error: None,
        data,
        epoch: slice.epoch.or(epoch),
    })
}

fn fail<T: Clone>(
    slice: &AsyncState<T>,
    payload: &ErrorPayload,
    epoch: Option<u64>,
) -> Option<AsyncState<T>> {
    if is_stale(slice, epoch) {
        return None;
    }
    Some(AsyncState {
        loading: false,
        success: false,
        error: Some(payload.into()),
        data: slice.data.clone(),
        epoch: slice.epoch.or(epoch),
    })
}

fn reduce_token_list(
    state: &TokenListState,
    action: &Action,
    epoch: Option<u64>,
) -> Option<TokenListState> {
    match action {
        Action::TokenList | Action::TokenAdd => begin(state, epoch),
        Action::TokenListSuccess(tokens) => succeed(state, Some(tokens.clone()), epoch),
        Action::TokenAddSuccess(token) => {
            // Most recent first.
            let tokens = std::iter::once(token.clone())
                .chain(state.data.iter().flatten().cloned())
                .collect();
            succeed(state, Some(tokens), epoch)
        }
        Action::TokenListError(payload) | Action::TokenAddError(payload) => {
            fail(state, payload, epoch)
        }
        _ => None,
    }
}

fn reduce_account(state: &AccountState, action: &Action, epoch: Option<u64>) -> Option<AccountState> {
    match action {
        Action::AccountGet(_) => begin(state, epoch),
        Action::AccountGetSuccess(account) => {
            succeed(state, Some(AccountData::from(account.clone())), epoch)
        }
        Action::AccountGetError(payload) => fail(state, payload, epoch),
        _ => {
            let data = state.data.as_ref()?;
            let empty = TokenListState::default();
            let current = data.token_list.as_ref().unwrap_or(&empty);
            let token_list = reduce_token_list(current, action, epoch)?;
            Some(AccountState {
                data: Some(AccountData {
                    account: data.account.clone(),
                    token_list: Some(token_list),
                }),
                loading: state.loading,
                success: state.success,
                error: state.error.clone(),
                epoch: state.epoch,
            })
        }
    }
}

fn reduce_connection(
    state: &ConnectionState,
    action: &Action,
    epoch: Option<u64>,
) -> Option<ConnectionState> {
    match action {
        Action::Connect(_) => begin(state, epoch),
        Action::ConnectSuccess => succeed(state, None, epoch),
        Action::ConnectError(payload) => fail(state, payload, epoch),
        _ => {
            if !state.success {
                return None;
            }
            let empty = AccountState::default();
            let current = state
                .data
                .as_ref()
                .and_then(|data| data.account.as_ref())
                .unwrap_or(&empty);
            let account = reduce_account(current, action, epoch)?;
            Some(ConnectionState {
                data: Some(ConnectionData {
                    account: Some(account),
                }),
                loading: state.loading,
                success: state.success,
                error: state.error.clone(),
                epoch: state.epoch,
            })
        }
    }
}
