//! Nested async-state tree.
//!
//! `State.connection -> data.account -> data.tokenList`, each level an
//! [`AsyncState`]. The host owns one tree; the sandbox keeps a mirror that is
//! only ever advanced by replaying the same actions.

use crate::action::Slice;
use crate::error::StateError;
use crate::model::{Account, Token};
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Progress of one asynchronous operation plus its last known result.
///
/// At most one of `loading`, `success` and `error` is set at a time. `data`
/// survives a later `loading` or `error` transition (last known good value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct AsyncState<T> {
    #[serde(default, skip_serializing_if = "is_false")]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StateError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Host sequence number of the request in flight (or last completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            success: false,
            error: None,
            data: None,
            epoch: None,
        }
    }
}

impl<T> AsyncState<T> {
    /// Nothing attempted yet: not loading, not succeeded, not failed.
    pub fn is_idle(&self) -> bool {
        !self.loading && !self.success && self.error.is_none()
    }
}

pub type TokenListState = AsyncState<Vec<Token>>;
pub type AccountState = AsyncState<AccountData>;
pub type ConnectionState = AsyncState<ConnectionData>;

/// Account record plus the slices that hang off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    #[serde(flatten)]
    pub account: Account,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_list: Option<TokenListState>,
}

impl From<Account> for AccountData {
    fn from(account: Account) -> Self {
        Self {
            account,
            token_list: None,
        }
    }
}

/// Slices that exist once a connection has been established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountState>,
}

/// Root of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub connection: ConnectionState,
}

impl State {
    pub fn account(&self) -> Option<&AccountState> {
        self.connection.data.as_ref()?.account.as_ref()
    }

    pub fn account_data(&self) -> Option<&AccountData> {
        self.account()?.data.as_ref()
    }

    pub fn token_list(&self) -> Option<&TokenListState> {
        self.account_data()?.token_list.as_ref()
    }

    pub fn tokens(&self) -> &[Token] {
        self.token_list()
            .and_then(|list| list.data.as_deref())
            .unwrap_or_default()
    }

    /// Whether the slice's guard is currently held by an in-flight request.
    pub fn is_loading(&self, slice: Slice) -> bool {
        match slice {
            Slice::Connection => self.connection.loading,
            Slice::Account => self.account().is_some_and(|s| s.loading),
            Slice::TokenList => self.token_list().is_some_and(|s| s.loading),
        }
    }

    /// In-flight epoch recorded on a slice, if the slice exists.
    pub fn epoch(&self, slice: Slice) -> Option<u64> {
        match slice {
            Slice::Connection => self.connection.epoch,
            Slice::Account => self.account()?.epoch,
            Slice::TokenList => self.token_list()?.epoch,
        }
    }
}
