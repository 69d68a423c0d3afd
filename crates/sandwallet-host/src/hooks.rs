//! Auto-dispatch rules evaluated after every host state change.
//!
//! connection idle -> `CONNECT{cluster}`;
//! connection succeeded, account idle -> `ACCOUNT_GET{persisted keys}`;
//! account succeeded, token list idle -> `TOKEN_LIST`.
//!
//! A slice that failed is not idle, so nothing is retried automatically.

use crate::store::{stored_account_request, KeyValueStore};
use sandwallet_types::{Action, AsyncState, State};

pub fn next_auto_dispatch(state: &State, cluster: &str, store: &dyn KeyValueStore) -> Option<Action> {
    let connection = &state.connection;
    if connection.is_idle() {
        return Some(Action::connect(cluster));
    }
    if !connection.success {
        return None;
    }

    let account = state.account();
    if idle(account) {
        return Some(Action::AccountGet(stored_account_request(store)));
    }
    if !account.is_some_and(|account| account.success) {
        return None;
    }

    idle(state.token_list()).then_some(Action::TokenList)
}

/// An absent slice has never been requested.
fn idle<T>(slice: Option<&AsyncState<T>>) -> bool {
    slice.is_none_or(|slice| slice.is_idle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{persist_account, MemoryStore};
    use sandwallet_core::fold;
    use sandwallet_types::{Account, AccountRequest, ErrorPayload};

    fn account() -> Account {
        Account {
            public_key: "pk".to_string(),
            secret_key: vec![1; 64],
        }
    }

    #[test]
    fn test_rules_in_order() {
        let store = MemoryStore::new();
        let mut state = State::default();
        assert_eq!(
            next_auto_dispatch(&state, "devnet", &store),
            Some(Action::connect("devnet"))
        );

        state = fold(&state, &[Action::connect("devnet")]);
        assert_eq!(next_auto_dispatch(&state, "devnet", &store), None);

        state = fold(&state, &[Action::ConnectSuccess]);
        assert_eq!(
            next_auto_dispatch(&state, "devnet", &store),
            Some(Action::AccountGet(AccountRequest::default()))
        );

        state = fold(
            &state,
            &[
                Action::AccountGet(AccountRequest::default()),
                Action::AccountGetSuccess(account()),
            ],
        );
        assert_eq!(
            next_auto_dispatch(&state, "devnet", &store),
            Some(Action::TokenList)
        );

        state = fold(&state, &[Action::TokenList, Action::TokenListSuccess(vec![])]);
        assert_eq!(next_auto_dispatch(&state, "devnet", &store), None);
    }

    #[test]
    fn test_account_request_uses_persisted_keys() {
        let store = MemoryStore::new();
        persist_account(&store, &account());
        let state = fold(
            &State::default(),
            &[Action::connect("devnet"), Action::ConnectSuccess],
        );
        match next_auto_dispatch(&state, "devnet", &store) {
            Some(Action::AccountGet(request)) => {
                assert_eq!(request.secret_key, Some(vec![1; 64]));
                assert_eq!(request.public_key.as_deref(), Some("pk"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_failures_are_not_retried() {
        let store = MemoryStore::new();
        let state = fold(
            &State::default(),
            &[
                Action::connect("devnet"),
                Action::ConnectError(ErrorPayload::new("unreachable")),
            ],
        );
        assert_eq!(next_auto_dispatch(&state, "devnet", &store), None);
    }
}
