use rstest::rstest;
use sandwallet_sandbox::keys;
use sandwallet_sandbox::outbox::Outbox;
use sandwallet_sandbox::{MockChain, SandboxDispatcher, SandboxOptions};
use sandwallet_types::{
    AccountRequest, Action, ActionEnvelope, ErrorKind, SandboxMessage, Slice,
};
use solana_sdk::signature::Signer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    chain: MockChain,
    dispatcher: Arc<SandboxDispatcher>,
    envelopes: mpsc::UnboundedReceiver<String>,
    seq: u64,
}

impl Harness {
    fn new(chain: MockChain) -> Self {
        let (tx, envelopes) = mpsc::unbounded_channel();
        let options = SandboxOptions {
            rng_seed: Some(7),
            ..SandboxOptions::default()
        };
        let dispatcher = SandboxDispatcher::new(Arc::new(chain.clone()), Outbox::new(tx), &options);
        Self {
            chain,
            dispatcher,
            envelopes,
            seq: 0,
        }
    }

    /// Dispatch a request, wait for its handler and return the result envelope.
    async fn request(&mut self, action: Action) -> ActionEnvelope {
        self.seq += 1;
        let handle = self
            .dispatcher
            .dispatch(action, Some(self.seq))
            .await
            .expect("handler should start");
        handle.await.unwrap();
        self.next_action()
    }

    fn next_action(&mut self) -> ActionEnvelope {
        while let Ok(json) = self.envelopes.try_recv() {
            if let SandboxMessage::Action(envelope) = SandboxMessage::from_json(&json).unwrap() {
                return envelope;
            }
        }
        panic!("no action envelope posted");
    }

    async fn authenticate(&mut self) -> sandwallet_types::Account {
        assert_eq!(self.request(Action::connect("devnet")).await.action, Action::ConnectSuccess);
        match self.request(Action::AccountGet(AccountRequest::default())).await.action {
            Action::AccountGetSuccess(account) => account,
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_connect_success_carries_epoch() {
    let mut harness = Harness::new(MockChain::new());
    let envelope = harness.request(Action::connect("devnet")).await;
    assert_eq!(envelope.action, Action::ConnectSuccess);
    assert_eq!(envelope.epoch, Some(1));
    assert_eq!(envelope.seq, Some(1));
    assert!(harness.dispatcher.mirror().await.connection.success);
}

#[tokio::test]
async fn test_invalid_cluster_is_connect_error() {
    let mut harness = Harness::new(MockChain::new());
    let envelope = harness.request(Action::connect("moonnet")).await;
    let payload = envelope.action.error_payload().unwrap();
    assert_eq!(envelope.action.type_name(), "CONNECT_ERROR");
    assert_eq!(payload.message, "Invalid cluster: moonnet");
    assert_eq!(payload.kind, Some(ErrorKind::Sdk));
}

#[tokio::test]
async fn test_unreachable_cluster_is_connect_error() {
    let mut harness = Harness::new(MockChain::new().unreachable("testnet"));
    let envelope = harness.request(Action::connect("testnet")).await;
    assert_eq!(envelope.action.type_name(), "CONNECT_ERROR");
}

#[rstest]
#[case::account_before_connect(false, Action::AccountGet(AccountRequest::default()), "ACCOUNT_GET_ERROR", "Connection not established")]
#[case::list_before_connect(false, Action::TokenList, "TOKEN_LIST_ERROR", "Connection not established")]
#[case::add_before_connect(false, Action::TokenAdd, "TOKEN_ADD_ERROR", "Connection not established")]
#[case::list_without_keypair(true, Action::TokenList, "TOKEN_LIST_ERROR", "Authentication required")]
#[case::add_without_keypair(true, Action::TokenAdd, "TOKEN_ADD_ERROR", "Authentication required")]
#[tokio::test]
async fn test_missing_session_handle_is_precondition_error(
    #[case] connected: bool,
    #[case] action: Action,
    #[case] type_name: &str,
    #[case] message: &str,
) {
    let mut harness = Harness::new(MockChain::new());
    if connected {
        harness.request(Action::connect("devnet")).await;
    }
    let envelope = harness.request(action).await;
    let payload = envelope.action.error_payload().unwrap();
    assert_eq!(envelope.action.type_name(), type_name);
    assert_eq!(payload.message, message);
    assert_eq!(payload.kind, Some(ErrorKind::Precondition));
    assert_eq!(harness.chain.mint_count().await, 0);
}

#[tokio::test]
async fn test_fresh_account_is_funded() {
    let mut harness = Harness::new(MockChain::new());
    let account = harness.authenticate().await;
    assert_eq!(account.secret_key.len(), 64);
    let keypair = keys::reconstruct(&account.secret_key, Some(&account.public_key)).unwrap();
    assert_eq!(harness.chain.balance(&keypair.pubkey()).await, 1_000_000_000);
    assert_eq!(harness.chain.airdrop_count().await, 1);
}

#[tokio::test]
async fn test_restored_account_is_not_airdropped() {
    let mut harness = Harness::new(MockChain::new());
    let stored = keys::account_of(&keys::generate());
    harness.request(Action::connect("devnet")).await;
    let envelope = harness
        .request(Action::AccountGet(AccountRequest {
            secret_key: Some(stored.secret_key.clone()),
            public_key: Some(stored.public_key.clone()),
        }))
        .await;
    assert_eq!(envelope.action, Action::AccountGetSuccess(stored));
    assert_eq!(harness.chain.airdrop_count().await, 0);
}

#[tokio::test]
async fn test_corrupted_secret_key() {
    let mut harness = Harness::new(MockChain::new());
    harness.request(Action::connect("devnet")).await;
    let envelope = harness
        .request(Action::AccountGet(AccountRequest {
            secret_key: Some(vec![1, 2, 3]),
            public_key: None,
        }))
        .await;
    let payload = envelope.action.error_payload().unwrap();
    assert_eq!(payload.kind, Some(ErrorKind::Corruption));
    assert!(payload.message.starts_with("Stored secret key is corrupted"));
}

#[tokio::test]
async fn test_airdrop_failure_is_account_error() {
    let mut harness = Harness::new(MockChain::new().with_airdrop_failure());
    harness.request(Action::connect("devnet")).await;
    let envelope = harness
        .request(Action::AccountGet(AccountRequest::default()))
        .await;
    assert_eq!(envelope.action.type_name(), "ACCOUNT_GET_ERROR");
    assert_eq!(
        envelope.action.error_payload().unwrap().kind,
        Some(ErrorKind::Sdk)
    );
}

#[tokio::test]
async fn test_token_add_then_list() {
    let mut harness = Harness::new(MockChain::new());
    let account = harness.authenticate().await;

    let added = match harness.request(Action::TokenAdd).await.action {
        Action::TokenAddSuccess(token) => token,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(added.mint.decimals, 9);
    assert_eq!(added.mint.mint_authority.as_deref(), Some(account.public_key.as_str()));
    assert_eq!(added.mint.freeze_authority.as_deref(), Some(account.public_key.as_str()));
    assert_eq!(added.account.owner, account.public_key);
    assert_eq!(added.account.amount, added.mint.supply);
    assert!(added.account.amount.parse::<u64>().unwrap() < 1000);

    let listed = harness.request(Action::TokenList).await.action;
    assert_eq!(listed, Action::TokenListSuccess(vec![added]));
}

#[tokio::test]
async fn test_empty_token_list() {
    let mut harness = Harness::new(MockChain::new());
    harness.authenticate().await;
    let listed = harness.request(Action::TokenList).await.action;
    assert_eq!(listed, Action::TokenListSuccess(vec![]));
}

#[tokio::test]
async fn test_duplicate_request_dropped_while_loading() {
    let mut harness = Harness::new(MockChain::new().with_latency(Duration::from_millis(50)));
    harness.authenticate().await;

    let first = harness.dispatcher.dispatch(Action::TokenAdd, Some(10)).await;
    assert!(first.is_some());
    assert!(harness.dispatcher.mirror().await.is_loading(Slice::TokenList));
    // TOKEN_LIST shares the token list slice with TOKEN_ADD.
    assert!(harness.dispatcher.dispatch(Action::TokenList, Some(11)).await.is_none());
    assert!(harness.dispatcher.dispatch(Action::TokenAdd, Some(12)).await.is_none());

    first.unwrap().await.unwrap();
    let envelope = harness.next_action();
    assert_eq!(envelope.epoch, Some(10));
    assert_eq!(harness.chain.mint_count().await, 1);
    assert!(!harness.dispatcher.mirror().await.is_loading(Slice::TokenList));
}

#[tokio::test]
async fn test_unknown_action_starts_nothing() {
    let harness = Harness::new(MockChain::new());
    let action = Action::Unknown {
        type_name: "WALLET_LOCK".to_string(),
        payload: None,
    };
    assert!(harness.dispatcher.dispatch(action, Some(1)).await.is_none());
    assert!(harness.dispatcher.dispatch(Action::ConnectSuccess, None).await.is_none());
}
