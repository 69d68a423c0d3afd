use sandwallet_constants::{AIRDROP_LAMPORTS, SECRET_KEY_STORAGE_KEY};
use sandwallet_core::WorkflowPhase;
use sandwallet_host::{Decision, HostConfig, HostError, KeyValueStore, MemoryStore, WalletHost};
use sandwallet_sandbox::{MockChain, SandboxOptions};
use sandwallet_types::{Action, ErrorKind, Slice};
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LIMIT: Duration = Duration::from_secs(10);

fn config() -> HostConfig {
    HostConfig {
        cluster: "devnet".to_string(),
        store_path: PathBuf::from("unused.json"),
        assets_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/sandbox")),
        confirm_attempts: 1,
        confirm_interval: Duration::from_millis(1),
    }
}

async fn start(chain: &MockChain, store: &Arc<MemoryStore>) -> WalletHost {
    let options = SandboxOptions {
        rng_seed: Some(11),
        ..SandboxOptions::default()
    };
    WalletHost::start(&config(), Arc::new(chain.clone()), store.clone(), options).await
}

fn public_key(host: &WalletHost) -> String {
    host.state().account_data().unwrap().account.public_key.clone()
}

#[tokio::test]
async fn test_fresh_wallet_reaches_ready() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());
    let mut host = start(&chain, &store).await;
    assert!(host.is_ready());
    assert_eq!(host.phase(), WorkflowPhase::Connecting);

    let phase = host.run_to_completion(LIMIT).await.unwrap();
    assert_eq!(phase, WorkflowPhase::Ready);

    let ui = host.ui().unwrap();
    assert!(ui.connection().success);
    assert!(ui.token_list().data.unwrap().is_empty());

    let owner = Pubkey::from_str(&public_key(&host)).unwrap();
    assert_eq!(chain.airdrop_count().await, 1);
    assert!(chain.balance(&owner).await <= AIRDROP_LAMPORTS);
    assert!(chain.balance(&owner).await > 0);
}

#[tokio::test]
async fn test_account_is_persisted_and_restored() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());

    let mut first = start(&chain, &store).await;
    first.run_to_completion(LIMIT).await.unwrap();
    let created = public_key(&first);
    assert!(store.get(SECRET_KEY_STORAGE_KEY).unwrap().is_some());
    drop(first);

    let mut second = start(&chain, &store).await;
    let phase = second.run_to_completion(LIMIT).await.unwrap();
    assert_eq!(phase, WorkflowPhase::Ready);
    assert_eq!(public_key(&second), created);
    assert_eq!(chain.airdrop_count().await, 1);
}

#[tokio::test]
async fn test_token_add_prepends() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());
    let mut host = start(&chain, &store).await;
    host.run_to_completion(LIMIT).await.unwrap();

    for _ in 0..2 {
        assert!(host.dispatch(Action::TokenAdd).unwrap().is_some());
        host.run_until(LIMIT, "token add", |state| !state.is_loading(Slice::TokenList))
            .await
            .unwrap();
    }

    let tokens = host.state().tokens().to_vec();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0].address(), tokens[1].address());
    assert_eq!(chain.mint_count().await, 2);

    let ui = host.ui().unwrap();
    let newest = ui.token(tokens[0].address());
    assert_eq!(newest.data, Some(&tokens[0]));
    assert_eq!(newest.data.unwrap().mint.decimals, 9);
    assert!(ui.token("unknown").error.is_some());
}

#[tokio::test]
async fn test_request_for_busy_slice_is_dropped() {
    let chain = MockChain::new().with_latency(Duration::from_millis(50));
    let store = Arc::new(MemoryStore::new());
    let mut host = start(&chain, &store).await;
    assert!(host.state().is_loading(Slice::Connection));
    assert_eq!(host.dispatch(Action::connect("devnet")).unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_cluster_fails_connection() {
    let chain = MockChain::new().unreachable("devnet");
    let store = Arc::new(MemoryStore::new());
    let mut host = start(&chain, &store).await;
    match host.run_to_completion(LIMIT).await.unwrap() {
        WorkflowPhase::Failed { stage, .. } => assert_eq!(stage, Slice::Connection),
        other => panic!("unexpected {other:?}"),
    }
    assert!(host.state().account().is_none());
    assert!(host.pending_decision().is_none());
}

#[tokio::test]
async fn test_corrupted_key_recreated_on_request() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());
    store
        .set(SECRET_KEY_STORAGE_KEY, &bs58::encode([3u8; 10]).into_string())
        .unwrap();

    let mut host = start(&chain, &store).await;
    let phase = host.run_to_completion(LIMIT).await.unwrap();
    assert!(matches!(phase, WorkflowPhase::Failed { stage: Slice::Account, .. }));
    assert_eq!(host.pending_decision().unwrap().kind, Some(ErrorKind::Corruption));

    host.resolve_corrupted_account(Decision::Recreate).unwrap();
    let phase = host.run_to_completion(LIMIT).await.unwrap();
    assert_eq!(phase, WorkflowPhase::Ready);
    assert!(host.pending_decision().is_none());

    let stored = store.get(SECRET_KEY_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(bs58::decode(stored).into_vec().unwrap().len(), 64);
}

#[tokio::test]
async fn test_corrupted_key_abort_leaves_failure() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());
    store.set(SECRET_KEY_STORAGE_KEY, "0OIl").unwrap();

    let mut host = start(&chain, &store).await;
    host.run_to_completion(LIMIT).await.unwrap();
    host.resolve_corrupted_account(Decision::Abort).unwrap();
    assert!(matches!(host.phase(), WorkflowPhase::Failed { .. }));
    assert!(host.pending_decision().is_some());
    assert_eq!(chain.airdrop_count().await, 0);
}

#[tokio::test]
async fn test_no_pending_decision_is_an_error() {
    let chain = MockChain::new();
    let store = Arc::new(MemoryStore::new());
    let mut host = start(&chain, &store).await;
    host.run_to_completion(LIMIT).await.unwrap();
    let err = host.resolve_corrupted_account(Decision::Recreate).unwrap_err();
    assert!(matches!(err, HostError::NoPendingDecision));
}

#[tokio::test]
async fn test_missing_assets_leave_host_not_ready() {
    let dir = TempDir::new().unwrap();
    let config = HostConfig {
        assets_dir: dir.path().to_path_buf(),
        ..config()
    };
    let store = Arc::new(MemoryStore::new());
    let mut host = WalletHost::start(
        &config,
        Arc::new(MockChain::new()),
        store,
        SandboxOptions::default(),
    )
    .await;

    assert!(!host.is_ready());
    assert!(host.ui().is_none());
    assert_eq!(host.phase(), WorkflowPhase::Disconnected);
    let err = host.dispatch(Action::connect("devnet")).unwrap_err();
    assert!(matches!(err, HostError::NotReady));
}
