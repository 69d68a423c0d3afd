use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use sandwallet_core::WorkflowPhase;
use sandwallet_host::logging::init_tracing;
use sandwallet_host::{Decision, HostConfig, JsonFileStore, KeyValueStore, MemoryStore, WalletHost};
use sandwallet_sandbox::{ChainSdk, MockChain, RpcChain, SandboxOptions};
use sandwallet_types::{Action, Slice, Token};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Connects to a Solana cluster, restores or creates the wallet account and
/// lists (and optionally creates) its SPL tokens.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Cluster id (devnet, testnet, mainnet-beta, localnet) or RPC URL
    #[arg(long)]
    cluster: Option<String>,

    /// JSON file holding the persisted account keys
    #[arg(long)]
    store: Option<PathBuf>,

    /// Directory containing sandbox.html and sandbox.js
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Number of new tokens to mint once the wallet is ready
    #[arg(long, default_value_t = 0)]
    add_tokens: u32,

    /// Print the details of a single token account instead of the list
    #[arg(long)]
    token: Option<String>,

    /// Run against the in-memory chain with an in-memory store
    #[arg(long)]
    mock: bool,

    /// Replace a corrupted stored key with a new account
    #[arg(long)]
    recreate_corrupted: bool,

    /// Give up waiting for the workflow after this many seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

fn print_token(token: &Token) {
    println!("Token account: {}", token.account.address);
    println!("  Mint:        {}", token.mint.address);
    println!("  Balance:     {} ({} raw)", token.ui_amount(), token.account.amount);
    println!("  Decimals:    {}", token.mint.decimals);
    println!("  Supply:      {}", token.mint.supply);
    println!("  Owner:       {}", token.account.owner);
    if let Some(authority) = &token.mint.mint_authority {
        println!("  Mint auth:   {authority}");
    }
    if let Some(authority) = &token.mint.freeze_authority {
        println!("  Freeze auth: {authority}");
    }
    println!("  Frozen:      {}", token.account.is_frozen);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing().context("Failed to set global default tracing subscriber")?;
    let cli = Cli::parse();

    let mut config = HostConfig::from_env();
    if let Some(cluster) = cli.cluster {
        config.cluster = cluster;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(assets) = cli.assets {
        config.assets_dir = assets;
    }
    let cluster = config.validate()?;
    info!(%cluster, mock = cli.mock, "Starting sandwallet");

    let (sdk, store): (Arc<dyn ChainSdk>, Arc<dyn KeyValueStore>) = if cli.mock {
        (Arc::new(MockChain::new()), Arc::new(MemoryStore::new()))
    } else {
        let store = JsonFileStore::open(&config.store_path)
            .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;
        (
            Arc::new(RpcChain::new(config.confirm_attempts, config.confirm_interval)),
            Arc::new(store),
        )
    };

    let mut host = WalletHost::start(&config, sdk, store, SandboxOptions::default()).await;
    if !host.is_ready() {
        bail!(
            "Sandbox assets could not be loaded from {}",
            config.assets_dir.display()
        );
    }

    let limit = Duration::from_secs(cli.timeout_secs);
    let mut phase = host.run_to_completion(limit).await?;

    if host.pending_decision().is_some() {
        if cli.recreate_corrupted {
            warn!("Stored key is corrupted, recreating the account");
            host.resolve_corrupted_account(Decision::Recreate)?;
            phase = host.run_to_completion(limit).await?;
        } else {
            host.resolve_corrupted_account(Decision::Abort)?;
            bail!("Stored key is corrupted; rerun with --recreate-corrupted to replace it");
        }
    }

    if let WorkflowPhase::Failed { stage, message } = &phase {
        bail!("Workflow failed at {stage}: {message}");
    }

    for n in 1..=cli.add_tokens {
        info!(n, total = cli.add_tokens, "Adding token");
        host.dispatch(Action::TokenAdd)?;
        host.run_until(limit, "token add", |state| !state.is_loading(Slice::TokenList))
            .await?;
        if let Some(error) = host.state().token_list().and_then(|list| list.error.as_ref()) {
            bail!("Token add failed: {error}");
        }
    }

    let Some(ui) = host.ui() else {
        bail!("Bridge is not ready");
    };
    println!("Account: {}", ui.account().data.map(|a| a.account.public_key.as_str()).unwrap_or("-"));

    match cli.token {
        Some(address) => {
            let view = ui.token(&address);
            match (view.data, view.error) {
                (Some(token), _) => print_token(token),
                (None, Some(error)) => bail!("{error}"),
                (None, None) => bail!("Token {address} not available"),
            }
        }
        None => {
            let tokens = ui.token_list().data.cloned().unwrap_or_default();
            println!("Tokens: {}", tokens.len());
            for token in &tokens {
                print_token(token);
            }
        }
    }
    Ok(())
}
