//! Constants for the sandwallet workspace
//!
//! This crate provides centralized constants that are shared by the host,
//! the sandbox and the CLI without creating circular dependencies.

/// Storage key for the persisted secret key (bs58 encoded)
pub const SECRET_KEY_STORAGE_KEY: &str = "account-secret-key";

/// Storage key for the persisted public key (bs58 encoded)
pub const PUBLIC_KEY_STORAGE_KEY: &str = "account-public-key";

/// Cluster the workflow connects to when nothing else is configured
pub const DEFAULT_CLUSTER: &str = "devnet";

/// Local validator RPC endpoint (surfpool / solana-test-validator)
pub const LOCALNET_RPC_URL: &str = "http://127.0.0.1:8899";

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Amount requested from the faucet when a fresh keypair is generated
pub const AIRDROP_LAMPORTS: u64 = LAMPORTS_PER_SOL;

/// Decimal precision of every mint created by `TOKEN_ADD`
pub const MINT_DECIMALS: u8 = 9;

/// Exclusive upper bound of the amount minted by `TOKEN_ADD`
pub const MAX_MINT_AMOUNT: u64 = 1000;

/// Length of an ed25519 keypair secret (secret half + public half)
pub const SECRET_KEY_LENGTH: usize = 64;

/// Global the sandbox script installs; host statements call `<entry>.dispatch(..)`
pub const SANDBOX_ENTRY: &str = "window.sandbox";

/// File name of the sandbox markup asset
pub const SANDBOX_MARKUP_ASSET: &str = "sandbox.html";

/// File name of the sandbox script asset
pub const SANDBOX_SCRIPT_ASSET: &str = "sandbox.js";

/// Default number of confirmation polls for an airdrop signature
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 30;

/// Default delay between confirmation polls in milliseconds
pub const DEFAULT_CONFIRM_INTERVAL_MS: u64 = 1000;

/// Statement prefix the host uses to invoke the sandbox dispatcher
pub fn dispatch_statement_prefix() -> String {
    format!("{SANDBOX_ENTRY}.dispatch(")
}
