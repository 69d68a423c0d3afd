//! Seam between the dispatcher and the wrapped chain SDK.

use crate::error::SdkError;
use async_trait::async_trait;
use sandwallet_types::{Cluster, MintInfo, TokenAccountInfo};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use std::sync::Arc;

/// Opens connections to a cluster.
#[async_trait]
pub trait ChainSdk: Send + Sync {
    /// Connect and probe the endpoint; an unreachable endpoint is an error.
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn ChainConnection>, SdkError>;
}

/// An established connection. Every method is a suspension point.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    fn cluster(&self) -> &Cluster;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, SdkError>;

    /// Wait until the transaction is confirmed.
    async fn confirm(&self, signature: &Signature) -> Result<(), SdkError>;

    /// Create and initialize a new mint account at `mint`'s address, paid by `payer`.
    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, SdkError>;

    /// Associated token account of `owner` for `mint`, created if missing.
    async fn get_or_create_associated_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Pubkey, SdkError>;

    /// Mint `amount` base units to `destination`; `authority` signs and pays.
    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        destination: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SdkError>;

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo, SdkError>;

    async fn get_token_account(&self, address: &Pubkey) -> Result<TokenAccountInfo, SdkError>;

    /// Addresses of every token account `owner` holds under the SPL token program.
    async fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, SdkError>;
}
