//! [`ChainSdk`] over a Solana JSON-RPC endpoint.

use crate::error::SdkError;
use crate::records::{mint_info, token_account_info};
use crate::sdk::{ChainConnection, ChainSdk};
use async_trait::async_trait;
use sandwallet_constants::{DEFAULT_CONFIRM_ATTEMPTS, DEFAULT_CONFIRM_INTERVAL_MS};
use sandwallet_types::{Cluster, MintInfo, TokenAccountInfo};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::instruction as ata_instruction;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Connects to real clusters.
#[derive(Debug, Clone)]
pub struct RpcChain {
    confirm_attempts: u32,
    confirm_interval: Duration,
}

impl Default for RpcChain {
    fn default() -> Self {
        Self {
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            confirm_interval: Duration::from_millis(DEFAULT_CONFIRM_INTERVAL_MS),
        }
    }
}

impl RpcChain {
    pub fn new(confirm_attempts: u32, confirm_interval: Duration) -> Self {
        Self {
            confirm_attempts,
            confirm_interval,
        }
    }
}

#[async_trait]
impl ChainSdk for RpcChain {
    #[instrument(skip(self), fields(cluster = %cluster))]
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn ChainConnection>, SdkError> {
        let url = cluster.rpc_url();
        let client = RpcClient::new_with_commitment(url.clone(), CommitmentConfig::confirmed());
        let version = client
            .get_version()
            .await
            .map_err(|e| SdkError::rpc_with_source(format!("{url} is unreachable"), e))?;
        info!(%url, solana_core = %version.solana_core, "Connected");
        Ok(Arc::new(RpcConnection {
            client,
            cluster: cluster.clone(),
            confirm_attempts: self.confirm_attempts,
            confirm_interval: self.confirm_interval,
        }))
    }
}

struct RpcConnection {
    client: RpcClient,
    cluster: Cluster,
    confirm_attempts: u32,
    confirm_interval: Duration,
}

impl RpcConnection {
    async fn send(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature, SdkError> {
        let recent_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| SdkError::rpc_with_source("getLatestBlockhash failed", e))?;
        let mut all_signers = vec![payer];
        all_signers.extend(signers.iter().filter(|s| s.pubkey() != payer.pubkey()));
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            all_signers.as_slice(),
            recent_blockhash,
        );
        self.client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| SdkError::program_with_source("Transaction failed", e))
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Vec<u8>, SdkError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map_err(|e| SdkError::rpc_with_source(format!("getAccountInfo {address} failed"), e))?;
        response
            .value
            .map(|account| account.data)
            .ok_or_else(|| SdkError::account_not_found(address.to_string()))
    }
}

#[async_trait]
impl ChainConnection for RpcConnection {
    fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, SdkError> {
        if !self.cluster.supports_airdrop() {
            return Err(SdkError::airdrop_unavailable(self.cluster.to_string()));
        }
        self.client
            .request_airdrop(to, lamports)
            .await
            .map_err(|e| SdkError::rpc_with_source("requestAirdrop failed", e))
    }

    async fn confirm(&self, signature: &Signature) -> Result<(), SdkError> {
        for attempt in 1..=self.confirm_attempts {
            let confirmed = self
                .client
                .confirm_transaction(signature)
                .await
                .map_err(|e| SdkError::rpc_with_source("confirmTransaction failed", e))?;
            if confirmed {
                debug!(%signature, attempt, "Confirmed");
                return Ok(());
            }
            sleep(self.confirm_interval).await;
        }
        Err(SdkError::confirmation_timeout(
            signature.to_string(),
            self.confirm_attempts,
        ))
    }

    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, SdkError> {
        let rent_lamports = self
            .client
            .get_minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
            .await
            .map_err(|e| SdkError::rpc_with_source("getMinimumBalanceForRentExemption failed", e))?;

        let create_account_ix = system_instruction::create_account(
            &payer.pubkey(),
            &mint.pubkey(),
            rent_lamports,
            spl_token::state::Mint::LEN as u64,
            &spl_token::id(),
        );
        let initialize_mint_ix = spl_token::instruction::initialize_mint(
            &spl_token::id(),
            &mint.pubkey(),
            mint_authority,
            freeze_authority,
            decimals,
        )
        .map_err(|e| SdkError::program_with_source("initializeMint could not be built", e))?;

        self.send(&[create_account_ix, initialize_mint_ix], payer, &[mint])
            .await?;
        Ok(mint.pubkey())
    }

    async fn get_or_create_associated_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Pubkey, SdkError> {
        let ata = spl_associated_token_account::get_associated_token_address(owner, mint);
        match self.account_data(&ata).await {
            Ok(_) => return Ok(ata),
            Err(SdkError::AccountNotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        let create_ata_ix = ata_instruction::create_associated_token_account_idempotent(
            &payer.pubkey(),
            owner,
            mint,
            &spl_token::id(),
        );
        self.send(&[create_ata_ix], payer, &[]).await?;
        Ok(ata)
    }

    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        destination: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SdkError> {
        let mint_to_ix = spl_token::instruction::mint_to(
            &spl_token::id(),
            mint,
            destination,
            &authority.pubkey(),
            &[],
            amount,
        )
        .map_err(|e| SdkError::program_with_source("mintTo could not be built", e))?;
        self.send(&[mint_to_ix], authority, &[]).await
    }

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo, SdkError> {
        let data = self.account_data(mint).await?;
        let state = spl_token::state::Mint::unpack(&data)
            .map_err(|e| SdkError::invalid_account_data(mint.to_string(), e.to_string()))?;
        Ok(mint_info(mint, &state))
    }

    async fn get_token_account(&self, address: &Pubkey) -> Result<TokenAccountInfo, SdkError> {
        let data = self.account_data(address).await?;
        let state = spl_token::state::Account::unpack(&data)
            .map_err(|e| SdkError::invalid_account_data(address.to_string(), e.to_string()))?;
        Ok(token_account_info(address, &state))
    }

    async fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, SdkError> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await
            .map_err(|e| SdkError::rpc_with_source("getTokenAccountsByOwner failed", e))?;
        accounts
            .iter()
            .map(|keyed| {
                Pubkey::from_str(&keyed.pubkey)
                    .map_err(|e| SdkError::invalid_account_data(keyed.pubkey.clone(), e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_unreachable_endpoint_fails() {
        let chain = RpcChain::new(1, Duration::from_millis(1));
        let cluster = Cluster::Custom("http://127.0.0.1:1".to_string());
        let err = chain.connect(&cluster).await.err().unwrap();
        assert!(err.to_string().contains("127.0.0.1:1 is unreachable"));
    }
}
