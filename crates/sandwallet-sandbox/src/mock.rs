//! In-memory chain used by tests and the CLI `--mock` mode.
//!
//! Keeps lamport balances, mints and token accounts in a shared ledger and
//! enforces the few rules the wallet depends on: a payer must hold lamports,
//! only the mint authority can mint, and an associated token account is
//! created once per owner and mint.

use crate::error::SdkError;
use crate::records::{mint_info, token_account_info};
use crate::sdk::{ChainConnection, ChainSdk};
use async_trait::async_trait;
use sandwallet_types::{Cluster, MintInfo, TokenAccountInfo};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use spl_token::state::{Account, AccountState, Mint};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Lamports charged to the payer for every account a transaction creates.
const MOCK_RENT_LAMPORTS: u64 = 1_461_600;

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Pubkey, u64>,
    mints: HashMap<Pubkey, Mint>,
    /// Ordered so owner listings are deterministic
    token_accounts: BTreeMap<Pubkey, Account>,
    signatures: u64,
    airdrops: u32,
}

impl Ledger {
    fn next_signature(&mut self) -> Signature {
        self.signatures += 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&self.signatures.to_le_bytes());
        Signature::from(bytes)
    }

    fn debit(&mut self, payer: &Pubkey, lamports: u64) -> Result<(), SdkError> {
        let balance = self.balances.get(payer).copied().unwrap_or(0);
        if balance < lamports {
            return Err(SdkError::program(format!(
                "Attempt to debit an account but found no record of a prior credit ({payer})"
            )));
        }
        self.balances.insert(*payer, balance - lamports);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    unreachable: HashSet<String>,
    airdrop_failure: bool,
    latency: Option<Duration>,
}

/// Shared in-memory chain. Clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    ledger: Arc<Mutex<Ledger>>,
    behavior: Behavior,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `connect` for this cluster id.
    pub fn unreachable(mut self, cluster: impl Into<String>) -> Self {
        self.behavior.unreachable.insert(cluster.into());
        self
    }

    /// Make every airdrop request fail.
    pub fn with_airdrop_failure(mut self) -> Self {
        self.behavior.airdrop_failure = true;
        self
    }

    /// Delay every connection call, to keep requests in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.behavior.latency = Some(latency);
        self
    }

    pub async fn balance(&self, owner: &Pubkey) -> u64 {
        self.ledger.lock().await.balances.get(owner).copied().unwrap_or(0)
    }

    pub async fn airdrop_count(&self) -> u32 {
        self.ledger.lock().await.airdrops
    }

    pub async fn mint_count(&self) -> usize {
        self.ledger.lock().await.mints.len()
    }
}

#[async_trait]
impl ChainSdk for MockChain {
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn ChainConnection>, SdkError> {
        if self.behavior.unreachable.contains(&cluster.to_string()) {
            return Err(SdkError::rpc(format!("{} is unreachable", cluster.rpc_url())));
        }
        debug!(%cluster, "Mock connection opened");
        Ok(Arc::new(MockConnection {
            ledger: self.ledger.clone(),
            behavior: self.behavior.clone(),
            cluster: cluster.clone(),
        }))
    }
}

struct MockConnection {
    ledger: Arc<Mutex<Ledger>>,
    behavior: Behavior,
    cluster: Cluster,
}

impl MockConnection {
    async fn settle(&self) {
        if let Some(latency) = self.behavior.latency {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl ChainConnection for MockConnection {
    fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, SdkError> {
        self.settle().await;
        if self.behavior.airdrop_failure || !self.cluster.supports_airdrop() {
            return Err(SdkError::airdrop_unavailable(self.cluster.to_string()));
        }
        let mut ledger = self.ledger.lock().await;
        *ledger.balances.entry(*to).or_default() += lamports;
        ledger.airdrops += 1;
        Ok(ledger.next_signature())
    }

    async fn confirm(&self, signature: &Signature) -> Result<(), SdkError> {
        self.settle().await;
        let ledger = self.ledger.lock().await;
        let issued = u64::from_le_bytes(
            signature.as_ref()[..8]
                .try_into()
                .map_err(|_| SdkError::rpc("malformed signature"))?,
        );
        if issued == 0 || issued > ledger.signatures {
            return Err(SdkError::confirmation_timeout(signature.to_string(), 1));
        }
        Ok(())
    }

    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<Pubkey, SdkError> {
        self.settle().await;
        let mut ledger = self.ledger.lock().await;
        let address = mint.pubkey();
        if ledger.mints.contains_key(&address) {
            return Err(SdkError::program(format!("Account {address} already in use")));
        }
        ledger.debit(&payer.pubkey(), MOCK_RENT_LAMPORTS)?;
        ledger.mints.insert(
            address,
            Mint {
                mint_authority: Some(*mint_authority).into(),
                supply: 0,
                decimals,
                is_initialized: true,
                freeze_authority: freeze_authority.copied().into(),
            },
        );
        ledger.next_signature();
        Ok(address)
    }

    async fn get_or_create_associated_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Pubkey, SdkError> {
        self.settle().await;
        let ata = spl_associated_token_account::get_associated_token_address(owner, mint);
        let mut ledger = self.ledger.lock().await;
        if ledger.token_accounts.contains_key(&ata) {
            return Ok(ata);
        }
        if !ledger.mints.contains_key(mint) {
            return Err(SdkError::account_not_found(mint.to_string()));
        }
        ledger.debit(&payer.pubkey(), MOCK_RENT_LAMPORTS)?;
        ledger.token_accounts.insert(
            ata,
            Account {
                mint: *mint,
                owner: *owner,
                state: AccountState::Initialized,
                ..Account::default()
            },
        );
        ledger.next_signature();
        Ok(ata)
    }

    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        destination: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SdkError> {
        self.settle().await;
        let mut ledger = self.ledger.lock().await;
        let state = ledger
            .mints
            .get(mint)
            .ok_or_else(|| SdkError::account_not_found(mint.to_string()))?;
        if Option::<Pubkey>::from(state.mint_authority) != Some(authority.pubkey()) {
            return Err(SdkError::program("owner does not match mint authority"));
        }
        let supply = state
            .supply
            .checked_add(amount)
            .ok_or_else(|| SdkError::program("supply overflow"))?;
        let account = ledger
            .token_accounts
            .get_mut(destination)
            .ok_or_else(|| SdkError::account_not_found(destination.to_string()))?;
        if account.mint != *mint {
            return Err(SdkError::program("account not associated with this mint"));
        }
        account.amount += amount;
        if let Some(state) = ledger.mints.get_mut(mint) {
            state.supply = supply;
        }
        Ok(ledger.next_signature())
    }

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo, SdkError> {
        self.settle().await;
        let ledger = self.ledger.lock().await;
        ledger
            .mints
            .get(mint)
            .map(|state| mint_info(mint, state))
            .ok_or_else(|| SdkError::account_not_found(mint.to_string()))
    }

    async fn get_token_account(&self, address: &Pubkey) -> Result<TokenAccountInfo, SdkError> {
        self.settle().await;
        let ledger = self.ledger.lock().await;
        ledger
            .token_accounts
            .get(address)
            .map(|state| token_account_info(address, state))
            .ok_or_else(|| SdkError::account_not_found(address.to_string()))
    }

    async fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, SdkError> {
        self.settle().await;
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .token_accounts
            .iter()
            .filter(|(_, account)| account.owner == *owner)
            .map(|(address, _)| *address)
            .collect())
    }
}
