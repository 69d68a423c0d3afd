//! Conversion of unpacked SPL token state into the JSON-safe records that
//! travel in `TOKEN_*_SUCCESS` payloads.

use sandwallet_types::{MintInfo, TokenAccountInfo};
use solana_sdk::pubkey::Pubkey;
use spl_token::state::{Account, AccountState, Mint};

pub fn mint_info(address: &Pubkey, mint: &Mint) -> MintInfo {
    MintInfo {
        address: address.to_string(),
        decimals: mint.decimals,
        freeze_authority: Option::<Pubkey>::from(mint.freeze_authority).map(|k| k.to_string()),
        is_initialized: mint.is_initialized,
        mint_authority: Option::<Pubkey>::from(mint.mint_authority).map(|k| k.to_string()),
        supply: mint.supply.to_string(),
    }
}

pub fn token_account_info(address: &Pubkey, account: &Account) -> TokenAccountInfo {
    TokenAccountInfo {
        address: address.to_string(),
        amount: account.amount.to_string(),
        close_authority: Option::<Pubkey>::from(account.close_authority).map(|k| k.to_string()),
        delegate: Option::<Pubkey>::from(account.delegate).map(|k| k.to_string()),
        delegated_amount: account.delegated_amount.to_string(),
        is_frozen: account.state == AccountState::Frozen,
        is_initialized: account.state != AccountState::Uninitialized,
        is_native: Option::<u64>::from(account.is_native).is_some(),
        mint: account.mint.to_string(),
        owner: account.owner.to_string(),
    }
}
