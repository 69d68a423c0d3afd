//! Account and token records.
//!
//! Every field that can exceed JSON number precision (supplies, amounts) and
//! every address is carried as a string so the records survive the JSON
//! boundary untouched. Secret key bytes travel as an array of small integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet account as produced by `ACCOUNT_GET_SUCCESS`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Base58 public key
    pub public_key: String,
    /// Full 64-byte ed25519 keypair bytes
    pub secret_key: Vec<u8>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("public_key", &self.public_key)
            .field("secret_key", &format_args!("<{} bytes>", self.secret_key.len()))
            .finish()
    }
}

/// On-chain mint metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfo {
    pub address: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_authority: Option<String>,
    pub is_initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_authority: Option<String>,
    pub supply: String,
}

/// On-chain token account holding a balance of one mint for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub address: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    pub delegated_amount: String,
    pub is_frozen: bool,
    pub is_initialized: bool,
    pub is_native: bool,
    pub mint: String,
    pub owner: String,
}

/// A mint together with the wallet's token account for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub mint: MintInfo,
    pub account: TokenAccountInfo,
}

impl Token {
    /// Address of the token account, the key the UI uses to look a token up.
    pub fn address(&self) -> &str {
        &self.account.address
    }

    /// Balance formatted with the mint's decimal precision, e.g. `0.000000042`.
    pub fn ui_amount(&self) -> String {
        format_ui_amount(&self.account.amount, self.mint.decimals)
    }
}

/// Render a raw integer amount with `decimals` fractional digits.
///
/// Non-numeric input is returned unchanged.
pub fn format_ui_amount(raw: &str, decimals: u8) -> String {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw.to_string();
    }
    let padded = format!("{raw:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}
