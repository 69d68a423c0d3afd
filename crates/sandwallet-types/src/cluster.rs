//! Named cluster monikers and their RPC endpoints.

use sandwallet_constants::LOCALNET_RPC_URL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown cluster: {0}")]
pub struct UnknownCluster(pub String);

/// Target network for the chain SDK.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cluster {
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
    /// Explicit `http(s)://` RPC endpoint
    Custom(String),
}

impl Cluster {
    pub fn rpc_url(&self) -> String {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com".to_string(),
            Cluster::Testnet => "https://api.testnet.solana.com".to_string(),
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com".to_string(),
            Cluster::Localnet => LOCALNET_RPC_URL.to_string(),
            Cluster::Custom(url) => url.clone(),
        }
    }

    /// Faucets only exist off mainnet.
    pub fn supports_airdrop(&self) -> bool {
        !matches!(self, Cluster::MainnetBeta)
    }
}

impl FromStr for Cluster {
    type Err = UnknownCluster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Cluster::Custom(url.to_string()))
            }
            other => Err(UnknownCluster(other.to_string())),
        }
    }
}

impl TryFrom<String> for Cluster {
    type Error = UnknownCluster;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cluster> for String {
    fn from(cluster: Cluster) -> Self {
        cluster.to_string()
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => f.write_str("devnet"),
            Cluster::Testnet => f.write_str("testnet"),
            Cluster::MainnetBeta => f.write_str("mainnet-beta"),
            Cluster::Localnet => f.write_str("localnet"),
            Cluster::Custom(url) => f.write_str(url),
        }
    }
}
