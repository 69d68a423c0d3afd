//! Static sandbox assets: the markup document and the script bundle.

use crate::error::BridgeError;
use sandwallet_constants::{SANDBOX_MARKUP_ASSET, SANDBOX_SCRIPT_ASSET};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxAssets {
    pub markup: String,
    pub script: String,
}

impl SandboxAssets {
    /// Load both assets from `dir`. Either one missing or empty is an error.
    pub async fn load(dir: &Path) -> Result<Self, BridgeError> {
        let markup = read_asset(dir, SANDBOX_MARKUP_ASSET).await?;
        let script = read_asset(dir, SANDBOX_SCRIPT_ASSET).await?;
        debug!(dir = %dir.display(), markup = markup.len(), script = script.len(), "Sandbox assets loaded");
        Ok(Self { markup, script })
    }
}

async fn read_asset(dir: &Path, name: &str) -> Result<String, BridgeError> {
    let path = dir.join(name);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| BridgeError::asset_unavailable(&path, e))?;
    if content.trim().is_empty() {
        return Err(BridgeError::asset_empty(path));
    }
    Ok(content)
}
