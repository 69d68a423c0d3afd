//! Keypair generation and reconstruction from persisted bytes.

use crate::error::{Result, SandboxError};
use sandwallet_constants::SECRET_KEY_LENGTH;
use sandwallet_types::Account;
use solana_sdk::signature::{Keypair, Signer};

const SELF_CHECK_MESSAGE: &[u8] = b"sandwallet keypair self-check";

pub fn generate() -> Keypair {
    Keypair::new()
}

/// Rebuild a keypair from its 64 persisted bytes.
///
/// Fails with a corruption error when the bytes have the wrong length, do not
/// form a consistent ed25519 keypair, cannot produce a verifiable signature,
/// or belong to a different public key than the one persisted alongside them.
pub fn reconstruct(secret_key: &[u8], expected_public_key: Option<&str>) -> Result<Keypair> {
    if secret_key.len() != SECRET_KEY_LENGTH {
        return Err(SandboxError::corruption(format!(
            "expected {SECRET_KEY_LENGTH} bytes, found {}",
            secret_key.len()
        )));
    }

    #[allow(deprecated)]
    let keypair = Keypair::from_bytes(secret_key)
        .map_err(|e| SandboxError::corruption(format!("invalid keypair bytes: {e}")))?;

    let signature = keypair.sign_message(SELF_CHECK_MESSAGE);
    if !signature.verify(keypair.pubkey().as_ref(), SELF_CHECK_MESSAGE) {
        return Err(SandboxError::corruption("signature self-check failed"));
    }

    if let Some(expected) = expected_public_key {
        let actual = keypair.pubkey().to_string();
        if actual != expected {
            return Err(SandboxError::corruption(format!(
                "public key mismatch: stored {expected}, derived {actual}"
            )));
        }
    }
    Ok(keypair)
}

pub fn account_of(keypair: &Keypair) -> Account {
    Account {
        public_key: keypair.pubkey().to_string(),
        secret_key: keypair.to_bytes().to_vec(),
    }
}
