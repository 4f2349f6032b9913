//! Identity - deterministic account key derivation from an external wallet address.
//!
//! ```text
//! EthAddress (20 bytes)
//!     │
//!     └── HMAC-SHA512("aztec-history-account-v1") ──→ private key (first 32 bytes)
//!                                                          │
//!                                                          └── SHA-512 ──→ public key (64 bytes)
//! ```
//!
//! The same address always yields the same pair, so reconnecting restores the same
//! account. The real SDK derives the pair from a wallet signature instead; the
//! in-memory client uses this scheme so the determinism contract holds offline.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use thiserror::Error;
use zeroize::Zeroize;

use crate::sdk::{AccountKeyPair, AccountPrivateKey, AccountPublicKey};
use crate::wallet::EthAddress;

const ACCOUNT_KEY_DOMAIN: &[u8] = b"aztec-history-account-v1";
const PUBLIC_KEY_DOMAIN: &[u8] = b"aztec-history-account-pub-v1";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}

/// Derive the account key pair for `address`.
pub fn derive_account_keys(address: &EthAddress) -> Result<AccountKeyPair, IdentityError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(ACCOUNT_KEY_DOMAIN)
        .map_err(|e| IdentityError::DerivationFailed(e.to_string()))?;
    mac.update(address.as_bytes());
    let mut output = mac.finalize().into_bytes();

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&output[..32]);
    output.as_mut_slice().zeroize();

    let private_key = AccountPrivateKey::new(secret);
    secret.zeroize();
    let public_key = public_key_for(&private_key);
    Ok(AccountKeyPair { public_key, private_key })
}

/// Public key for a private key. Needed when a user is added from its secret alone.
pub fn public_key_for(private_key: &AccountPrivateKey) -> AccountPublicKey {
    let mut hasher = Sha512::new();
    hasher.update(PUBLIC_KEY_DOMAIN);
    hasher.update(private_key.expose_secret());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&digest);
    AccountPublicKey::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> EthAddress {
        s.parse().expect("address")
    }

    #[test]
    fn test_derivation_deterministic() {
        let a = addr("0x9fb2b2a0a3e1e0d5c7b1a3c4d5e6f708192a3b4c");
        let k1 = derive_account_keys(&a).expect("should derive");
        let k2 = derive_account_keys(&a).expect("should derive");
        assert_eq!(k1.public_key, k2.public_key);
        assert_eq!(k1.private_key, k2.private_key);
    }

    #[test]
    fn test_distinct_addresses_distinct_keys() {
        let k1 = derive_account_keys(&addr("0x0000000000000000000000000000000000000001")).unwrap();
        let k2 = derive_account_keys(&addr("0x0000000000000000000000000000000000000002")).unwrap();
        assert_ne!(k1.public_key, k2.public_key);
    }

    #[test]
    fn test_public_key_matches_private() {
        let keys = derive_account_keys(&addr("0x00000000000000000000000000000000000000aa")).unwrap();
        assert_eq!(public_key_for(&keys.private_key), keys.public_key);
    }
}
