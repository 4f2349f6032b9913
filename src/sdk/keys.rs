//! Account (privacy) keys and local user handles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public half of the account key pair. Doubles as the user id on the rollup.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountPublicKey([u8; 64]);

impl AccountPublicKey {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Safe-to-log form: first 8 bytes only.
    pub fn short(&self) -> String {
        format!("0x{}...", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for AccountPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountPublicKey({})", self.short())
    }
}

impl FromStr for AccountPublicKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|e| format!("invalid public key hex: {e}"))?;
        let bytes: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("public key must be 64 bytes, got {}", bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(serde::de::Error::custom)
    }
}

/// Secret half of the account key pair. Never serialized, never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccountPrivateKey([u8; 32]);

impl AccountPrivateKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn expose_secret(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for AccountPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountPrivateKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeyPair {
    pub public_key: AccountPublicKey,
    pub private_key: AccountPrivateKey,
}

/// Local user id inside the client. The rollup identifies users by their account public key.
pub type UserId = AccountPublicKey;

/// SDK-side local user, obtained by lookup or creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserHandle {
    pub id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_debug_is_redacted() {
        let key = AccountPrivateKey::new([7u8; 32]);
        let printed = format!("{:?}", key);
        assert!(!printed.contains("07"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn public_key_debug_is_abbreviated() {
        let key = AccountPublicKey::new([0xab; 64]);
        assert_eq!(format!("{:?}", key), "AccountPublicKey(0xabababababababab...)");
        assert_eq!(key.to_string().len(), 2 + 128);
    }

    #[test]
    fn public_key_parses_display_form() {
        let key = AccountPublicKey::new([0x11; 64]);
        let parsed: AccountPublicKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("0x11".parse::<AccountPublicKey>().is_err());
    }
}
