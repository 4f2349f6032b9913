//! User transaction records as returned by the rollup client.
//!
//! Two independent discriminations live on every record:
//!
//! - [`ProofId`] - which kind of rollup proof produced it (drives the type label)
//! - [`TxBody`] - the record's shape; only [`TxBody::Payment`] carries monetary fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::keys::UserId;

/// Rollup proof kind. Unknown tags are kept rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ProofId {
    Deposit,
    Withdrawal,
    Send,
    Account,
    DefiDeposit,
    DefiClaim,
    Unknown(u32),
}

impl From<u32> for ProofId {
    fn from(tag: u32) -> Self {
        match tag {
            1 => ProofId::Deposit,
            2 => ProofId::Withdrawal,
            3 => ProofId::Send,
            4 => ProofId::Account,
            5 => ProofId::DefiDeposit,
            6 => ProofId::DefiClaim,
            other => ProofId::Unknown(other),
        }
    }
}

impl From<ProofId> for u32 {
    fn from(id: ProofId) -> Self {
        match id {
            ProofId::Deposit => 1,
            ProofId::Withdrawal => 2,
            ProofId::Send => 3,
            ProofId::Account => 4,
            ProofId::DefiDeposit => 5,
            ProofId::DefiClaim => 6,
            ProofId::Unknown(tag) => tag,
        }
    }
}

impl ProofId {
    /// Export label. Unknown kinds map to an empty label.
    pub fn label(&self) -> &'static str {
        match self {
            ProofId::Deposit => "Deposit",
            ProofId::Withdrawal => "Withdrawal",
            ProofId::Send => "Send",
            ProofId::Account => "Account",
            ProofId::DefiDeposit => "Defi Deposit",
            ProofId::DefiClaim => "Defi Claim",
            ProofId::Unknown(_) => "",
        }
    }
}

/// 32-byte rollup transaction id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    pub const fn new(bytes: [u8; 32]) -> Self { Self(bytes) }
    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

impl FromStr for TxId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x")).map_err(|e| format!("invalid tx id hex: {e}"))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("tx id must be 32 bytes, got {}", bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetValue {
    pub asset_id: u32,
    /// Base units. Serialized as a decimal string; amounts routinely exceed 2^64.
    #[serde(with = "amount")]
    pub value: u128,
}

impl AssetValue {
    pub fn new(asset_id: u32, value: u128) -> Self { Self { asset_id, value } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFields {
    pub value: AssetValue,
    pub fee: AssetValue,
    pub is_sender: bool,
}

/// Record shape, independent of the proof kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TxBody {
    Payment(PaymentFields),
    Account,
    Defi,
    Opaque,
}

impl TxBody {
    pub fn payment(&self) -> Option<&PaymentFields> {
        match self {
            TxBody::Payment(fields) => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_id: TxId,
    pub user_id: UserId,
    pub proof_id: ProofId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// `None` until the rollup containing the tx settles on L1.
    #[serde(default)]
    pub settled: Option<DateTime<Utc>>,
    pub body: TxBody,
}

mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n as u128),
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_id_tags() {
        assert_eq!(ProofId::from(1), ProofId::Deposit);
        assert_eq!(ProofId::from(6), ProofId::DefiClaim);
        assert_eq!(ProofId::from(0), ProofId::Unknown(0));
        assert_eq!(u32::from(ProofId::Unknown(42)), 42);
        assert_eq!(ProofId::DefiDeposit.label(), "Defi Deposit");
        assert_eq!(ProofId::Unknown(9).label(), "");
    }

    #[test]
    fn wide_proof_tag_stays_unknown() {
        let id: ProofId = serde_json::from_str("300").unwrap();
        assert_eq!(id, ProofId::Unknown(300));
        assert_eq!(id.label(), "");
        assert_eq!(serde_json::to_string(&id).unwrap(), "300");
    }

    #[test]
    fn record_from_json() {
        let raw = format!(
            r#"{{
                "tx_id": "0x{}",
                "user_id": "0x{}",
                "proof_id": 3,
                "created": "2022-10-18T12:00:00Z",
                "body": {{"shape": "payment", "value": {{"asset_id": 0, "value": "100000000000000000000"}}, "fee": {{"asset_id": 0, "value": 5}}, "is_sender": true}}
            }}"#,
            "01".repeat(32),
            "02".repeat(64),
        );
        let record: TransactionRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.proof_id, ProofId::Send);
        assert!(record.settled.is_none());
        let payment = record.body.payment().unwrap();
        assert_eq!(payment.value.value, 100_000_000_000_000_000_000);
        assert_eq!(payment.fee.value, 5);
    }

    #[test]
    fn non_payment_body_has_no_fields() {
        let body: TxBody = serde_json::from_str(r#"{"shape": "account"}"#).unwrap();
        assert_eq!(body, TxBody::Account);
        assert!(body.payment().is_none());
    }
}
