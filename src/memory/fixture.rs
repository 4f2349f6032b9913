//! JSON fixtures for seeding a [`MemoryRollup`].
//!
//! ```json
//! {
//!   "accounts": [
//!     {
//!       "address": "0x…",
//!       "registered": true,
//!       "transactions": [
//!         {"tx_id": "0x…", "proof_id": 3, "created": "2022-10-18T09:30:00Z",
//!          "body": {"shape": "payment", "value": {"asset_id": 0, "value": "100"},
//!                   "fee": {"asset_id": 0, "value": "5"}, "is_sender": true}}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Transactions omit `user_id`; it is filled with the account key derived from `address`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use super::MemoryRollup;
use crate::identity;
use crate::sdk::{ProofId, TransactionRecord, TxBody, TxId};
use crate::wallet::EthAddress;

#[derive(Debug, Clone, Deserialize)]
pub struct RollupFixture {
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    pub address: EthAddress,
    #[serde(default = "default_registered")]
    pub registered: bool,
    #[serde(default)]
    pub transactions: Vec<FixtureTx>,
}

fn default_registered() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTx {
    pub tx_id: TxId,
    pub proof_id: ProofId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub settled: Option<DateTime<Utc>>,
    pub body: TxBody,
}

impl RollupFixture {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("fixture read {}: {}", path.display(), e))?;
        Self::from_json_str(&raw)
    }

    /// Build a rollup holding every fixture account and its history.
    pub fn into_rollup(self) -> anyhow::Result<MemoryRollup> {
        let rollup = MemoryRollup::new();
        for account in self.accounts {
            let user_id = identity::derive_account_keys(&account.address)?.public_key;
            let records = account
                .transactions
                .into_iter()
                .map(|tx| TransactionRecord {
                    tx_id: tx.tx_id,
                    user_id,
                    proof_id: tx.proof_id,
                    created: tx.created,
                    settled: tx.settled,
                    body: tx.body,
                })
                .collect();
            if account.registered {
                rollup.register_account(&account.address, records)?;
            } else {
                rollup.push_transactions(&user_id, records)?;
            }
        }
        Ok(rollup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::RollupClient;

    #[test]
    fn fixture_seeds_history_under_derived_key() {
        let raw = format!(
            r#"{{"accounts": [{{
                "address": "0x00000000000000000000000000000000000000aa",
                "transactions": [
                    {{"tx_id": "0x{}", "proof_id": 4, "body": {{"shape": "account"}}}},
                    {{"tx_id": "0x{}", "proof_id": 1, "created": "2022-10-18T09:30:00Z", "body": {{"shape": "opaque"}}}}
                ]
            }}]}}"#,
            "aa".repeat(32),
            "bb".repeat(32),
        );
        let rollup = std::sync::Arc::new(RollupFixture::from_json_str(&raw).unwrap().into_rollup().unwrap());
        let address: EthAddress = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let pk = identity::derive_account_keys(&address).unwrap().public_key;

        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async {
            let client = super::super::MemoryClient::new(rollup, crate::network::Endpoint::new("memory://"));
            assert!(client.is_account_registered(&pk).await.unwrap());
            let txs = client.get_user_txs(&pk).await.unwrap();
            assert_eq!(txs.len(), 2);
            assert!(txs.iter().all(|t| t.user_id == pk));
            assert_eq!(txs[0].proof_id, ProofId::Account);
        });
    }

    #[test]
    fn empty_fixture() {
        let fixture = RollupFixture::from_json_str("{}").unwrap();
        assert!(fixture.accounts.is_empty());
    }
}
