//! Rollup SDK seam - client construction, account keys, local users, history.
//!
//! # Architecture
//!
//! ```text
//! ClientFactory::create(wallet, endpoint)
//!     │
//!     ▼
//! RollupClient
//!     ├── run / await_synchronised            (client-level sync)
//!     ├── generate_account_key_pair(address)  (deterministic, local)
//!     ├── is_account_registered / user_exists / get_user / add_user
//!     ├── await_user_synchronised(user_id)    (per-user sync)
//!     └── get_user_txs(public_key)            (history)
//! ```
//!
//! Everything behind these traits (proof construction, note decryption, the sync
//! algorithm) belongs to the SDK and is out of scope here.

mod keys;
mod tx;

pub use keys::{AccountKeyPair, AccountPrivateKey, AccountPublicKey, UserHandle, UserId};
pub use tx::{AssetValue, PaymentFields, ProofId, TransactionRecord, TxBody, TxId};

use async_trait::async_trait;
use std::sync::Arc;

use crate::network::Endpoint;
use crate::wallet::{EthAddress, WalletProvider};

#[async_trait]
pub trait RollupClient: Send + Sync {
    /// Start background sync against the rollup provider.
    async fn run(&self) -> anyhow::Result<()>;
    async fn await_synchronised(&self) -> anyhow::Result<()>;

    async fn generate_account_key_pair(&self, address: &EthAddress) -> anyhow::Result<AccountKeyPair>;
    async fn is_account_registered(&self, public_key: &AccountPublicKey) -> anyhow::Result<bool>;
    async fn user_exists(&self, public_key: &AccountPublicKey) -> anyhow::Result<bool>;
    async fn get_user(&self, public_key: &AccountPublicKey) -> anyhow::Result<UserHandle>;
    async fn add_user(&self, private_key: &AccountPrivateKey) -> anyhow::Result<UserHandle>;
    async fn await_user_synchronised(&self, user_id: &UserId) -> anyhow::Result<()>;

    async fn get_user_txs(&self, public_key: &AccountPublicKey) -> anyhow::Result<Vec<TransactionRecord>>;
}

#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        wallet: Arc<dyn WalletProvider>,
        endpoint: &Endpoint,
    ) -> anyhow::Result<Arc<dyn RollupClient>>;
}
