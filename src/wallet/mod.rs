//! Wallet provider seam - the browser/extension wallet the session is bootstrapped from.
//!
//! The provider is an external collaborator. Only the calls the bootstrapper needs are
//! modelled here:
//!
//! | Method | Description |
//! |--------|-------------|
//! | `is_present` | Is a wallet available at all |
//! | `request_accounts` | Ask the user for account access |
//! | `chain_id` | Chain the wallet is currently connected to |
//! | `accounts_changed` | Subscribe to account-switch events |
//!
//! Account switches are delivered as messages on a broadcast channel. Subscribers
//! treat every event as "tear down and restart".

mod address;

pub use address::{AddressError, EthAddress};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

/// Account-switch notification from the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountsChanged {
    pub accounts: Vec<EthAddress>,
}

/// Result of a successful wallet connect. Immutable; replaced wholesale on account switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletConnection {
    pub chain_id: u64,
    pub address: EthAddress,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_present(&self) -> bool;
    async fn request_accounts(&self) -> anyhow::Result<Vec<EthAddress>>;
    async fn chain_id(&self) -> anyhow::Result<u64>;
    fn accounts_changed(&self) -> broadcast::Receiver<AccountsChanged>;
}

/// Wait for the next account switch. `None` once the provider dropped its event channel.
///
/// A lagged receiver still means at least one switch happened, so it is reported as one.
pub async fn next_accounts_change(
    rx: &mut broadcast::Receiver<AccountsChanged>,
) -> Option<AccountsChanged> {
    match rx.recv().await {
        Ok(change) => Some(change),
        Err(RecvError::Lagged(_)) => Some(AccountsChanged { accounts: Vec::new() }),
        Err(RecvError::Closed) => None,
    }
}
