//! Session - wallet connection → account keys → local user → synced, ready session.
//!
//! # Lifecycle
//!
//! ```text
//! Bootstrapper::connect()
//!     │  Idle → WalletDetecting → WalletConnecting → NetworkResolving
//!     │       → SdkInitializing → KeyDeriving → AccountResolving
//!     │       → UserSynchronizing → Ready
//!     ▼
//! ActiveSession (generation N)  ──read──▶  HistoryExporter
//!     │
//!     └── account switch / new connect ──▶ epoch N+1, session N no longer current
//! ```
//!
//! Only the bootstrapper creates sessions. A session never changes after creation;
//! invalidation is observed through [`ActiveSession::is_current`].

mod bootstrap;
mod config;
mod error;
mod state;
mod supervisor;

pub use bootstrap::Bootstrapper;
pub use config::BootstrapOptions;
pub use error::{BootstrapError, ErrorKind};
pub use state::BootstrapState;
pub use supervisor::SessionSupervisor;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::sdk::{AccountKeyPair, AccountPublicKey, RollupClient, UserHandle};
use crate::wallet::{EthAddress, WalletConnection};

/// Monotonic bootstrap generation. Advancing it invalidates every older session.
#[derive(Debug, Default)]
pub(crate) struct SessionEpoch {
    current: AtomicU64,
}

impl SessionEpoch {
    pub(crate) fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current.load(Ordering::SeqCst) == generation
    }
}

/// A fully bootstrapped, synchronized account session.
#[derive(Clone)]
pub struct ActiveSession {
    wallet: WalletConnection,
    keys: Arc<AccountKeyPair>,
    user: UserHandle,
    registered: bool,
    synchronized: bool,
    client: Arc<dyn RollupClient>,
    generation: u64,
    epoch: Arc<SessionEpoch>,
}

impl ActiveSession {
    pub fn wallet(&self) -> &WalletConnection { &self.wallet }
    pub fn address(&self) -> EthAddress { self.wallet.address }
    pub fn chain_id(&self) -> u64 { self.wallet.chain_id }
    pub fn public_key(&self) -> &AccountPublicKey { &self.keys.public_key }
    pub fn user(&self) -> &UserHandle { &self.user }
    /// Whether the account is registered on-chain (not just known locally).
    pub fn is_registered(&self) -> bool { self.registered }
    pub fn is_synchronized(&self) -> bool { self.synchronized }
    pub fn generation(&self) -> u64 { self.generation }

    /// False once the wallet switched accounts or a newer bootstrap started.
    pub fn is_current(&self) -> bool {
        self.epoch.is_current(self.generation)
    }

    pub(crate) fn client(&self) -> &Arc<dyn RollupClient> {
        &self.client
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("wallet", &self.wallet)
            .field("public_key", &self.keys.public_key)
            .field("registered", &self.registered)
            .field("synchronized", &self.synchronized)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_advances_invalidate_older_generations() {
        let epoch = SessionEpoch::default();
        let first = epoch.advance();
        assert!(epoch.is_current(first));
        let second = epoch.advance();
        assert!(!epoch.is_current(first));
        assert!(epoch.is_current(second));
    }
}
