//! MemoryRollup - in-process rollup state shared by every client it creates.
//!
//! Holds on-chain registrations, per-account history and the client's local user
//! database. Local users outlive individual clients, so reconnecting finds the user
//! added by an earlier session, like the SDK's persistent local store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

use crate::identity;
use crate::network::Endpoint;
use crate::sdk::{
    AccountKeyPair, AccountPrivateKey, AccountPublicKey, ClientFactory, RollupClient,
    TransactionRecord, UserHandle, UserId,
};
use crate::wallet::{EthAddress, WalletProvider};

#[derive(Default)]
struct RollupState {
    registered: HashSet<AccountPublicKey>,
    local_users: HashSet<AccountPublicKey>,
    txs: HashMap<AccountPublicKey, Vec<TransactionRecord>>,
    users_added: usize,
}

pub struct MemoryRollup {
    state: Mutex<RollupState>,
    user_sync_open: watch::Sender<bool>,
    user_sync_calls: AtomicUsize,
    fail_key_derivation: AtomicBool,
    fail_account_lookup: AtomicBool,
    fail_add_user: AtomicBool,
    fail_user_sync: AtomicBool,
    fail_history: AtomicBool,
}

impl Default for MemoryRollup {
    fn default() -> Self { Self::new() }
}

impl MemoryRollup {
    pub fn new() -> Self {
        let (user_sync_open, _) = watch::channel(true);
        Self {
            state: Mutex::new(RollupState::default()),
            user_sync_open,
            user_sync_calls: AtomicUsize::new(0),
            fail_key_derivation: AtomicBool::new(false),
            fail_account_lookup: AtomicBool::new(false),
            fail_add_user: AtomicBool::new(false),
            fail_user_sync: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, RollupState>> {
        self.state.lock().map_err(|_| anyhow::anyhow!("rollup state lock"))
    }

    fn lookup(&self) -> anyhow::Result<MutexGuard<'_, RollupState>> {
        if self.fail_account_lookup.load(Ordering::SeqCst) {
            anyhow::bail!("account lookup failed");
        }
        self.lock()
    }

    /// Register the account derived from `address` on-chain, with its history.
    pub fn register_account(&self, address: &EthAddress, records: Vec<TransactionRecord>) -> anyhow::Result<AccountPublicKey> {
        let keys = identity::derive_account_keys(address)?;
        let mut state = self.lock()?;
        state.registered.insert(keys.public_key);
        state.txs.entry(keys.public_key).or_default().extend(records);
        Ok(keys.public_key)
    }

    pub fn push_transactions(&self, public_key: &AccountPublicKey, records: Vec<TransactionRecord>) -> anyhow::Result<()> {
        self.lock()?.txs.entry(*public_key).or_default().extend(records);
        Ok(())
    }

    /// Block `await_user_synchronised` until [`release_user_sync`](Self::release_user_sync).
    pub fn hold_user_sync(&self) {
        self.user_sync_open.send_replace(false);
    }

    pub fn release_user_sync(&self) {
        self.user_sync_open.send_replace(true);
    }

    pub fn set_fail_key_derivation(&self, fail: bool) {
        self.fail_key_derivation.store(fail, Ordering::SeqCst);
    }

    /// Break `is_account_registered`, `user_exists` and `get_user`.
    pub fn set_fail_account_lookup(&self, fail: bool) {
        self.fail_account_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_add_user(&self, fail: bool) {
        self.fail_add_user.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_user_sync(&self, fail: bool) {
        self.fail_user_sync.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn user_sync_calls(&self) -> usize {
        self.user_sync_calls.load(Ordering::SeqCst)
    }

    pub fn local_user_count(&self) -> usize {
        self.lock().map(|s| s.local_users.len()).unwrap_or(0)
    }

    /// Total `add_user` successes over the rollup's lifetime.
    pub fn users_added(&self) -> usize {
        self.lock().map(|s| s.users_added).unwrap_or(0)
    }
}

/// Client bound to one endpoint, backed by a shared [`MemoryRollup`].
pub struct MemoryClient {
    rollup: Arc<MemoryRollup>,
    endpoint: Endpoint,
    running: AtomicBool,
}

impl MemoryClient {
    pub fn new(rollup: Arc<MemoryRollup>, endpoint: Endpoint) -> Self {
        Self { rollup, endpoint, running: AtomicBool::new(false) }
    }

    pub fn endpoint(&self) -> &Endpoint { &self.endpoint }
}

#[async_trait]
impl RollupClient for MemoryClient {
    async fn run(&self) -> anyhow::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        debug!(url = %self.endpoint.rollup_provider_url, "Memory client running");
        Ok(())
    }

    async fn await_synchronised(&self) -> anyhow::Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            anyhow::bail!("client not running");
        }
        Ok(())
    }

    async fn generate_account_key_pair(&self, address: &EthAddress) -> anyhow::Result<AccountKeyPair> {
        if self.rollup.fail_key_derivation.load(Ordering::SeqCst) {
            anyhow::bail!("signature request denied");
        }
        Ok(identity::derive_account_keys(address)?)
    }

    async fn is_account_registered(&self, public_key: &AccountPublicKey) -> anyhow::Result<bool> {
        Ok(self.rollup.lookup()?.registered.contains(public_key))
    }

    async fn user_exists(&self, public_key: &AccountPublicKey) -> anyhow::Result<bool> {
        Ok(self.rollup.lookup()?.local_users.contains(public_key))
    }

    async fn get_user(&self, public_key: &AccountPublicKey) -> anyhow::Result<UserHandle> {
        if !self.rollup.lookup()?.local_users.contains(public_key) {
            anyhow::bail!("user not found: {}", public_key.short());
        }
        Ok(UserHandle { id: *public_key })
    }

    async fn add_user(&self, private_key: &AccountPrivateKey) -> anyhow::Result<UserHandle> {
        if self.rollup.fail_add_user.load(Ordering::SeqCst) {
            anyhow::bail!("local user database unavailable");
        }
        let public_key = identity::public_key_for(private_key);
        let mut state = self.rollup.lock()?;
        if !state.local_users.insert(public_key) {
            anyhow::bail!("user already exists: {}", public_key.short());
        }
        state.users_added += 1;
        Ok(UserHandle { id: public_key })
    }

    async fn await_user_synchronised(&self, user_id: &UserId) -> anyhow::Result<()> {
        self.rollup.user_sync_calls.fetch_add(1, Ordering::SeqCst);
        let mut open = self.rollup.user_sync_open.subscribe();
        open.wait_for(|open| *open)
            .await
            .map_err(|_| anyhow::anyhow!("rollup shut down"))?;
        if self.rollup.fail_user_sync.load(Ordering::SeqCst) {
            anyhow::bail!("note decryption failed");
        }
        if !self.rollup.lock()?.local_users.contains(user_id) {
            anyhow::bail!("unknown user: {}", user_id.short());
        }
        Ok(())
    }

    async fn get_user_txs(&self, public_key: &AccountPublicKey) -> anyhow::Result<Vec<TransactionRecord>> {
        if self.rollup.fail_history.load(Ordering::SeqCst) {
            anyhow::bail!("rollup provider unavailable");
        }
        Ok(self.rollup.lock()?.txs.get(public_key).cloned().unwrap_or_default())
    }
}

pub struct MemoryClientFactory {
    rollup: Arc<MemoryRollup>,
    created: AtomicUsize,
    fail_create: AtomicBool,
}

impl MemoryClientFactory {
    pub fn new(rollup: Arc<MemoryRollup>) -> Self {
        Self { rollup, created: AtomicUsize::new(0), fail_create: AtomicBool::new(false) }
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Clients constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for MemoryClientFactory {
    async fn create(&self, _wallet: Arc<dyn WalletProvider>, endpoint: &Endpoint) -> anyhow::Result<Arc<dyn RollupClient>> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("rollup provider unreachable: {}", endpoint.rollup_provider_url);
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryClient::new(self.rollup.clone(), endpoint.clone())))
    }
}
