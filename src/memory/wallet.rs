//! MemoryWallet - scriptable wallet provider.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::wallet::{AccountsChanged, EthAddress, WalletProvider};

const EVENT_CAPACITY: usize = 16;

pub struct MemoryWallet {
    present: AtomicBool,
    rejecting: AtomicBool,
    accounts: Mutex<Vec<EthAddress>>,
    chain_id: AtomicU64,
    events: Mutex<Option<broadcast::Sender<AccountsChanged>>>,
    calls: AtomicUsize,
}

impl MemoryWallet {
    pub fn new(address: EthAddress, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            present: AtomicBool::new(true),
            rejecting: AtomicBool::new(false),
            accounts: Mutex::new(vec![address]),
            chain_id: AtomicU64::new(chain_id),
            events: Mutex::new(Some(events)),
            calls: AtomicUsize::new(0),
        }
    }

    /// No wallet installed.
    pub fn absent() -> Self {
        let wallet = Self::new(EthAddress::new([0u8; 20]), 0);
        wallet.present.store(false, Ordering::SeqCst);
        wallet
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    /// Switch the selected account and notify subscribers.
    pub fn switch_account(&self, address: EthAddress) {
        let accounts = {
            let mut guard = self.accounts.lock().unwrap_or_else(|p| p.into_inner());
            *guard = vec![address];
            guard.clone()
        };
        debug!(address = %address.short(), "Wallet account switched");
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = events.as_ref() {
            let _ = tx.send(AccountsChanged { accounts });
        }
    }

    /// Drop the event channel; current subscribers see it close.
    pub fn close_events(&self) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).take();
    }

    /// Number of provider round-trips (`request_accounts` + `chain_id`).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MemoryWallet {
    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    async fn request_accounts(&self) -> anyhow::Result<Vec<EthAddress>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rejecting.load(Ordering::SeqCst) {
            anyhow::bail!("User rejected the request");
        }
        let guard = self.accounts.lock().map_err(|_| anyhow::anyhow!("lock"))?;
        Ok(guard.clone())
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    fn accounts_changed(&self) -> broadcast::Receiver<AccountsChanged> {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        match events.as_ref() {
            Some(tx) => tx.subscribe(),
            // Already closed: hand out a receiver whose sender is gone.
            None => broadcast::channel(1).1,
        }
    }
}
