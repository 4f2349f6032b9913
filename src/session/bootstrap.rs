//! Bootstrapper - the linear connect state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::error::describe;
use super::{ActiveSession, BootstrapError, BootstrapOptions, BootstrapState, SessionEpoch};
use crate::network::NetworkConfig;
use crate::sdk::ClientFactory;
use crate::wallet::{next_accounts_change, WalletConnection, WalletProvider};

pub struct Bootstrapper {
    wallet: Arc<dyn WalletProvider>,
    factory: Arc<dyn ClientFactory>,
    networks: NetworkConfig,
    options: BootstrapOptions,
    state: watch::Sender<BootstrapState>,
    gate: Mutex<()>,
    connecting: AtomicBool,
    cancel: Notify,
    epoch: Arc<SessionEpoch>,
}

/// Clears the connecting flag when `connect()` returns or is dropped.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Bootstrapper {
    pub fn new(wallet: Arc<dyn WalletProvider>, factory: Arc<dyn ClientFactory>, networks: NetworkConfig) -> Self {
        let (state, _) = watch::channel(BootstrapState::Idle);
        Self {
            wallet,
            factory,
            networks,
            options: BootstrapOptions::default(),
            state,
            gate: Mutex::new(()),
            connecting: AtomicBool::new(false),
            cancel: Notify::new(),
            epoch: Arc::new(SessionEpoch::default()),
        }
    }

    pub fn with_options(mut self, options: BootstrapOptions) -> Self { self.options = options; self }

    pub fn wallet(&self) -> &Arc<dyn WalletProvider> { &self.wallet }
    pub fn networks(&self) -> &NetworkConfig { &self.networks }
    pub fn options(&self) -> &BootstrapOptions { &self.options }

    pub fn state(&self) -> BootstrapState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    /// True while a `connect()` call holds the bootstrap.
    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::SeqCst)
    }

    /// Tear down: every session handed out so far stops being current, and an
    /// in-flight `connect()` ends with [`BootstrapError::Superseded`].
    pub fn invalidate(&self) {
        let generation = self.expire_sessions();
        self.cancel.notify_waiters();
        debug!(generation, "Session invalidated");
        if !self.is_connecting() {
            self.enter(BootstrapState::Idle);
        }
    }

    /// Make every handed-out session stale without cancelling an in-flight `connect()`.
    /// A running attempt whose result goes stale starts over.
    pub fn expire_sessions(&self) -> u64 {
        self.epoch.advance()
    }

    /// Run the full bootstrap. Rejects with [`BootstrapError::InProgress`] if one is already running.
    ///
    /// An account switch observed while in flight drops the attempt and restarts from `Idle`.
    /// [`invalidate`](Self::invalidate) while in flight ends it with [`BootstrapError::Superseded`].
    pub async fn connect(&self) -> Result<ActiveSession, BootstrapError> {
        let _gate = self.gate.try_lock().map_err(|_| {
            warn!("Connect requested while a bootstrap is in flight");
            BootstrapError::InProgress
        })?;
        self.connecting.store(true, Ordering::SeqCst);
        let _connecting = ConnectingGuard(&self.connecting);
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        let mut switches = self.wallet.accounts_changed();
        let mut switches_open = true;

        'restart: loop {
            let generation = self.epoch.advance();
            self.enter(BootstrapState::Idle);
            let attempt = self.attempt(generation);
            tokio::pin!(attempt);

            let result = loop {
                tokio::select! {
                    biased;
                    _ = &mut cancelled => break Err(BootstrapError::Superseded),
                    change = next_accounts_change(&mut switches), if switches_open => {
                        if change.is_some() {
                            warn!(generation, "Wallet account switched mid-bootstrap, restarting");
                            continue 'restart;
                        }
                        // No switch can arrive any more; keep awaiting the same attempt.
                        debug!(generation, "Wallet event channel closed");
                        switches_open = false;
                    }
                    result = &mut attempt => break result,
                }
            };

            if result.is_ok() && !self.epoch.is_current(generation) {
                debug!(generation, "Discarding stale bootstrap result");
                continue;
            }
            return self.finish(generation, result);
        }
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<ActiveSession, BootstrapError>,
    ) -> Result<ActiveSession, BootstrapError> {
        match &result {
            Ok(session) => {
                self.enter(BootstrapState::Ready);
                info!(
                    generation,
                    address = %session.address().short(),
                    chain_id = session.chain_id(),
                    registered = session.is_registered(),
                    "Session ready"
                );
            }
            Err(BootstrapError::Superseded) => {
                self.enter(BootstrapState::Idle);
                info!(generation, "Bootstrap cancelled by teardown");
            }
            Err(e) => {
                self.enter(BootstrapState::Failed(e.kind()));
                warn!(generation, kind = e.kind().as_str(), "Bootstrap failed: {}", e);
            }
        }
        result
    }

    async fn attempt(&self, generation: u64) -> Result<ActiveSession, BootstrapError> {
        self.enter(BootstrapState::WalletDetecting);
        if !self.wallet.is_present() {
            return Err(BootstrapError::NoWalletDetected);
        }

        self.enter(BootstrapState::WalletConnecting);
        let accounts = self
            .wallet
            .request_accounts()
            .await
            .map_err(|e| BootstrapError::UserRejectedConnection(describe(&e)))?;
        let address = *accounts
            .first()
            .ok_or_else(|| BootstrapError::UserRejectedConnection("wallet returned no accounts".into()))?;

        self.enter(BootstrapState::NetworkResolving);
        let chain_id = self
            .wallet
            .chain_id()
            .await
            .map_err(|e| BootstrapError::UserRejectedConnection(format!("chain id unavailable: {}", describe(&e))))?;
        let endpoint = self
            .networks
            .get(chain_id)
            .cloned()
            .ok_or(BootstrapError::UnsupportedNetwork(chain_id))?;
        let wallet = WalletConnection { chain_id, address };
        debug!(chain_id, url = %endpoint.rollup_provider_url, "Resolved network");

        self.enter(BootstrapState::SdkInitializing);
        let sdk_failed = |e: anyhow::Error| BootstrapError::SdkInitFailed(describe(&e));
        let client = self.factory.create(self.wallet.clone(), &endpoint).await.map_err(sdk_failed)?;
        client.run().await.map_err(sdk_failed)?;
        timeout(self.options.client_sync_timeout, client.await_synchronised())
            .await
            .map_err(|_| {
                BootstrapError::SdkInitFailed(format!(
                    "client sync timed out after {:?}",
                    self.options.client_sync_timeout
                ))
            })?
            .map_err(sdk_failed)?;
        info!("Rollup client synchronised");

        self.enter(BootstrapState::KeyDeriving);
        let keys = client
            .generate_account_key_pair(&address)
            .await
            .map_err(|e| BootstrapError::KeyDerivationFailed(describe(&e)))?;
        info!(public_key = %keys.public_key.short(), "Derived account keys");

        self.enter(BootstrapState::AccountResolving);
        let account_failed = |e: anyhow::Error| BootstrapError::AccountCreationFailed(describe(&e));
        let registered = client.is_account_registered(&keys.public_key).await.map_err(account_failed)?;
        let user = if client.user_exists(&keys.public_key).await.map_err(account_failed)? {
            debug!("Restoring existing local user");
            client.get_user(&keys.public_key).await.map_err(account_failed)?
        } else {
            debug!("Adding new local user");
            client.add_user(&keys.private_key).await.map_err(account_failed)?
        };

        self.enter(BootstrapState::UserSynchronizing);
        match timeout(self.options.user_sync_timeout, client.await_user_synchronised(&user.id)).await {
            Err(_) => return Err(BootstrapError::SyncTimeout(self.options.user_sync_timeout)),
            Ok(Err(e)) => return Err(BootstrapError::SyncFailed(describe(&e))),
            Ok(Ok(())) => {}
        }

        Ok(ActiveSession {
            wallet,
            keys: Arc::new(keys),
            user,
            registered,
            synchronized: true,
            client,
            generation,
            epoch: self.epoch.clone(),
        })
    }

    fn enter(&self, state: BootstrapState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = previous.as_str(), to = state.as_str(), "Bootstrap state");
        }
    }
}
