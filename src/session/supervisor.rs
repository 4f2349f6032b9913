//! SessionSupervisor - owns the single current session and restarts on account switch.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ActiveSession, BootstrapError, Bootstrapper};
use crate::export::{ExportError, HistoryExporter, HistoryTable};
use crate::wallet::next_accounts_change;

pub struct SessionSupervisor {
    bootstrapper: Bootstrapper,
    exporter: HistoryExporter,
    current: RwLock<Option<ActiveSession>>,
}

impl SessionSupervisor {
    pub fn new(bootstrapper: Bootstrapper) -> Arc<Self> {
        Arc::new(Self {
            bootstrapper,
            exporter: HistoryExporter::default(),
            current: RwLock::new(None),
        })
    }

    pub fn bootstrapper(&self) -> &Bootstrapper { &self.bootstrapper }

    /// Bootstrap and install the result as the current session.
    ///
    /// A session invalidated between `Ready` and installation is never returned;
    /// the call fails with [`BootstrapError::Superseded`] instead.
    pub async fn connect(&self) -> Result<ActiveSession, BootstrapError> {
        let session = self.bootstrapper.connect().await?;
        let mut slot = self.current.write().await;
        if !session.is_current() {
            debug!(generation = session.generation(), "Bootstrapped session went stale before install");
            return Err(BootstrapError::Superseded);
        }
        *slot = Some(session.clone());
        Ok(session)
    }

    /// The current session, if one is ready and has not been invalidated.
    pub async fn current(&self) -> Option<ActiveSession> {
        self.current.read().await.as_ref().filter(|s| s.is_current()).cloned()
    }

    /// Export history for the current session.
    pub async fn export(&self) -> Result<HistoryTable, ExportError> {
        let session = self.current().await.ok_or(ExportError::NoSession)?;
        self.exporter.export(&session).await
    }

    /// Invalidate and drop the current session, cancelling an in-flight bootstrap.
    pub async fn teardown(&self) {
        self.bootstrapper.invalidate();
        if let Some(old) = self.current.write().await.take() {
            debug!(generation = old.generation(), "Dropped session");
        }
    }

    /// Watch the wallet for account switches: each one expires the current session and
    /// bootstraps again from `Idle`. An in-flight bootstrap sees the same switch and
    /// restarts itself, so it is left running. Ends when the wallet drops its event channel.
    pub fn spawn_account_watch(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut switches = this.bootstrapper.wallet().accounts_changed();
        tokio::spawn(async move {
            while let Some(change) = next_accounts_change(&mut switches).await {
                info!(accounts = change.accounts.len(), "Wallet account switched, restarting session");
                this.bootstrapper.expire_sessions();
                if let Some(old) = this.current.write().await.take() {
                    debug!(generation = old.generation(), "Dropped session");
                }
                if this.bootstrapper.is_connecting() {
                    debug!("Bootstrap in flight, it restarts for the new account");
                    continue;
                }
                match this.connect().await {
                    Ok(session) => info!(address = %session.address().short(), "Session restored after switch"),
                    Err(BootstrapError::InProgress) => debug!("Bootstrap already in flight"),
                    Err(e) => warn!(kind = e.kind().as_str(), "Reconnect after switch failed: {}", e),
                }
            }
            debug!("Wallet event channel closed");
        })
    }
}
