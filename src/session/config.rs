//! Bootstrap options - passed from higher layers

use std::time::Duration;

/// Sync on a fresh client can take minutes.
const DEFAULT_CLIENT_SYNC_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_USER_SYNC_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub client_sync_timeout: Duration,
    pub user_sync_timeout: Duration,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            client_sync_timeout: DEFAULT_CLIENT_SYNC_TIMEOUT,
            user_sync_timeout: DEFAULT_USER_SYNC_TIMEOUT,
        }
    }
}

impl BootstrapOptions {
    pub fn with_client_sync_timeout(mut self, t: Duration) -> Self { self.client_sync_timeout = t; self }
    pub fn with_user_sync_timeout(mut self, t: Duration) -> Self { self.user_sync_timeout = t; self }
}
