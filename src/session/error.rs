use std::time::Duration;
use thiserror::Error;

/// Bootstrap failures. Every variant is terminal for the attempt; recovery is a new `connect()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("No wallet detected")]
    NoWalletDetected,

    #[error("Wallet connection rejected: {0}")]
    UserRejectedConnection(String),

    #[error("Unsupported network: chain id {0}")]
    UnsupportedNetwork(u64),

    #[error("Rollup client initialization failed: {0}")]
    SdkInitFailed(String),

    #[error("Account key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Account creation failed: {0}")]
    AccountCreationFailed(String),

    #[error("Account sync timed out after {0:?}")]
    SyncTimeout(Duration),

    #[error("Account sync failed: {0}")]
    SyncFailed(String),

    #[error("A bootstrap is already in progress")]
    InProgress,

    /// Torn down while in flight, or invalidated before the session could be handed out.
    #[error("Bootstrap superseded before the session was ready")]
    Superseded,
}

/// Fieldless mirror of [`BootstrapError`] for state reporting and user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoWalletDetected,
    UserRejectedConnection,
    UnsupportedNetwork,
    SdkInitFailed,
    KeyDerivationFailed,
    AccountCreationFailed,
    SyncTimeout,
    SyncFailed,
    InProgress,
    Superseded,
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BootstrapError::NoWalletDetected => ErrorKind::NoWalletDetected,
            BootstrapError::UserRejectedConnection(_) => ErrorKind::UserRejectedConnection,
            BootstrapError::UnsupportedNetwork(_) => ErrorKind::UnsupportedNetwork,
            BootstrapError::SdkInitFailed(_) => ErrorKind::SdkInitFailed,
            BootstrapError::KeyDerivationFailed(_) => ErrorKind::KeyDerivationFailed,
            BootstrapError::AccountCreationFailed(_) => ErrorKind::AccountCreationFailed,
            BootstrapError::SyncTimeout(_) => ErrorKind::SyncTimeout,
            BootstrapError::SyncFailed(_) => ErrorKind::SyncFailed,
            BootstrapError::InProgress => ErrorKind::InProgress,
            BootstrapError::Superseded => ErrorKind::Superseded,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoWalletDetected => "no_wallet_detected",
            ErrorKind::UserRejectedConnection => "user_rejected_connection",
            ErrorKind::UnsupportedNetwork => "unsupported_network",
            ErrorKind::SdkInitFailed => "sdk_init_failed",
            ErrorKind::KeyDerivationFailed => "key_derivation_failed",
            ErrorKind::AccountCreationFailed => "account_creation_failed",
            ErrorKind::SyncTimeout => "sync_timeout",
            ErrorKind::SyncFailed => "sync_failed",
            ErrorKind::InProgress => "in_progress",
            ErrorKind::Superseded => "superseded",
        }
    }

    /// What the user can do about it.
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorKind::NoWalletDetected => "Install and enable a browser wallet, then connect again.",
            ErrorKind::UserRejectedConnection => "Approve the connection request in your wallet.",
            ErrorKind::UnsupportedNetwork => "Switch your wallet to a supported network.",
            ErrorKind::SdkInitFailed => "The rollup provider could not be reached. Try connecting again.",
            ErrorKind::KeyDerivationFailed => "Your account keys could not be generated. Try connecting again.",
            ErrorKind::AccountCreationFailed => "Your account could not be loaded. Try connecting again.",
            ErrorKind::SyncTimeout => "Syncing is taking too long. Try connecting again later.",
            ErrorKind::SyncFailed => "Your account could not be synced. Try connecting again.",
            ErrorKind::InProgress => "Wait for the current connection attempt to finish.",
            ErrorKind::Superseded => "The session was reset, possibly by an account switch. Connect again.",
        }
    }
}

/// Flatten a collaborator error, keeping its context chain.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
