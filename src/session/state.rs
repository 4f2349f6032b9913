use super::error::ErrorKind;

/// Bootstrap progress. Strictly linear; `Failed` and `Ready` end an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BootstrapState {
    #[default]
    Idle,
    WalletDetecting,
    WalletConnecting,
    NetworkResolving,
    SdkInitializing,
    KeyDeriving,
    AccountResolving,
    UserSynchronizing,
    Ready,
    Failed(ErrorKind),
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::Idle => "idle",
            BootstrapState::WalletDetecting => "wallet_detecting",
            BootstrapState::WalletConnecting => "wallet_connecting",
            BootstrapState::NetworkResolving => "network_resolving",
            BootstrapState::SdkInitializing => "sdk_initializing",
            BootstrapState::KeyDeriving => "key_deriving",
            BootstrapState::AccountResolving => "account_resolving",
            BootstrapState::UserSynchronizing => "user_synchronizing",
            BootstrapState::Ready => "ready",
            BootstrapState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::Failed(_))
    }

    /// True while an attempt is between `Idle` and a terminal state.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal() && *self != BootstrapState::Idle
    }
}
