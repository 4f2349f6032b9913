//! Aztec History: connect a wallet, bootstrap a synced Aztec Connect account, export its history.
//!
//! # Architecture
//!
//! ```text
//! SessionSupervisor (entry point)
//!   │
//!   ├── Bootstrapper
//!   │     ├── WalletProvider      (injected: accounts, chain id, switch events)
//!   │     ├── NetworkConfig       (chain id → rollup endpoint)
//!   │     └── ClientFactory       (injected: builds the RollupClient)
//!   │           └── RollupClient  (sync, keys, users, history)
//!   │
//!   ├── ActiveSession (current, invalidated on account switch)
//!   │
//!   └── HistoryExporter → HistoryTable (CSV / data URI / file)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |-----------|--------|-------------|
//! | connect | `supervisor.connect()` | Run the bootstrap state machine to `Ready` |
//! | current | `supervisor.current()` | Session that is still valid, if any |
//! | export | `supervisor.export()` | Fetch history once and build the CSV table |
//! | teardown | `supervisor.teardown()` | Invalidate the current session |
//! | watch | `supervisor.spawn_account_watch()` | Restart on wallet account switch |
//!
//! # Features
//!
//! - `native` - CLI binary, multi-threaded runtime, log subscriber, config dirs
//!
//! # Usage
//!
//! ```ignore
//! use aztec_history::{Bootstrapper, NetworkConfig, SessionSupervisor};
//!
//! let bootstrapper = Bootstrapper::new(wallet, factory, NetworkConfig::builtin());
//! let supervisor = SessionSupervisor::new(bootstrapper);
//! supervisor.spawn_account_watch();
//!
//! supervisor.connect().await?;
//! let table = supervisor.export().await?;
//! println!("{}", table.to_csv());
//! ```

pub mod export;
pub mod identity;
pub mod memory;
pub mod network;
pub mod sdk;
pub mod session;
pub mod wallet;

#[cfg(feature = "native")]
pub mod logging;

pub use export::{ExportError, ExportRow, HistoryExporter, HistoryTable};
pub use network::{Endpoint, NetworkConfig};
pub use sdk::{ClientFactory, RollupClient, TransactionRecord};
pub use session::{
    ActiveSession, BootstrapError, BootstrapOptions, BootstrapState, Bootstrapper, ErrorKind,
    SessionSupervisor,
};
pub use wallet::{EthAddress, WalletProvider};
