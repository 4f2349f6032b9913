//! In-memory collaborators - wallet, rollup and client factory without a browser or network.
//!
//! Used by the test-suite and by the CLI to replay exports from JSON fixtures.
//!
//! ```text
//! MemoryWallet ──accounts / chain id / switch events──▶ Bootstrapper
//!                                                           │
//! MemoryClientFactory ──create()──▶ MemoryClient ◀──────────┘
//!                                       │
//!                                       ▼
//!                                  MemoryRollup (registrations, local users, history)
//! ```

mod fixture;
mod rollup;
mod wallet;

pub use fixture::{FixtureAccount, FixtureTx, RollupFixture};
pub use rollup::{MemoryClient, MemoryClientFactory, MemoryRollup};
pub use wallet::MemoryWallet;
