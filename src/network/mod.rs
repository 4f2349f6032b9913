//! Network resolution - which rollup endpoint serves a given chain.

mod config;

pub use config::{
    parse_chain_id, ConfigError, Endpoint, NetworkConfig, MAINNET_CHAIN_ID, NETWORKS_ENV,
    TESTNET_CHAIN_ID,
};
