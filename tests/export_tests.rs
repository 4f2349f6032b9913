//! Integration Tests: history export and configuration files
//!
//! These tests verify:
//! 1. Fixture-seeded sessions export one row per record plus the header
//! 2. Export refuses without a session and surfaces fetch failures
//! 3. Network files overlay the builtin table (flag and env lookup)

use aztec_history::memory::{MemoryClientFactory, MemoryRollup, MemoryWallet, RollupFixture};
use aztec_history::network::{NetworkConfig, MAINNET_CHAIN_ID, NETWORKS_ENV, TESTNET_CHAIN_ID};
use aztec_history::{Bootstrapper, EthAddress, ExportError, SessionSupervisor, HistoryExporter};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}

const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

fn fixture_json() -> String {
    format!(
        r#"{{"accounts": [{{
            "address": "{account}",
            "transactions": [
                {{"tx_id": "0x{a}", "proof_id": 1, "created": "2022-10-18T09:30:00Z",
                  "body": {{"shape": "opaque"}}}},
                {{"tx_id": "0x{b}", "proof_id": 3, "created": "2022-10-18T10:00:00Z",
                  "settled": "2022-10-19T01:00:00Z",
                  "body": {{"shape": "payment", "value": {{"asset_id": 0, "value": "100"}},
                            "fee": {{"asset_id": 0, "value": "5"}}, "is_sender": true}}}},
                {{"tx_id": "0x{c}", "proof_id": 42, "body": {{"shape": "opaque"}}}}
            ]
        }}]}}"#,
        account = ACCOUNT,
        a = "0a".repeat(32),
        b = "0b".repeat(32),
        c = "0c".repeat(32),
    )
}

fn supervisor_for(rollup: MemoryRollup) -> (Arc<SessionSupervisor>, Arc<MemoryRollup>) {
    let address: EthAddress = ACCOUNT.parse().unwrap();
    let rollup = Arc::new(rollup);
    let wallet = Arc::new(MemoryWallet::new(address, MAINNET_CHAIN_ID));
    let factory = Arc::new(MemoryClientFactory::new(rollup.clone()));
    let bootstrapper = Bootstrapper::new(wallet, factory, NetworkConfig::builtin());
    (SessionSupervisor::new(bootstrapper), rollup)
}

/// Test: fixture file → bootstrap → CSV with header plus one row per record
#[test]
fn export_from_fixture_file() {
    let dir = TempDir::new().expect("tempdir");
    let fixture_path = dir.path().join("history.json");
    std::fs::write(&fixture_path, fixture_json()).unwrap();

    let rollup = RollupFixture::load(&fixture_path).unwrap().into_rollup().unwrap();
    let (supervisor, _) = supervisor_for(rollup);

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        let session = supervisor.connect().await.expect("connect");
        assert!(session.is_registered());

        let table = supervisor.export().await.expect("export");
        assert_eq!(table.record_count(), 3);
        assert_eq!(table.rows().len(), 4);

        let csv = table.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("Ethereum account,Aztec userId,txId,"));
        for line in &lines {
            assert_eq!(line.split(',').count(), 10);
        }

        let deposit: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(deposit[0], session.address().to_checksum());
        assert!(deposit[0].eq_ignore_ascii_case(ACCOUNT));
        assert_eq!(deposit[3], "Tue Oct 18 2022");
        assert_eq!(deposit[4], "");
        assert_eq!(&deposit[5..], &["Deposit", "", "", "", ""]);

        let send: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(send[1], session.public_key().to_string());
        assert_eq!(send[4], "Wed Oct 19 2022");
        assert_eq!(&send[5..], &["Send", "0", "100", "5", "true"]);

        // Unknown kind tag: empty label, empty dates.
        let unknown: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(&unknown[3..6], &["", "", ""]);

        let out = dir.path().join("out").join(table.file_name());
        table.write_to(&out).expect("write");
        assert_eq!(std::fs::read_to_string(&out).unwrap(), csv);
    });
}

/// Test: account column and file name follow the EIP-55 checksum
#[test]
fn export_uses_checksummed_address() {
    let checksummed = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    let raw = format!(
        r#"{{"accounts": [{{"address": "{}", "transactions": [
            {{"tx_id": "0x{}", "proof_id": 2, "body": {{"shape": "opaque"}}}}]}}]}}"#,
        checksummed.to_lowercase(),
        "0d".repeat(32)
    );
    let rollup = Arc::new(RollupFixture::from_json_str(&raw).unwrap().into_rollup().unwrap());
    let address: EthAddress = checksummed.to_lowercase().parse().unwrap();
    let wallet = Arc::new(MemoryWallet::new(address, MAINNET_CHAIN_ID));
    let factory = Arc::new(MemoryClientFactory::new(rollup));
    let supervisor = SessionSupervisor::new(Bootstrapper::new(wallet, factory, NetworkConfig::builtin()));

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        supervisor.connect().await.expect("connect");
        let table = supervisor.export().await.expect("export");
        let csv = table.to_csv();
        let row: Vec<&str> = csv.lines().nth(1).expect("row").split(',').collect();
        assert_eq!(row[0], checksummed);
        assert_eq!(table.file_name(), format!("aztec-history-{}.csv", checksummed));
    });
}

/// Test: proof kind tags beyond a byte still load and export with an empty type
#[test]
fn wide_proof_tag_exports_unlabelled() {
    let raw = format!(
        r#"{{"accounts": [{{"address": "{}", "transactions": [
            {{"tx_id": "0x{}", "proof_id": 300, "created": "2022-10-18T09:30:00Z",
              "body": {{"shape": "opaque"}}}}]}}]}}"#,
        ACCOUNT,
        "0e".repeat(32)
    );
    let rollup = RollupFixture::from_json_str(&raw).unwrap().into_rollup().unwrap();
    let (supervisor, _) = supervisor_for(rollup);

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        supervisor.connect().await.expect("connect");
        let table = supervisor.export().await.expect("export");
        assert_eq!(table.record_count(), 1);
        let csv = table.to_csv();
        let row: Vec<&str> = csv.lines().nth(1).expect("row").split(',').collect();
        assert_eq!(row[3], "Tue Oct 18 2022");
        assert_eq!(row[5], "");
    });
}

/// Test: exporting before any session exists
#[test]
fn export_without_session() {
    let (supervisor, _) = supervisor_for(MemoryRollup::new());
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        assert!(matches!(supervisor.export().await, Err(ExportError::NoSession)));
    });
}

/// Test: account with no history exports the header alone
#[test]
fn export_empty_history() {
    let (supervisor, _) = supervisor_for(MemoryRollup::new());
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        supervisor.connect().await.expect("connect");
        let table = supervisor.export().await.expect("export");
        assert_eq!(table.record_count(), 0);
        assert_eq!(table.to_csv().lines().count(), 1);
    });
}

/// Test: history fetch failure aborts the export; a later retry succeeds
#[test]
fn history_fetch_failure() {
    let (supervisor, rollup) = supervisor_for(MemoryRollup::new());
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        supervisor.connect().await.expect("connect");
        rollup.set_fail_history(true);
        match supervisor.export().await {
            Err(ExportError::HistoryFetchFailed(msg)) => assert!(msg.contains("unavailable")),
            other => panic!("unexpected: {:?}", other.map(|t| t.record_count())),
        }

        rollup.set_fail_history(false);
        assert!(supervisor.export().await.is_ok());
    });
}

/// Test: teardown drops the session
#[test]
fn teardown_ends_export() {
    let (supervisor, _) = supervisor_for(MemoryRollup::new());
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        let session = supervisor.connect().await.expect("connect");
        supervisor.teardown().await;
        assert!(supervisor.current().await.is_none());
        assert!(matches!(supervisor.export().await, Err(ExportError::NoSession)));
        assert!(matches!(
            HistoryExporter::new().export(&session).await,
            Err(ExportError::SessionInvalidated)
        ));
    });
}

/// Test: explicit network file overlays builtin networks
#[test]
fn network_file_overlays_builtin() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("networks.json");
    std::fs::write(
        &path,
        r#"{"1337": {"rollup_provider_url": "http://localhost:8081", "poll_interval_ms": 250},
            "0xA57EC": {"rollup_provider_url": "http://localhost:9000"}}"#,
    )
    .unwrap();

    let networks = NetworkConfig::resolve(Some(&path)).expect("resolve");
    assert_eq!(networks.len(), 3);
    assert!(networks.is_supported(MAINNET_CHAIN_ID));
    assert_eq!(networks.get(1337).unwrap().poll_interval_ms, 250);
    assert_eq!(networks.get(TESTNET_CHAIN_ID).unwrap().rollup_provider_url, "http://localhost:9000");
}

/// Test: network file named by environment; missing named file is an error
#[test]
fn network_file_from_env() {
    let _guard = lock_env();
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("networks.json");
    std::fs::write(&path, r#"{"31337": {"rollup_provider_url": "http://localhost:8545"}}"#).unwrap();

    std::env::set_var(NETWORKS_ENV, &path);
    let networks = NetworkConfig::resolve(None).expect("resolve");
    assert!(networks.is_supported(31337));
    assert!(networks.is_supported(TESTNET_CHAIN_ID));

    std::env::set_var(NETWORKS_ENV, dir.path().join("missing.json"));
    assert!(NetworkConfig::resolve(None).is_err());

    std::env::remove_var(NETWORKS_ENV);
}
