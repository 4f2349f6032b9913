//! Aztec History CLI
//!
//!   aztec-history networks                          → effective network table (JSON)
//!   aztec-history derive --address <0x…>            → {"address", "public_key"}
//!   aztec-history export --address <0x…> --chain-id <id> [--fixture <file>] [--out <file>]
//!
//! `export` bootstraps against in-memory collaborators seeded from a fixture and
//! writes the CSV to `--out`, or to stdout when no path is given.
//!
//! Configuration (flags > env > defaults; `.env` in the working directory is loaded):
//!   AZTEC_HISTORY_ADDRESS, AZTEC_HISTORY_CHAIN_ID, AZTEC_HISTORY_FIXTURE,
//!   AZTEC_HISTORY_NETWORKS, AZTEC_HISTORY_SYNC_TIMEOUT (seconds), AZTEC_HISTORY_LOG_JSON

use aztec_history::identity::derive_account_keys;
use aztec_history::logging::init_logging;
use aztec_history::memory::{MemoryClientFactory, MemoryRollup, MemoryWallet, RollupFixture};
use aztec_history::network::parse_chain_id;
use aztec_history::{BootstrapOptions, Bootstrapper, EthAddress, NetworkConfig, SessionSupervisor};
use serde_json::{json, Value};
use std::env;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

enum Output {
    Json(Value),
    Text(String),
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("aztec-history {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("networks") => cmd_networks(&opts),
        Some("derive") => cmd_derive(&opts),
        Some("export") => cmd_export(&opts),
        Some(cmd) => Err(format!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || std::io::stdout().is_terminal();
    match result {
        Ok(Output::Json(value)) => println!("{}", render(&value, pretty)),
        Ok(Output::Text(text)) => {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", text);
        }
        Err(e) => {
            eprintln!("{}", render(&json!({"error": e}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    address: Option<String>,
    chain_id: Option<String>,
    fixture: Option<String>,
    networks: Option<String>,
    out: Option<String>,
    sync_timeout_secs: Option<u64>,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv(Path::new(".env"));

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--pretty" => opts.pretty = true,
                "--address" | "-a" => { opts.address = value; i += 1; }
                "--chain-id" | "-c" => { opts.chain_id = value; i += 1; }
                "--fixture" | "-f" => { opts.fixture = value; i += 1; }
                "--networks" | "-n" => { opts.networks = value; i += 1; }
                "--out" | "-o" => { opts.out = value; i += 1; }
                "--sync-timeout" => {
                    opts.sync_timeout_secs = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => debug!(flag = %arg, "Ignoring unknown flag"),
            }
            i += 1;
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }

        // Environment (lower priority than CLI args)
        let from_env = |key: &str| env::var(key).ok().filter(|s| !s.is_empty());
        if opts.address.is_none() {
            opts.address = from_env("AZTEC_HISTORY_ADDRESS");
        }
        if opts.chain_id.is_none() {
            opts.chain_id = from_env("AZTEC_HISTORY_CHAIN_ID");
        }
        if opts.fixture.is_none() {
            opts.fixture = from_env("AZTEC_HISTORY_FIXTURE");
        }
        if opts.sync_timeout_secs.is_none() {
            opts.sync_timeout_secs = from_env("AZTEC_HISTORY_SYNC_TIMEOUT").and_then(|s| s.parse().ok());
        }
        // --networks falls back to AZTEC_HISTORY_NETWORKS inside NetworkConfig::resolve.

        opts
    }

    fn address(&self) -> Result<EthAddress, String> {
        let raw = self.address.as_deref().ok_or("--address <0x…> is required")?;
        raw.parse().map_err(|e| format!("Invalid address {}: {}", raw, e))
    }

    fn chain_id(&self) -> Result<u64, String> {
        let raw = self.chain_id.as_deref().ok_or("--chain-id <id> is required")?;
        parse_chain_id(raw).map_err(|e| e.to_string())
    }

    fn bootstrap_options(&self) -> BootstrapOptions {
        match self.sync_timeout_secs {
            Some(secs) => BootstrapOptions::default()
                .with_client_sync_timeout(Duration::from_secs(secs))
                .with_user_sync_timeout(Duration::from_secs(secs)),
            None => BootstrapOptions::default(),
        }
    }
}

/// `KEY=value` lines; never overrides variables already set.
fn load_dotenv(path: &Path) {
    let Ok(contents) = std::fs::read_to_string(path) else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"aztec-history - Aztec Connect account bootstrap and history export

USAGE:
    aztec-history <command> [options]

COMMANDS:
    networks                Print the effective network table
    derive                  Print the account key derived for --address
    export                  Bootstrap a session and export its history as CSV

OPTIONS:
    --address, -a <0x…>     Ethereum account (env: AZTEC_HISTORY_ADDRESS)
    --chain-id, -c <id>     Chain id, decimal or 0x hex (env: AZTEC_HISTORY_CHAIN_ID)
    --fixture, -f <file>    Rollup fixture JSON (env: AZTEC_HISTORY_FIXTURE)
    --networks, -n <file>   Network file overlaying the builtin table (env: AZTEC_HISTORY_NETWORKS)
    --out, -o <file>        Write the CSV here instead of stdout
    --sync-timeout <secs>   Client and user sync timeout (env: AZTEC_HISTORY_SYNC_TIMEOUT)
    --pretty                Pretty-print JSON
    --version, -V           Print version

EXAMPLES:
    aztec-history networks
    aztec-history derive --address 0x00000000000000000000000000000000000000aa
    aztec-history export -a 0x…aa -c 0xA57EC -f history.json -o history.csv
"#
    );
}

fn networks(opts: &ParsedArgs) -> Result<NetworkConfig, String> {
    let explicit = opts.networks.as_deref().map(PathBuf::from);
    NetworkConfig::resolve(explicit.as_deref()).map_err(|e| e.to_string())
}

fn cmd_networks(opts: &ParsedArgs) -> Result<Output, String> {
    Ok(Output::Json(networks(opts)?.to_json()))
}

fn cmd_derive(opts: &ParsedArgs) -> Result<Output, String> {
    let address = opts.address()?;
    let keys = derive_account_keys(&address).map_err(|e| e.to_string())?;
    Ok(Output::Json(json!({
        "address": address.to_string(),
        "public_key": keys.public_key.short(),
    })))
}

fn cmd_export(opts: &ParsedArgs) -> Result<Output, String> {
    let address = opts.address()?;
    let chain_id = opts.chain_id()?;
    let networks = networks(opts)?;

    let rollup = match opts.fixture.as_deref() {
        Some(path) => RollupFixture::load(Path::new(path))
            .and_then(RollupFixture::into_rollup)
            .map_err(|e| format!("Fixture {}: {:#}", path, e))?,
        None => MemoryRollup::new(),
    };

    let wallet = Arc::new(MemoryWallet::new(address, chain_id));
    let factory = Arc::new(MemoryClientFactory::new(Arc::new(rollup)));
    let bootstrapper = Bootstrapper::new(wallet, factory, networks).with_options(opts.bootstrap_options());
    let supervisor = SessionSupervisor::new(bootstrapper);

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;
    let table = rt.block_on(async {
        let run = async {
            let session = supervisor
                .connect()
                .await
                .map_err(|e| format!("Bootstrap failed ({}): {}. {}", e.kind().as_str(), e, e.kind().hint()))?;
            info!(address = %session.address().short(), "Exporting history");
            supervisor.export().await.map_err(|e| format!("Export failed: {}", e))
        };
        tokio::select! {
            result = run => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, tearing down session");
                supervisor.teardown().await;
                Err("Interrupted".to_string())
            }
        }
    })?;

    match opts.out.as_deref() {
        Some(out) => {
            let path = Path::new(out);
            table.write_to(path).map_err(|e| e.to_string())?;
            Ok(Output::Json(json!({
                "status": "exported",
                "path": path.display().to_string(),
                "file_name": table.file_name(),
                "records": table.record_count(),
            })))
        }
        None => Ok(Output::Text(table.to_csv())),
    }
}
