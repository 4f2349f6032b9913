//! History export - user transactions flattened into a ten-column CSV table.
//!
//! | Column | Source |
//! |--------|--------|
//! | Ethereum account | wallet address |
//! | Aztec userId | record user id (account public key) |
//! | txId | record tx id |
//! | created / settled | day string, e.g. `Tue Oct 18 2022`; empty when missing |
//! | Tx Type | proof kind label; empty for unknown kinds |
//! | AssetId / Value / Fee / Sender? | payment records only; empty otherwise |
//!
//! Fields are joined verbatim: no quoting or escaping. None of the sources can
//! contain commas or newlines today; that is an assumption, not a guarantee.

use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::sdk::TransactionRecord;
use crate::session::ActiveSession;
use crate::wallet::EthAddress;

pub const COLUMNS: usize = 10;

pub const HEADER: [&str; COLUMNS] = [
    "Ethereum account",
    "Aztec userId",
    "txId",
    "created",
    "settled",
    "Tx Type",
    "AssetId",
    "Value",
    "Fee",
    "Sender?",
];

const DAY_FORMAT: &str = "%a %b %d %Y";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No active session")]
    NoSession,

    #[error("Session is not synchronized")]
    NotSynchronized,

    #[error("Session was invalidated by an account switch")]
    SessionInvalidated,

    #[error("History fetch failed: {0}")]
    HistoryFetchFailed(String),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// One table row. Arity is fixed by the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow(pub [String; COLUMNS]);

impl ExportRow {
    pub fn header() -> Self {
        Self(HEADER.map(String::from))
    }

    pub fn from_record(account: &EthAddress, record: &TransactionRecord) -> Self {
        let (asset_id, value, fee, is_sender) = match record.body.payment() {
            Some(p) => (
                p.value.asset_id.to_string(),
                p.value.value.to_string(),
                p.fee.value.to_string(),
                p.is_sender.to_string(),
            ),
            None => Default::default(),
        };
        Self([
            account.to_string(),
            record.user_id.to_string(),
            record.tx_id.to_string(),
            day_string(record.created),
            day_string(record.settled),
            record.proof_id.label().to_string(),
            asset_id,
            value,
            fee,
            is_sender,
        ])
    }

    pub fn fields(&self) -> &[String; COLUMNS] { &self.0 }

    pub fn to_line(&self) -> String {
        self.0.join(",")
    }
}

fn day_string(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format(DAY_FORMAT).to_string()).unwrap_or_default()
}

/// Header row plus one row per record, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTable {
    account: EthAddress,
    rows: Vec<ExportRow>,
}

impl HistoryTable {
    pub fn from_records(account: EthAddress, records: &[TransactionRecord]) -> Self {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(ExportRow::header());
        rows.extend(records.iter().map(|r| ExportRow::from_record(&account, r)));
        Self { account, rows }
    }

    pub fn account(&self) -> EthAddress { self.account }

    /// All rows, header first.
    pub fn rows(&self) -> &[ExportRow] { &self.rows }

    pub fn record_count(&self) -> usize { self.rows.len() - 1 }

    pub fn to_csv(&self) -> String {
        self.rows.iter().map(ExportRow::to_line).collect::<Vec<_>>().join("\n")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_csv().into_bytes()
    }

    /// `data:` URI suitable for handing straight to a browser open/download action.
    pub fn to_data_uri(&self) -> String {
        format!("data:text/csv;charset=utf-8,{}", encode_uri(&self.to_csv()))
    }

    pub fn file_name(&self) -> String {
        format!("aztec-history-{}.csv", self.account)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes())?;
        info!(path = %path.display(), records = self.record_count(), "History written");
        Ok(())
    }
}

/// Percent-encodes everything outside the `encodeURI` unreserved and reserved sets.
fn encode_uri(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(b as char),
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => out.push(b as char),
            b';' | b',' | b'/' | b'?' | b':' | b'@' | b'&' | b'=' | b'+' | b'$' | b'#' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Reads a ready session and produces its history table.
#[derive(Debug, Clone, Default)]
pub struct HistoryExporter;

impl HistoryExporter {
    pub fn new() -> Self { Self }

    /// Single history fetch; any fetch error aborts the export.
    pub async fn export(&self, session: &ActiveSession) -> Result<HistoryTable, ExportError> {
        if !session.is_synchronized() {
            return Err(ExportError::NotSynchronized);
        }
        if !session.is_current() {
            return Err(ExportError::SessionInvalidated);
        }

        debug!(public_key = %session.public_key().short(), "Fetching user txs");
        let records = session
            .client()
            .get_user_txs(session.public_key())
            .await
            .map_err(|e| ExportError::HistoryFetchFailed(format!("{:#}", e)))?;

        // The fetch suspends; a switch during it makes the result stale.
        if !session.is_current() {
            return Err(ExportError::SessionInvalidated);
        }

        let table = HistoryTable::from_records(session.address(), &records);
        info!(records = table.record_count(), "History exported");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{AccountPublicKey, AssetValue, PaymentFields, ProofId, TxBody, TxId};
    use chrono::TimeZone;

    fn account() -> EthAddress {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn record(tag: u8, body: TxBody) -> TransactionRecord {
        TransactionRecord {
            tx_id: TxId::new([tag; 32]),
            user_id: AccountPublicKey::new([0x22; 64]),
            proof_id: ProofId::from(u32::from(tag)),
            created: Some(Utc.with_ymd_and_hms(2022, 10, 18, 9, 30, 0).unwrap()),
            settled: Some(Utc.with_ymd_and_hms(2022, 10, 19, 1, 0, 0).unwrap()),
            body,
        }
    }

    fn send_100() -> TxBody {
        TxBody::Payment(PaymentFields {
            value: AssetValue::new(0, 100),
            fee: AssetValue::new(0, 5),
            is_sender: true,
        })
    }

    #[test]
    fn header_only_for_no_records() {
        let table = HistoryTable::from_records(account(), &[]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.record_count(), 0);
        assert_eq!(
            table.to_csv(),
            "Ethereum account,Aztec userId,txId,created,settled,Tx Type,AssetId,Value,Fee,Sender?"
        );
    }

    #[test]
    fn deposit_without_payment_fields_keeps_label() {
        let row = ExportRow::from_record(&account(), &record(1, TxBody::Opaque));
        let f = row.fields();
        assert_eq!(f[5], "Deposit");
        assert_eq!(&f[6..], &["", "", "", ""]);
    }

    #[test]
    fn send_payment_row() {
        let row = ExportRow::from_record(&account(), &record(3, send_100()));
        let f = row.fields();
        assert_eq!(f[0], account().to_checksum());
        assert!(f[0].eq_ignore_ascii_case("0x00000000000000000000000000000000000000aa"));
        assert_eq!(f[3], "Tue Oct 18 2022");
        assert_eq!(f[4], "Wed Oct 19 2022");
        assert_eq!(&f[5..], &["Send", "0", "100", "5", "true"]);
    }

    #[test]
    fn unknown_kind_has_empty_label() {
        let row = ExportRow::from_record(&account(), &record(9, TxBody::Opaque));
        assert_eq!(row.fields()[5], "");
    }

    #[test]
    fn unsettled_tx_has_empty_settled_column() {
        let mut r = record(2, TxBody::Opaque);
        r.settled = None;
        let row = ExportRow::from_record(&account(), &r);
        assert_eq!(row.fields()[4], "");
        assert_eq!(row.fields()[5], "Withdrawal");
    }

    #[test]
    fn every_line_has_ten_columns() {
        let records: Vec<_> = (0..=7u8)
            .map(|tag| record(tag, if tag == 3 { send_100() } else { TxBody::Account }))
            .collect();
        let table = HistoryTable::from_records(account(), &records);
        let csv = table.to_csv();
        assert_eq!(csv.lines().count(), records.len() + 1);
        for line in csv.lines() {
            assert_eq!(line.split(',').count(), COLUMNS);
        }
    }

    #[test]
    fn data_uri_encodes_like_encode_uri() {
        assert_eq!(encode_uri("a b\nc,d?"), "a%20b%0Ac,d?");
        let table = HistoryTable::from_records(account(), &[]);
        let uri = table.to_data_uri();
        assert!(uri.starts_with("data:text/csv;charset=utf-8,Ethereum%20account,Aztec%20userId,"));
        assert!(!uri.contains(' '));
    }

    #[test]
    fn file_name_uses_account() {
        let table = HistoryTable::from_records(account(), &[]);
        assert_eq!(table.file_name(), format!("aztec-history-{}.csv", account().to_checksum()));
    }

    #[test]
    fn write_to_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("history.csv");
        let table = HistoryTable::from_records(account(), &[record(3, send_100())]);
        table.write_to(&path).expect("write");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, table.to_csv());
    }
}
