//! File export and human-readable formatting of parsed transactions.
//!
//! Both file formats are written atomically: the bytes go to a sibling temp
//! file which is then renamed over the destination, so a crash never leaves
//! a half-written export behind.

use crate::error::BankParserError;
use crate::transaction::{Summary, Transaction};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Currency symbol used by the text formatters when none is given.
pub const DEFAULT_CURRENCY: &str = "₹";

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 9] = [
    "date",
    "particulars",
    "amount",
    "transaction_type",
    "balance",
    "reference_no",
    "value_date",
    "narration",
    "cheque_no",
];

#[derive(Debug, Serialize)]
struct ExportEnvelope<'a> {
    extracted_at: String,
    total_transactions: usize,
    transactions: &'a [Transaction],
}

/// Write `transactions` to `path` as a pretty-printed JSON document:
///
/// ```json
/// { "extracted_at": "2024-04-01T10:00:00+05:30", "total_transactions": 1, "transactions": [ ... ] }
/// ```
pub fn export_json(transactions: &[Transaction], path: impl AsRef<Path>) -> Result<(), BankParserError> {
    let path = path.as_ref();
    let envelope = ExportEnvelope {
        extracted_at: Local::now().to_rfc3339(),
        total_transactions: transactions.len(),
        transactions,
    };

    let json = serde_json::to_string_pretty(&envelope).map_err(|e| BankParserError::ExportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    write_atomic(path, json.as_bytes())?;
    info!("Exported {} transactions to {}", transactions.len(), path.display());
    Ok(())
}

/// Write `transactions` to `path` as CSV with a [`CSV_HEADER`] row.
///
/// Absent optional fields become empty cells. An empty list produces an
/// empty file with no header.
pub fn export_csv(transactions: &[Transaction], path: impl AsRef<Path>) -> Result<(), BankParserError> {
    let path = path.as_ref();
    let export_err = |detail: String| BankParserError::ExportFailed {
        path: path.to_path_buf(),
        detail,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for txn in transactions {
        writer.serialize(txn).map_err(|e| export_err(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| export_err(e.to_string()))?;

    write_atomic(path, &bytes)?;
    info!("Exported {} transactions to {}", transactions.len(), path.display());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BankParserError> {
    let write_err = |source: std::io::Error| BankParserError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp_path = temp_sibling(path);
    std::fs::write(&tmp_path, bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        write_err(e)
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Text formatting ──────────────────────────────────────────────────────

/// Format an amount with thousands separators: `₹1,234.56`, `-₹500.00`.
pub fn format_amount(value: f64, currency: &str) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative && fixed != "0.00" {
        format!("-{currency}{grouped}.{dec_part}")
    } else {
        format!("{currency}{grouped}.{dec_part}")
    }
}

/// One numbered line of the text listing:
/// `1. 01/04/2024 | SALARY | ₹50,000.00 | CR`.
pub fn format_transaction_line(number: usize, txn: &Transaction, currency: &str) -> String {
    format!(
        "{}. {} | {} | {} | {}",
        number,
        txn.date,
        txn.particulars,
        format_amount(txn.amount, currency),
        txn.transaction_type
    )
}

/// The four-line text rendering of a [`Summary`].
pub fn format_summary(summary: &Summary, currency: &str) -> String {
    format!(
        "Total Transactions: {}\nTotal Debits: {}\nTotal Credits: {}\nNet: {}",
        summary.total_transactions,
        format_amount(summary.total_debit, currency),
        format_amount(summary.total_credit, currency),
        format_amount(summary.net_amount, currency)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Transaction> {
        let mut salary = Transaction::new("01/04/2024", "SALARY, APRIL", 50000.0, "CR");
        salary.balance = Some(60000.0);
        salary.reference_no = Some("NEFT123".into());
        vec![salary, Transaction::new("02/04/2024", "ATM", 500.0, "DR")]
    }

    #[test]
    fn json_export_has_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        export_json(&sample(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_transactions"], 2);
        assert_eq!(value["transactions"][0]["particulars"], "SALARY, APRIL");
        assert!(value["transactions"][1]["balance"].is_null());
        let stamp = value["extracted_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
        assert!(!dir.path().join("nested/out.json.tmp").exists());
    }

    #[test]
    fn csv_export_quotes_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_csv(&sample(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(lines[1], "01/04/2024,\"SALARY, APRIL\",50000.0,CR,60000.0,NEFT123,,,");
        assert_eq!(lines[2], "02/04/2024,ATM,500.0,DR,,,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_export_of_one_record_is_two_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.csv");
        export_csv(&[Transaction::new("05/04/2024", "UPI", 99.5, "DR")], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(lines[1], "05/04/2024,UPI,99.5,DR,,,,,");
    }

    #[test]
    fn csv_export_of_nothing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        export_csv(&[], &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 0);
    }

    #[test]
    fn export_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = export_json(&sample(), blocker.join("out.json")).unwrap_err();
        assert!(matches!(err, BankParserError::OutputWriteFailed { .. }), "{err}");
    }

    #[test]
    fn amounts_get_thousands_separators() {
        assert_eq!(format_amount(1234.56, "₹"), "₹1,234.56");
        assert_eq!(format_amount(-500.0, "₹"), "-₹500.00");
        assert_eq!(format_amount(0.0, "$"), "$0.00");
        assert_eq!(format_amount(1_000_000.99, "€"), "€1,000,000.99");
        assert_eq!(format_amount(999.999, ""), "1,000.00");
        assert_eq!(format_amount(-0.001, "₹"), "₹0.00");
    }

    #[test]
    fn text_lines() {
        let txns = sample();
        assert_eq!(
            format_transaction_line(1, &txns[0], DEFAULT_CURRENCY),
            "1. 01/04/2024 | SALARY, APRIL | ₹50,000.00 | CR"
        );
        let text = format_summary(&crate::transaction::summary(&txns), "₹");
        assert_eq!(
            text,
            "Total Transactions: 2\nTotal Debits: ₹500.00\nTotal Credits: ₹50,000.00\nNet: ₹49,500.00"
        );
    }
}
