//! End-to-end tests for bank-parser.
//!
//! These tests read real statements from `./test_cases/` (not committed;
//! they contain personal data) and make live model calls. They are gated
//! behind the `E2E_ENABLED` environment variable so they do not run in CI
//! unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture

use bank_parser::{BankParserError, ParserConfig, StatementParser};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

// ── Extraction only (no model) ───────────────────────────────────────────────

#[tokio::test]
async fn test_extract_sample_statement() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("statement.pdf"));

    // Extraction never calls the model, so any key will do.
    let parser = StatementParser::with_api_key("unused").unwrap();
    let content = parser.extract_content(&pdf).await.expect("extract failed");

    println!(
        "pages={} tables={} chars={}",
        content.page_count,
        content.tables.len(),
        content.text.chars().count()
    );
    assert!(content.page_count >= 1);
    assert!(!content.text.trim().is_empty(), "statement has no text layer");
    for table in &content.tables {
        assert!(table.page >= 1 && table.page <= content.page_count);
        assert!(table.data.len() >= 2, "table with fewer than two rows");
        let width = table.data[0].len();
        assert!(table.data.iter().all(|row| row.len() == width), "ragged table");
    }
}

#[tokio::test]
async fn test_extract_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let parser = StatementParser::with_api_key("unused").unwrap();
    let err = parser
        .extract_content("/nonexistent/statement.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, BankParserError::FileNotFound { .. }));
}

// ── Full parse (live model) ──────────────────────────────────────────────────

#[tokio::test]
async fn test_parse_sample_statement() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("statement.pdf"));

    struct Counter(AtomicUsize);
    impl bank_parser::ParseProgressCallback for Counter {
        fn on_parse_complete(&self, transactions: usize, _skipped: usize) {
            self.0.store(transactions, Ordering::SeqCst);
        }
    }
    let counter = Arc::new(Counter(AtomicUsize::new(0)));

    let config = ParserConfig::builder()
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    let parser = StatementParser::new(config).expect("GEMINI_API_KEY must be set");
    let output = parser
        .parse_statement_detailed(&pdf)
        .await
        .expect("parse failed");

    println!(
        "{} transactions, {} skipped, {}ms",
        output.transactions.len(),
        output.skipped.len(),
        output.stats.total_duration_ms
    );
    assert!(!output.transactions.is_empty());
    assert_eq!(counter.0.load(Ordering::SeqCst), output.transactions.len());
    for txn in &output.transactions {
        assert!(txn.amount.is_finite());
    }

    let out = output_dir();
    parser
        .export_json(&output.transactions, out.join("statement.json"))
        .unwrap();
    parser
        .export_csv(&output.transactions, out.join("statement.csv"))
        .unwrap();
}
