//! # bank-parser
//!
//! Extract transactions from bank-statement PDFs with a hosted LLM.
//!
//! Statement layouts differ from bank to bank and rarely survive plain text
//! extraction in a usable shape. Rather than maintain one parser per bank,
//! this crate pulls the text and any tabular regions out of the PDF, hands
//! them to a language model with a fixed instruction prompt, and coerces the
//! JSON it answers with into uniform [`Transaction`] records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    check the file exists and starts with %PDF
//!  ├─ 2. Extract  page text + position-grouped tables via pdfium (spawn_blocking)
//!  ├─ 3. Prompt   first 8000 chars of text, first 3 tables, output schema
//!  ├─ 4. Model    Gemini REST or any edgequake-llm provider, deadline + retry
//!  ├─ 5. Parse    first balanced JSON array, per-record coercion
//!  └─ 6. Output   Vec<Transaction>, summary, JSON / CSV export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bank_parser::StatementParser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from GEMINI_API_KEY
//!     let parser = StatementParser::from_env()?;
//!     let transactions = parser.parse_statement("statement.pdf").await?;
//!     parser.export_csv(&transactions, "statement.csv")?;
//!
//!     let summary = parser.summary(&transactions);
//!     eprintln!("{} transactions, net {:.2}", summary.total_transactions, summary.net_amount);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bank-parser` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bank-parser = { version = "0.3", default-features = false }
//! ```
//!
//! ## Native dependency
//!
//! Extraction needs the pdfium shared library at runtime. It is looked up in
//! [`ParserConfig::pdfium_lib_path`] when set, else the current directory,
//! else the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod transaction;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ParserConfig, ParserConfigBuilder};
pub use error::{BankParserError, ErrorCategory, ModelError, RecordWarning};
pub use export::{export_csv, export_json, format_amount, format_summary, format_transaction_line};
pub use output::{ParseStats, StatementOutput};
pub use parser::{get_transactions_data, get_transactions_summary, parse_bank_statement, StatementParser};
pub use pipeline::extract::{ExtractedContent, ExtractedTable};
pub use pipeline::model::{Completion, GeminiModel, ProviderModel, TextModel};
pub use progress::{NoopProgressCallback, ParseProgressCallback, ProgressCallback};
pub use transaction::{summary, Direction, Summary, Transaction};
