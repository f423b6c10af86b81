//! CLI binary for bank-parser.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ParserConfig` and prints the parsed transactions.

use anyhow::{Context, Result};
use bank_parser::{
    format_summary, format_transaction_line, ParseProgressCallback, ParserConfig,
    ProgressCallback, StatementParser,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose message follows the pipeline
/// stage, plus one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        // Clears the spinner line when parsing fails before on_parse_complete.
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ParseProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, path: &Path) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(path.display().to_string());
    }

    fn on_extraction_complete(&self, pages: usize, tables: usize, text_chars: usize) {
        self.bar.println(format!(
            "  {} Extracted {} pages  {}",
            green("✓"),
            pages,
            dim(&format!("{tables} tables, {text_chars} chars")),
        ));
    }

    fn on_model_request(&self, attempt: u32, max_attempts: u32) {
        self.bar.set_prefix("Asking model");
        if attempt > 1 {
            self.bar.set_message(format!("attempt {attempt}/{max_attempts}"));
        } else {
            self.bar.set_message(String::new());
        }
    }

    fn on_model_response(&self, completion_chars: usize) {
        self.bar.println(format!(
            "  {} Model answered  {}",
            green("✓"),
            dim(&format!("{completion_chars} chars")),
        ));
        self.bar.set_prefix("Parsing");
        self.bar.set_message(String::new());
    }

    fn on_parse_complete(&self, transactions: usize, skipped: usize) {
        self.bar.finish_and_clear();
        if skipped == 0 {
            eprintln!("{} {} transactions", green("✔"), bold(&transactions.to_string()));
        } else {
            eprintln!(
                "{} {} transactions  ({} records skipped)",
                cyan("⚠"),
                bold(&transactions.to_string()),
                skipped
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # All transactions as JSON (stdout)
  bank-parser statement.pdf

  # Numbered text listing
  bank-parser statement.pdf --format text

  # Totals only
  bank-parser statement.pdf --summary --format text

  # Save to files as well
  bank-parser statement.pdf --export-json out.json --export-csv out.csv

  # A different provider through edgequake-llm
  bank-parser statement.pdf --provider openai --model gpt-4.1-mini

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default backend)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override log filter (e.g. bank_parser=debug)
"#;

/// Extract transactions from bank-statement PDFs with a hosted LLM.
#[derive(Parser, Debug)]
#[command(
    name = "bank-parser",
    version,
    about = "Extract transactions from bank-statement PDFs with a hosted LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PDF bank statement.
    pdf_file: PathBuf,

    /// Google Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Print transaction summary only.
    #[arg(long)]
    summary: bool,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model ID (default: gemini-1.5-flash).
    #[arg(long, env = "BANK_PARSER_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider instead of the built-in Gemini client:
    /// openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "BANK_PARSER_PROVIDER")]
    provider: Option<String>,

    /// Also write the transactions to this JSON file.
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Also write the transactions to this CSV file.
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Currency symbol for the text format.
    #[arg(long, default_value = bank_parser::export::DEFAULT_CURRENCY)]
    currency: String,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "BANK_PARSER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Retries on transient model failures.
    #[arg(long, env = "BANK_PARSER_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Model call timeout in seconds.
    #[arg(long, env = "BANK_PARSER_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Disable progress spinner.
    #[arg(long, env = "BANK_PARSER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    #[value(alias = "dict")]
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers stage progress, so only warnings get through
    // while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if !cli.pdf_file.exists() {
        anyhow::bail!("PDF file '{}' not found.", cli.pdf_file.display());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ParseProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let parser = StatementParser::new(config).context("Failed to initialise parser")?;

    let output = parser
        .parse_statement_detailed(&cli.pdf_file)
        .await
        .context("Failed to parse statement")?;

    if let Some(ref path) = cli.export_json {
        parser
            .export_json(&output.transactions, path)
            .context("JSON export failed")?;
    }
    if let Some(ref path) = cli.export_csv {
        parser
            .export_csv(&output.transactions, path)
            .context("CSV export failed")?;
    }

    if cli.summary {
        let summary = parser.summary(&output.transactions);
        match cli.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            ),
            OutputFormat::Text => println!("{}", format_summary(&summary, &cli.currency)),
        }
    } else {
        match cli.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&output.transactions)
                    .context("Failed to serialise transactions")?
            ),
            OutputFormat::Text => {
                for (i, txn) in output.transactions.iter().enumerate() {
                    println!("{}", format_transaction_line(i + 1, txn, &cli.currency));
                }
            }
        }
    }

    if !cli.quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out  ·  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ParserConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ParserConfig> {
    let mut builder = ParserConfig::builder()
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref dir) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
