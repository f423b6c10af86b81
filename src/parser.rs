//! The statement parser: extraction, prompt, model call and response parsing
//! chained into single calls.

use crate::config::ParserConfig;
use crate::error::BankParserError;
use crate::export;
use crate::output::{ParseStats, StatementOutput};
use crate::pipeline::extract::{self, ExtractedContent};
use crate::pipeline::model::{self, TextModel};
use crate::pipeline::response;
use crate::prompts;
use crate::transaction::{self, Summary, Transaction};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Parses bank statements with one configured model.
///
/// The model backend is resolved once, at construction, so a missing
/// credential is reported before any file is touched.
///
/// # Example
/// ```rust,no_run
/// use bank_parser::StatementParser;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let parser = StatementParser::from_env()?;
/// let transactions = parser.parse_statement("statement.pdf").await?;
/// let summary = parser.summary(&transactions);
/// println!("{} transactions, net {}", summary.total_transactions, summary.net_amount);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StatementParser {
    config: ParserConfig,
    model: Arc<dyn TextModel>,
}

impl fmt::Debug for StatementParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementParser")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

impl StatementParser {
    /// Build a parser from a full configuration.
    pub fn new(config: ParserConfig) -> Result<Self, BankParserError> {
        let model = model::resolve_model(&config)?;
        Ok(Self { config, model })
    }

    /// Default configuration; the API key comes from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, BankParserError> {
        Self::new(ParserConfig::default())
    }

    /// Default configuration with an explicit API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, BankParserError> {
        Self::new(ParserConfig::builder().api_key(api_key).build()?)
    }

    /// Use a caller-supplied model backend instead of resolving one from
    /// `config`.
    pub fn with_model(model: Arc<dyn TextModel>, config: ParserConfig) -> Self {
        Self { config, model }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Name of the model backend, e.g. `gemini/gemini-1.5-flash`.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Pull text and tables out of a PDF without calling the model.
    pub async fn extract_content(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ExtractedContent, BankParserError> {
        extract::extract_content(path.as_ref(), &self.config).await
    }

    /// Prompt the model with already-extracted content and parse its answer.
    pub async fn parse_content(
        &self,
        content: &ExtractedContent,
    ) -> Result<StatementOutput, BankParserError> {
        let prompt = prompts::build_prompt(content);
        debug!("Prompt: {} chars", prompt.chars().count());

        let model_start = Instant::now();
        let (completion, attempts) =
            model::generate_with_retry(self.model.as_ref(), &prompt, &self.config).await?;
        let model_duration_ms = model_start.elapsed().as_millis() as u64;
        info!(
            "{} answered in {}ms ({} attempt(s))",
            self.model.name(),
            model_duration_ms,
            attempts
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_model_response(completion.text.chars().count());
        }

        let parsed = response::parse_response(&completion.text)?;
        info!(
            "Parsed {} transactions ({} skipped)",
            parsed.transactions.len(),
            parsed.skipped.len()
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_parse_complete(parsed.transactions.len(), parsed.skipped.len());
        }

        Ok(StatementOutput {
            transactions: parsed.transactions,
            skipped: parsed.skipped,
            stats: ParseStats {
                page_count: content.page_count,
                tables_found: content.tables.len(),
                text_chars: content.text.chars().count(),
                prompt_chars: prompt.chars().count(),
                completion_chars: completion.text.chars().count(),
                model_attempts: attempts,
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                model_duration_ms,
                total_duration_ms: model_duration_ms,
                ..Default::default()
            },
        })
    }

    /// Parse a statement and return records together with diagnostics.
    pub async fn parse_statement_detailed(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<StatementOutput, BankParserError> {
        let total_start = Instant::now();
        let path = path.as_ref();
        info!("Parsing statement: {}", path.display());

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_start(path);
        }

        let extract_start = Instant::now();
        let content = self.extract_content(path).await?;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_complete(
                content.page_count,
                content.tables.len(),
                content.text.chars().count(),
            );
        }

        let mut output = self.parse_content(&content).await?;
        output.stats.extract_duration_ms = extract_duration_ms;
        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Statement complete: {} transactions, {}ms total",
            output.transactions.len(),
            output.stats.total_duration_ms
        );
        Ok(output)
    }

    /// Parse a statement into its transactions.
    pub async fn parse_statement(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<Transaction>, BankParserError> {
        self.parse_statement_detailed(path)
            .await
            .map(StatementOutput::into_transactions)
    }

    /// Parse a statement held in memory.
    ///
    /// The bytes are written to a managed temp file that is removed on return.
    pub async fn parse_statement_bytes(
        &self,
        bytes: &[u8],
    ) -> Result<StatementOutput, BankParserError> {
        let mut tmp = tempfile::NamedTempFile::new()
            .map_err(|e| BankParserError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| BankParserError::Internal(format!("tempfile write: {e}")))?;
        self.parse_statement_detailed(tmp.path()).await
    }

    /// Blocking wrapper around [`Self::parse_statement`].
    ///
    /// Creates a temporary tokio runtime; do not call from inside one.
    pub fn parse_statement_sync(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<Transaction>, BankParserError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| BankParserError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.parse_statement(path))
    }

    pub fn summary(&self, transactions: &[Transaction]) -> Summary {
        transaction::summary(transactions)
    }

    pub fn export_json(
        &self,
        transactions: &[Transaction],
        path: impl AsRef<Path>,
    ) -> Result<(), BankParserError> {
        export::export_json(transactions, path)
    }

    pub fn export_csv(
        &self,
        transactions: &[Transaction],
        path: impl AsRef<Path>,
    ) -> Result<(), BankParserError> {
        export::export_csv(transactions, path)
    }
}

fn parser_for(api_key: Option<&str>) -> Result<StatementParser, BankParserError> {
    match api_key {
        Some(key) => StatementParser::with_api_key(key),
        None => StatementParser::from_env(),
    }
}

/// Parse the statement at `path`, using `api_key` or `GEMINI_API_KEY`.
pub async fn parse_bank_statement(
    path: impl AsRef<Path>,
    api_key: Option<&str>,
) -> Result<Vec<Transaction>, BankParserError> {
    parser_for(api_key)?.parse_statement(path).await
}

/// Like [`parse_bank_statement`], with each record as a JSON object.
pub async fn get_transactions_data(
    path: impl AsRef<Path>,
    api_key: Option<&str>,
) -> Result<Vec<serde_json::Value>, BankParserError> {
    let transactions = parse_bank_statement(path, api_key).await?;
    Ok(transactions.iter().map(Transaction::to_value).collect())
}

/// Parse the statement at `path` and return only its totals.
pub async fn get_transactions_summary(
    path: impl AsRef<Path>,
    api_key: Option<&str>,
) -> Result<Summary, BankParserError> {
    let transactions = parse_bank_statement(path, api_key).await?;
    Ok(transaction::summary(&transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::pipeline::extract::ExtractedTable;
    use crate::pipeline::model::Completion;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    /// Returns a fixed reply and remembers the prompt it was sent.
    struct Canned {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    impl TextModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, ModelError>> {
            self.seen.lock().unwrap().push(prompt.to_string());
            let reply = Completion::from_text(self.reply.clone());
            Box::pin(async move { Ok(reply) })
        }
    }

    fn parser(reply: &str) -> (StatementParser, Arc<Canned>) {
        let canned = Arc::new(Canned {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let config = ParserConfig::builder().retry_backoff_ms(0).build().unwrap();
        (StatementParser::with_model(canned.clone(), config), canned)
    }

    fn content() -> ExtractedContent {
        ExtractedContent {
            text: "01/04/2024 SALARY 50,000.00 CR".into(),
            tables: vec![ExtractedTable {
                page: 1,
                table: 1,
                data: vec![vec![Some("01/04/2024".into()), Some("SALARY".into())]],
            }],
            page_count: 1,
        }
    }

    #[tokio::test]
    async fn parse_content_runs_prompt_model_and_parser() {
        let (parser, canned) = parser(
            r#"[{"date": "01/04/2024", "particulars": "SALARY", "amount": 50000, "transaction_type": "CR"}]"#,
        );
        let output = parser.parse_content(&content()).await.unwrap();

        assert_eq!(output.transactions.len(), 1);
        assert_eq!(output.stats.model_attempts, 1);
        assert_eq!(output.stats.tables_found, 1);
        let prompts = canned.seen.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("01/04/2024 SALARY 50,000.00 CR"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_fatal() {
        let (parser, _) = parser("Sorry, I cannot help with that.");
        let err = parser.parse_content(&content()).await.unwrap_err();
        assert!(matches!(err, BankParserError::Parsing { .. }));
    }

    #[tokio::test]
    async fn missing_file_never_reaches_the_model() {
        let (parser, canned) = parser("[]");
        let err = parser
            .parse_statement("/no/such/dir/statement.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, BankParserError::FileNotFound { .. }));
        assert!(canned.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_credential_fails_construction() {
        let config = ParserConfig::builder()
            .api_key_env("BANK_PARSER_PARSER_TEST_UNSET_KEY")
            .build()
            .unwrap();
        let err = StatementParser::new(config).unwrap_err();
        assert!(matches!(err, BankParserError::Configuration(_)));
    }

    #[test]
    fn debug_hides_the_key() {
        let parser = StatementParser::with_api_key("secret-key-123").unwrap();
        let debug = format!("{parser:?}");
        assert!(!debug.contains("secret-key-123"), "{debug}");
        assert!(debug.contains("gemini/gemini-1.5-flash"));
    }
}
