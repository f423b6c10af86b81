//! Error types for the bank-parser library.
//!
//! Three types reflect three distinct failure modes:
//!
//! * [`BankParserError`]: **Fatal**: the statement cannot be processed at
//!   all (missing credential, unreadable PDF, undecodable model response).
//!   Returned as `Err(BankParserError)` from every top-level operation. No
//!   partial list of transactions is ever returned alongside it.
//!
//! * [`RecordWarning`]: **Non-fatal**: one element of an otherwise valid
//!   JSON array could not be coerced into a [`crate::Transaction`]. The
//!   element is dropped and the warning is kept in
//!   [`crate::output::StatementOutput::skipped`].
//!
//! * [`ModelError`]: a single model call failed. The retry loop in
//!   [`crate::pipeline::model`] uses [`ModelError::is_transient`] to decide
//!   whether another attempt is worthwhile, then folds the last one into a
//!   [`BankParserError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bank-parser library.
#[derive(Debug, Error)]
pub enum BankParserError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A credential, provider or native dependency is missing, or the
    /// configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file exists but could not be opened or read as a PDF.
    #[error("Failed to extract content from PDF '{path}': {detail}")]
    Extraction { path: PathBuf, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model call failed permanently or after all retries.
    #[error("Model call failed after {attempts} attempt(s): {detail}")]
    ModelCall { attempts: u32, detail: String },

    /// The final model call did not finish within the configured deadline.
    #[error("Model call timed out after {secs}s ({attempts} attempt(s))")]
    ModelTimeout { attempts: u32, secs: u64 },

    // ── Response errors ───────────────────────────────────────────────────
    /// The model response could not be interpreted as a JSON array.
    #[error("Failed to parse statement: {detail}")]
    Parsing {
        detail: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialising the records for export failed.
    #[error("Failed to export to '{path}': {detail}")]
    ExportFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`BankParserError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    NotFound,
    Extraction,
    Model,
    Parsing,
    Export,
    Internal,
}

impl BankParserError {
    /// Which part of the pipeline the error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BankParserError::Configuration(_) => ErrorCategory::Configuration,
            BankParserError::FileNotFound { .. } => ErrorCategory::NotFound,
            BankParserError::Extraction { .. } => ErrorCategory::Extraction,
            BankParserError::ModelCall { .. } | BankParserError::ModelTimeout { .. } => {
                ErrorCategory::Model
            }
            BankParserError::Parsing { .. } => ErrorCategory::Parsing,
            BankParserError::OutputWriteFailed { .. } | BankParserError::ExportFailed { .. } => {
                ErrorCategory::Export
            }
            BankParserError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn parsing(detail: impl Into<String>, source: serde_json::Error) -> Self {
        BankParserError::Parsing {
            detail: detail.into(),
            source: Some(source),
        }
    }
}

/// A single array element that was dropped while coercing the response.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[error("Skipped record {index}: {reason}")]
pub struct RecordWarning {
    /// 0-based position of the element in the decoded JSON array.
    pub index: usize,
    pub reason: String,
}

/// Failure of one call to the hosted model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Non-success HTTP status from the REST endpoint.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection reset, DNS failure, TLS error, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded its deadline.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The endpoint answered but the body had no usable completion text.
    #[error("no completion text in response: {0}")]
    EmptyResponse(String),

    /// The endpoint answered with a body that does not match its schema.
    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    /// Error reported by an `edgequake_llm` provider.
    #[error("provider error: {0}")]
    Provider(String),
}

impl ModelError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits (429), server errors (5xx), transport failures and
    /// timeouts are transient. Other 4xx responses (bad key, bad request)
    /// and unusable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            ModelError::Transport(_) | ModelError::Timeout { .. } | ModelError::Provider(_) => true,
            ModelError::EmptyResponse(_) | ModelError::MalformedResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = BankParserError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        let msg = e.to_string();
        assert!(msg.contains("missing.pdf"), "got: {msg}");
        assert_eq!(e.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn parsing_error_keeps_source() {
        let src = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err();
        let e = BankParserError::parsing("response is not valid JSON", src);
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().starts_with("Failed to parse statement"));
        assert_eq!(e.category(), ErrorCategory::Parsing);
    }

    #[test]
    fn model_errors_share_a_category() {
        let call = BankParserError::ModelCall {
            attempts: 3,
            detail: "HTTP 503".into(),
        };
        let timeout = BankParserError::ModelTimeout {
            attempts: 1,
            secs: 30,
        };
        assert_eq!(call.category(), ErrorCategory::Model);
        assert_eq!(timeout.category(), ErrorCategory::Model);
        assert!(timeout.to_string().contains("30s"));
    }

    #[test]
    fn transient_classification() {
        let rate_limited = ModelError::Http {
            status: 429,
            body: String::new(),
        };
        let unavailable = ModelError::Http {
            status: 503,
            body: String::new(),
        };
        let bad_key = ModelError::Http {
            status: 403,
            body: "API key not valid".into(),
        };
        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!bad_key.is_transient());
        assert!(ModelError::Timeout { secs: 5 }.is_transient());
        assert!(!ModelError::EmptyResponse("SAFETY".into()).is_transient());
    }

    #[test]
    fn record_warning_display() {
        let w = RecordWarning {
            index: 2,
            reason: "amount: 'abc' is not a number".into(),
        };
        assert_eq!(
            w.to_string(),
            "Skipped record 2: amount: 'abc' is not a number"
        );
    }
}
