//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn ParseProgressCallback>`] via
//! [`crate::config::ParserConfigBuilder::progress_callback`] to hear about
//! each stage as a statement is processed. The CLI renders these events as a
//! spinner; a server might forward them to a job-status record.
//!
//! # Example
//!
//! ```rust
//! use bank_parser::{ParseProgressCallback, ParserConfig};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl ParseProgressCallback for Log {
//!     fn on_parse_complete(&self, transactions: usize, skipped: usize) {
//!         eprintln!("{transactions} transactions ({skipped} skipped)");
//!     }
//! }
//!
//! let config = ParserConfig::builder()
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it advances.
///
/// All methods have no-op defaults so callers only override what they need.
/// Implementations must be `Send + Sync`: one parser may be shared by several
/// tasks, each processing its own statement.
pub trait ParseProgressCallback: Send + Sync {
    /// Called before the PDF is opened.
    fn on_extraction_start(&self, path: &Path) {
        let _ = path;
    }

    /// Called once text and tables have been pulled out of the PDF.
    ///
    /// # Arguments
    /// * `pages`     : page count of the document
    /// * `tables`    : tables detected across all pages
    /// * `text_chars`: characters of extracted text (before truncation)
    fn on_extraction_complete(&self, pages: usize, tables: usize, text_chars: usize) {
        let _ = (pages, tables, text_chars);
    }

    /// Called just before each model request.
    ///
    /// # Arguments
    /// * `attempt`     : 1-based attempt number
    /// * `max_attempts`: `max_retries + 1`
    fn on_model_request(&self, attempt: u32, max_attempts: u32) {
        let _ = (attempt, max_attempts);
    }

    /// Called when the model returned a completion.
    fn on_model_response(&self, completion_chars: usize) {
        let _ = completion_chars;
    }

    /// Called after the response was coerced into transactions.
    fn on_parse_complete(&self, transactions: usize, skipped: usize) {
        let _ = (transactions, skipped);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ParseProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ParserConfig`].
pub type ProgressCallback = Arc<dyn ParseProgressCallback>;
