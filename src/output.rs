//! Result types returned by a full parse.

use crate::error::RecordWarning;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Everything produced by one pass over a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementOutput {
    /// Coerced records, in the order the model listed them.
    pub transactions: Vec<Transaction>,
    /// Array elements that were dropped during coercion.
    pub skipped: Vec<RecordWarning>,
    pub stats: ParseStats,
}

/// Timing and size figures for one parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseStats {
    pub page_count: usize,
    pub tables_found: usize,
    /// Characters of extracted text before the prompt cap.
    pub text_chars: usize,
    pub prompt_chars: usize,
    pub completion_chars: usize,
    /// Model calls made, including the successful one.
    pub model_attempts: u32,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub extract_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl StatementOutput {
    /// Drop the diagnostics and keep the records.
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }
}
