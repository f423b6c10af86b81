//! The extraction prompt sent to the model.
//!
//! The prompt is a pure function of the extracted content: no configuration,
//! no clock, no randomness. The same PDF always produces the same prompt,
//! which keeps model behaviour reproducible and lets tests inspect it.

use crate::pipeline::extract::ExtractedContent;

/// Characters of statement text embedded in the prompt. Anything beyond is dropped.
pub const MAX_PROMPT_TEXT_CHARS: usize = 8000;

/// Tables embedded in the prompt. Later tables are dropped.
pub const MAX_PROMPT_TABLES: usize = 3;

/// Placeholder used when the document had no detectable tables.
pub const NO_TABLES: &str = "No tables found";

const PREAMBLE: &str = r#"You are a financial data extraction expert. Extract all transactions from this bank statement.

INSTRUCTIONS:
1. Extract each transaction with: date, particulars, amount, transaction_type (DR/CR), balance, reference_no, value_date, narration, cheque_no
2. Handle different bank formats (ICICI, SBI, Axis, Yes Bank, etc.)
3. Return ONLY valid JSON array of transactions"#;

const OUTPUT_FORMAT: &str = r#"OUTPUT FORMAT:
[
  {
    "date": "15/03/2024",
    "particulars": "ATM WITHDRAWAL",
    "amount": 1000.00,
    "transaction_type": "DR",
    "balance": 5000.00,
    "reference_no": "TXN123456",
    "value_date": "15/03/2024",
    "narration": "ATM withdrawal",
    "cheque_no": null
  }
]

Return ONLY the JSON array, no additional text."#;

/// Build the extraction prompt for `content`.
pub fn build_prompt(content: &ExtractedContent) -> String {
    let text = truncate_chars(&content.text, MAX_PROMPT_TEXT_CHARS);
    let tables = render_tables(content);

    format!("\n{PREAMBLE}\n\nTEXT CONTENT:\n{text}\n\nTABLES:\n{tables}\n\n{OUTPUT_FORMAT}\n")
}

/// The first `max_chars` characters of `s` (never splits a code point).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

fn render_tables(content: &ExtractedContent) -> String {
    if content.tables.is_empty() {
        return NO_TABLES.to_string();
    }
    let shown = &content.tables[..content.tables.len().min(MAX_PROMPT_TABLES)];
    serde_json::to_string_pretty(shown).unwrap_or_else(|_| NO_TABLES.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::ExtractedTable;

    fn table(page: usize, idx: usize, marker: &str) -> ExtractedTable {
        ExtractedTable {
            page,
            table: idx,
            data: vec![vec![Some(marker.to_string()), None]],
        }
    }

    #[test]
    fn text_is_truncated_to_exactly_8000_chars() {
        let long = format!("{}{}", "a".repeat(MAX_PROMPT_TEXT_CHARS), "OVERFLOW");
        let content = ExtractedContent {
            text: long,
            tables: vec![],
            page_count: 1,
        };
        let prompt = build_prompt(&content);
        assert!(prompt.contains(&"a".repeat(MAX_PROMPT_TEXT_CHARS)));
        assert!(!prompt.contains("OVERFLOW"));
        assert!(!prompt.contains(&"a".repeat(MAX_PROMPT_TEXT_CHARS + 1)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let s = "₹".repeat(10);
        assert_eq!(truncate_chars(&s, 4).chars().count(), 4);
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn only_first_three_tables_are_embedded() {
        let content = ExtractedContent {
            text: "statement".into(),
            tables: vec![
                table(1, 1, "T-ONE"),
                table(1, 2, "T-TWO"),
                table(2, 1, "T-THREE"),
                table(3, 1, "T-FOUR"),
            ],
            page_count: 3,
        };
        let prompt = build_prompt(&content);
        assert!(prompt.contains("T-ONE"));
        assert!(prompt.contains("T-THREE"));
        assert!(!prompt.contains("T-FOUR"));
        assert!(prompt.contains("\"page\": 2"));
    }

    #[test]
    fn no_tables_placeholder() {
        let content = ExtractedContent {
            text: "x".into(),
            tables: vec![],
            page_count: 1,
        };
        assert!(build_prompt(&content).contains("TABLES:\nNo tables found"));
    }

    #[test]
    fn prompt_names_every_field_and_is_deterministic() {
        let content = ExtractedContent {
            text: "01/04 SALARY 50,000.00 CR".into(),
            tables: vec![table(1, 1, "cell")],
            page_count: 1,
        };
        let a = build_prompt(&content);
        let b = build_prompt(&content);
        assert_eq!(a, b);
        for field in [
            "date",
            "particulars",
            "amount",
            "transaction_type",
            "balance",
            "reference_no",
            "value_date",
            "narration",
            "cheque_no",
        ] {
            assert!(a.contains(field), "prompt is missing {field}");
        }
        assert!(a.contains("Return ONLY the JSON array"));
    }
}
