//! Response parsing: turn the model's completion text into transactions.
//!
//! Models are asked for a bare JSON array but routinely wrap it in prose or a
//! code fence. [`find_json_array`] scans for the first balanced `[...]` that
//! decodes as an array; each element is then coerced on its own so one bad
//! record costs one record, not the statement.

use crate::error::{BankParserError, RecordWarning};
use crate::transaction::Transaction;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Records coerced from one completion, plus the elements that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<RecordWarning>,
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

/// Parse a completion into transactions.
///
/// Fails only when no JSON array can be found at all; individual elements
/// that cannot be coerced are reported in [`ParsedResponse::skipped`].
pub fn parse_response(text: &str) -> Result<ParsedResponse, BankParserError> {
    let records = decode_array(text)?;
    debug!("Decoded JSON array with {} elements", records.len());

    let mut parsed = ParsedResponse::default();
    for (index, value) in records.iter().enumerate() {
        match coerce_record(index, value) {
            Ok(txn) => parsed.transactions.push(txn),
            Err(warning) => {
                warn!("{}", warning);
                parsed.skipped.push(warning);
            }
        }
    }
    Ok(parsed)
}

fn decode_array(text: &str) -> Result<Vec<Value>, BankParserError> {
    if let Some(candidate) = find_json_array(text) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(candidate) {
            return Ok(items);
        }
    }

    let trimmed = text.trim();
    let body = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed,
    };

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(BankParserError::Parsing {
            detail: format!("expected a JSON array, got {}", json_kind(&other)),
            source: None,
        }),
        Err(e) => Err(BankParserError::parsing(
            "no JSON array found in model response",
            e,
        )),
    }
}

/// The first balanced `[...]` in `text` that decodes as a JSON array of
/// records: empty, or holding at least one object.
///
/// Brackets inside string literals are ignored. A candidate that fails to
/// decode, or holds only scalars (a footnote such as `[1]`), is abandoned
/// and scanning resumes at the next `[`.
pub fn find_json_array(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        if let Some(candidate) = balanced_array_at(&text[start..]) {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(candidate) {
                if items.is_empty() || items.iter().any(Value::is_object) {
                    return Some(candidate);
                }
            }
        }
        from = start + 1;
    }
    None
}

/// `s` starts with `[`; return the slice up to its matching `]`.
fn balanced_array_at(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Coerce one array element into a [`Transaction`].
pub fn coerce_record(index: usize, value: &Value) -> Result<Transaction, RecordWarning> {
    let skip = |reason: String| RecordWarning { index, reason };

    let Value::Object(obj) = value else {
        return Err(skip(format!("expected an object, got {}", json_kind(value))));
    };

    let amount = match obj.get("amount") {
        None => 0.0,
        Some(v) => coerce_number(v).map_err(|e| skip(format!("amount {}", e)))?,
    };

    let balance = match obj.get("balance") {
        Some(v) if !is_falsy(v) => {
            Some(coerce_number(v).map_err(|e| skip(format!("balance {}", e)))?)
        }
        _ => None,
    };

    Ok(Transaction {
        date: text_or(obj, "date", ""),
        particulars: text_or(obj, "particulars", ""),
        amount,
        transaction_type: match obj.get("transaction_type") {
            None => "DR".to_string(),
            Some(_) => text_or(obj, "transaction_type", ""),
        },
        balance,
        reference_no: optional_text(obj, "reference_no"),
        value_date: optional_text(obj, "value_date"),
        narration: optional_text(obj, "narration"),
        cheque_no: optional_text(obj, "cheque_no"),
    })
}

fn coerce_number(value: &Value) -> Result<f64, String> {
    let n = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{} is out of range", n))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{:?} is not a number", s))?,
        other => return Err(format!("has unsupported type {}", json_kind(other))),
    };
    if n.is_finite() {
        Ok(n)
    } else {
        Err(format!("{} is not finite", n))
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn text_or(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    optional_text(obj, key).unwrap_or_else(|| default.to_string())
}

fn optional_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
