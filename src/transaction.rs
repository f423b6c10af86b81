//! The uniform transaction record and the summary fold over it.

use serde::{Deserialize, Serialize};

/// One line of a bank statement.
///
/// Field order is the CSV column order. Optional fields serialise as `null`
/// rather than being omitted, so every record has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date as printed on the statement (not normalised).
    pub date: String,
    pub particulars: String,
    pub amount: f64,
    /// Usually `DR`, `CR`, `DEBIT` or `CREDIT`; kept verbatim.
    pub transaction_type: String,
    pub balance: Option<f64>,
    pub reference_no: Option<String>,
    pub value_date: Option<String>,
    pub narration: Option<String>,
    pub cheque_no: Option<String>,
}

/// Direction of money movement, derived from `transaction_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Debit,
    Credit,
}

impl Transaction {
    /// A record with only the required fields set.
    pub fn new(
        date: impl Into<String>,
        particulars: impl Into<String>,
        amount: f64,
        transaction_type: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            particulars: particulars.into(),
            amount,
            transaction_type: transaction_type.into(),
            balance: None,
            reference_no: None,
            value_date: None,
            narration: None,
            cheque_no: None,
        }
    }

    /// `Debit` for exactly `DR`/`DEBIT`, `Credit` for exactly `CR`/`CREDIT`.
    /// Matching is case-sensitive; anything else has no direction.
    pub fn direction(&self) -> Option<Direction> {
        match self.transaction_type.as_str() {
            "DR" | "DEBIT" => Some(Direction::Debit),
            "CR" | "CREDIT" => Some(Direction::Credit),
            _ => None,
        }
    }

    /// Dictionary form of the record.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Compact JSON form of the record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Totals over a list of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_transactions: usize,
    pub total_debit: f64,
    pub total_credit: f64,
    /// `total_credit - total_debit`.
    pub net_amount: f64,
}

/// Fold `transactions` into a [`Summary`].
///
/// Records whose type is neither a debit nor a credit are counted in
/// `total_transactions` but contribute to neither total.
pub fn summary(transactions: &[Transaction]) -> Summary {
    if transactions.is_empty() {
        return Summary::default();
    }

    let mut total_debit = 0.0;
    let mut total_credit = 0.0;
    for txn in transactions {
        match txn.direction() {
            Some(Direction::Debit) => total_debit += txn.amount,
            Some(Direction::Credit) => total_credit += txn.amount,
            None => {}
        }
    }

    Summary {
        total_transactions: transactions.len(),
        total_debit,
        total_credit,
        net_amount: total_credit - total_debit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_only_record_round_trips_with_nulls() {
        let txn = Transaction::new("15/03/2024", "ATM WITHDRAWAL", 1000.0, "DR");
        let json = txn.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for key in ["balance", "reference_no", "value_date", "narration", "cheque_no"] {
            assert!(value[key].is_null(), "{key} should be null in {json}");
        }
        assert_eq!(value["date"], "15/03/2024");
        assert_eq!(value["particulars"], "ATM WITHDRAWAL");
        assert_eq!(value["amount"], 1000.0);
        assert_eq!(value["transaction_type"], "DR");

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txn);
    }

    #[test]
    fn to_value_has_all_nine_keys() {
        let value = Transaction::new("01/01/2024", "X", 1.0, "CR").to_value();
        assert_eq!(value.as_object().map(|o| o.len()), Some(9));
    }

    #[test]
    fn summary_of_empty_list_is_zero() {
        let s = summary(&[]);
        assert_eq!(
            s,
            Summary {
                total_transactions: 0,
                total_debit: 0.0,
                total_credit: 0.0,
                net_amount: 0.0,
            }
        );
    }

    #[test]
    fn summary_ignores_unrecognised_types() {
        let txns = vec![
            Transaction::new("d", "p", 100.0, "DR"),
            Transaction::new("d", "p", 250.0, "CR"),
            Transaction::new("d", "p", 40.0, "DEBIT"),
            Transaction::new("d", "p", 10.0, "CREDIT"),
            Transaction::new("d", "p", 999.0, "TRANSFER"),
        ];
        let s = summary(&txns);
        assert_eq!(s.total_transactions, 5);
        assert_eq!(s.total_debit, 140.0);
        assert_eq!(s.total_credit, 260.0);
        assert_eq!(s.net_amount, s.total_credit - s.total_debit);
    }

    #[test]
    fn direction_is_case_sensitive() {
        assert_eq!(Transaction::new("", "", 1.0, "dr").direction(), None);
        assert_eq!(Transaction::new("", "", 1.0, "Credit").direction(), None);
        assert_eq!(
            Transaction::new("", "", 1.0, "DEBIT").direction(),
            Some(Direction::Debit)
        );
    }
}
