//! Raw analyzer transaction rows to canonical transactions
//!
//! Rows arrive as loosely-typed JSON objects:
//!
//! ```text
//! {"Value Date": "06-04-2023", "Description": "UPI/...", "Credit": 17000,
//!  "Debit": null, "Balance": 17190, "Bank": "HDFC", "Category": "Upi-cr", "Entity": "..."}
//! ```

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionType};
use crate::sanitize::{coerce_f64, finite_number, has_amount, normalize_numeric_fields};

pub const DEFAULT_CATEGORY: &str = "uncategorized";
pub const UNKNOWN: &str = "unknown";

/// Parse a value date: `DD-MM-YYYY` (the analyzer's format), with `YYYY-MM-DD` accepted too
pub fn parse_value_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    let invalid = || Error::InvalidTransaction(format!("Invalid date format: {}", s));

    if parts.len() != 3 {
        return Err(invalid());
    }

    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;

    let (year, month, day) = if parts[0].trim().len() == 4 {
        (nums[0], nums[1], nums[2])
    } else {
        (nums[2], nums[1], nums[0])
    };

    let year = i32::try_from(year).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn text_field<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Validate one raw row and map it to a canonical transaction
///
/// The result carries no statement id yet; the writer attaches it once the
/// statement row exists.
pub fn normalize_transaction(row: &Map<String, Value>) -> Result<NewTransaction> {
    let value_date = text_field(row, "Value Date")
        .ok_or_else(|| Error::InvalidTransaction("Missing required field: Value Date".into()))?;
    let description = text_field(row, "Description")
        .ok_or_else(|| Error::InvalidTransaction("Missing required field: Description".into()))?;

    let date = parse_value_date(value_date)?;

    let credit = finite_number(row.get("Credit"));
    let debit = finite_number(row.get("Debit"));

    let (amount, transaction_type) = match (credit, debit) {
        (Some(c), _) => (c.abs(), TransactionType::Credit),
        (None, Some(d)) => (d.abs(), TransactionType::Debit),
        (None, None) => {
            return Err(Error::InvalidTransaction(format!(
                "No credit or debit amount for '{}'",
                description
            )))
        }
    };

    let balance = row.get("Balance").and_then(coerce_f64).unwrap_or(0.0);

    Ok(NewTransaction {
        date,
        description: description.to_string(),
        amount,
        transaction_type,
        category: text_field(row, "Category")
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string(),
        balance,
        bank: text_field(row, "Bank").unwrap_or(UNKNOWN).to_string(),
        entity: text_field(row, "Entity").unwrap_or(UNKNOWN).to_string(),
    })
}

/// Sanitize the numeric fields of every row and keep only rows with a usable amount
pub fn ingestable_rows(rows: &[Value]) -> Vec<Map<String, Value>> {
    let total = rows.len();
    let kept: Vec<Map<String, Value>> = rows
        .iter()
        .filter_map(Value::as_object)
        .cloned()
        .map(|mut row| {
            normalize_numeric_fields(&mut row);
            row
        })
        .filter(has_amount)
        .collect();

    debug!(total, kept = kept.len(), "Pre-filtered analyzer transactions");
    kept
}

/// Validate the rows belonging to one bank, dropping (and logging) invalid ones
pub fn normalize_for_bank(rows: &[Map<String, Value>], bank_name: &str) -> Vec<NewTransaction> {
    rows.iter()
        .filter(|row| row.get("Bank").and_then(Value::as_str) == Some(bank_name))
        .filter_map(|row| match normalize_transaction(row) {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!(bank = bank_name, "Invalid transaction skipped: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_value_date_formats() {
        assert_eq!(
            parse_value_date("06-04-2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 6).unwrap()
        );
        assert_eq!(
            parse_value_date("2023-04-06").unwrap(),
            NaiveDate::from_ymd_opt(2023, 4, 6).unwrap()
        );
        assert_eq!(
            parse_value_date("31/12/2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        assert!(parse_value_date("31-02-2023").is_err());
        assert!(parse_value_date("yesterday").is_err());
    }

    #[test]
    fn test_credit_row_normalizes() {
        let tx = normalize_transaction(&row(json!({
            "Value Date": "01-05-2023",
            "Description": "NEFT SALARY",
            "Credit": 500,
            "Debit": null,
            "Balance": 1500,
            "Bank": "HDFC"
        })))
        .unwrap();

        assert_eq!(tx.amount, 500.0);
        assert_eq!(tx.transaction_type, TransactionType::Credit);
        assert_eq!(tx.balance, 1500.0);
        assert_eq!(tx.category, DEFAULT_CATEGORY);
        assert_eq!(tx.bank, "HDFC");
        assert_eq!(tx.entity, UNKNOWN);
    }

    #[test]
    fn test_debit_amount_is_absolute() {
        let tx = normalize_transaction(&row(json!({
            "Value Date": "02-05-2023",
            "Description": "ATM WDL",
            "Credit": null,
            "Debit": -300.0,
            "Category": "Cash Withdrawal"
        })))
        .unwrap();

        assert_eq!(tx.amount, 300.0);
        assert_eq!(tx.transaction_type, TransactionType::Debit);
        assert_eq!(tx.balance, 0.0);
        assert_eq!(tx.category, "Cash Withdrawal");
    }

    #[test]
    fn test_credit_wins_when_both_present() {
        let tx = normalize_transaction(&row(json!({
            "Value Date": "02-05-2023",
            "Description": "REVERSAL",
            "Credit": 10,
            "Debit": 20
        })))
        .unwrap();
        assert_eq!(tx.amount, 10.0);
        assert_eq!(tx.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn test_string_debit_is_rejected() {
        let rows = ingestable_rows(&[json!({
            "Value Date": "02-05-2023",
            "Description": "ATM WDL",
            "Credit": null,
            "Debit": "-300",
            "Bank": "SBI"
        })]);
        assert!(rows.is_empty());

        let err = normalize_transaction(&row(json!({
            "Value Date": "02-05-2023",
            "Description": "ATM WDL",
            "Debit": "-300"
        })))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTransaction(_)));
    }

    #[test]
    fn test_missing_required_fields() {
        let err = normalize_transaction(&row(json!({"Description": "X", "Credit": 1})));
        assert!(matches!(err, Err(Error::InvalidTransaction(_))));

        let err = normalize_transaction(&row(json!({"Value Date": "01-01-2024", "Credit": 1})));
        assert!(matches!(err, Err(Error::InvalidTransaction(_))));

        let err = normalize_transaction(&row(json!({
            "Value Date": "99-99-2024",
            "Description": "X",
            "Credit": 1
        })));
        assert!(matches!(err, Err(Error::InvalidTransaction(_))));
    }

    #[test]
    fn test_normalize_for_bank_filters_and_drops() {
        let rows = ingestable_rows(&[
            json!({"Value Date": "01-01-2024", "Description": "A", "Credit": 1, "Bank": "HDFC"}),
            json!({"Value Date": "bad", "Description": "B", "Credit": 2, "Bank": "HDFC"}),
            json!({"Value Date": "01-01-2024", "Description": "C", "Debit": 3, "Bank": "SBI"}),
            json!("not an object"),
        ]);
        assert_eq!(rows.len(), 3);

        let hdfc = normalize_for_bank(&rows, "HDFC");
        assert_eq!(hdfc.len(), 1);
        assert_eq!(hdfc[0].description, "A");

        let sbi = normalize_for_bank(&rows, "SBI");
        assert_eq!(sbi.len(), 1);
        assert_eq!(sbi[0].transaction_type, TransactionType::Debit);
    }
}
