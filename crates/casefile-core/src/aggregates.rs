//! Pre-processing for the per-case aggregates: EOD grid, summary, opportunity-to-earn

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{EodEntry, OpportunityToEarn, SummaryData};
use crate::sanitize::coerce_f64;

/// Clean the analyzer's EOD grid
///
/// `Total`/`Average` day rows are dropped, every remaining field is coerced to a
/// float, and entries with an unparsable day or no month columns are dropped.
pub fn clean_eod_entries(raw: &[Value]) -> Vec<EodEntry> {
    raw.iter()
        .filter_map(Value::as_object)
        .filter(|entry| {
            !matches!(
                entry.get("Day").and_then(Value::as_str).map(str::trim),
                Some("Total") | Some("Average")
            )
        })
        .filter_map(|entry| {
            let day = match entry.get("Day").and_then(coerce_f64) {
                Some(day) => day,
                None => {
                    warn!(day = ?entry.get("Day"), "Dropping EOD entry with unparsable day");
                    return None;
                }
            };

            let balances: BTreeMap<String, f64> = entry
                .iter()
                .filter(|(key, _)| key.as_str() != "Day")
                .filter_map(|(key, value)| coerce_f64(value).map(|v| (key.clone(), v)))
                .collect();

            if balances.is_empty() {
                debug!(day, "Dropping EOD entry without month columns");
                return None;
            }

            Some(EodEntry { day, balances })
        })
        .collect()
}

fn bucket(container: &Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match container.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(Error::InvalidSummary(format!(
            "'{}' must be a list, got {}",
            key,
            json_kind(other)
        ))),
    }
}

/// Build the four summary buckets from an analyzer payload
///
/// The payload itself must be an object; a missing bucket is stored empty.
pub fn build_summary(payload: Option<&Value>) -> Result<SummaryData> {
    let container = payload
        .and_then(Value::as_object)
        .ok_or_else(|| Error::InvalidSummary("summary payload is not an object".into()))?;

    Ok(SummaryData {
        particulars: bucket(container, "Particulars")?,
        income_receipts: bucket(container, "Income Receipts")?,
        important_expenses: bucket(container, "Important Expenses")?,
        other_expenses: bucket(container, "Other Expenses")?,
    })
}

/// Product keywords and the opportunity line each one feeds
const PRODUCT_LINES: [&str; 5] = [
    "Loan Against Property",
    "Home Loan",
    "Business Loan",
    "Term Plan",
    "General Insurance",
];

/// Direct-maxima keys, in the same order as `PRODUCT_LINES`
const MAXIMA_KEYS: [&str; 5] = [
    "Maximum LAP Value",
    "Maximum Home Loan Value",
    "Maximum BL Value",
    "Maximum TP Value",
    "Maximum GI Value",
];

fn add_to_line(totals: &mut OpportunityToEarn, line: usize, amount: f64) {
    match line {
        0 => totals.loan_against_property += amount,
        1 => totals.home_loan_value += amount,
        2 => totals.business_loan += amount,
        3 => totals.term_plan += amount,
        _ => totals.general_insurance += amount,
    }
}

fn sum_row(totals: &mut OpportunityToEarn, row: &Map<String, Value>) {
    if let Some(product) = row.get("Product").and_then(Value::as_str) {
        // Case-insensitive substring match
        let product = product.to_lowercase();
        let line = PRODUCT_LINES
            .iter()
            .position(|name| product.contains(&name.to_lowercase()));
        let amount = row.get("Amount").and_then(coerce_f64);
        if let (Some(line), Some(amount)) = (line, amount) {
            add_to_line(totals, line, amount);
        }
        return;
    }

    for (line, key) in MAXIMA_KEYS.iter().enumerate() {
        if let Some(amount) = row.get(*key).and_then(coerce_f64) {
            add_to_line(totals, line, amount);
        }
    }
}

/// Sum opportunity-to-earn values from either the `Product`/`Amount` row form or
/// the `Maximum ... Value` form
/// Products match a line when their label contains the line name, ignoring case.
/// Returns `Ok(None)` when there is nothing to record. Unmatched products and
/// non-numeric amounts are left out of the sums.
pub fn sum_opportunity_to_earn(payload: Option<&Value>) -> Result<Option<OpportunityToEarn>> {
    let rows: Vec<&Map<String, Value>> = match payload {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Ok(None);
            }
            items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        Error::InvalidOpportunityData(format!(
                            "expected an object row, got {}",
                            json_kind(item)
                        ))
                    })
                })
                .collect::<Result<_>>()?
        }
        Some(Value::Object(obj)) => vec![obj],
        Some(other) => {
            return Err(Error::InvalidOpportunityData(format!(
                "expected a list or object, got {}",
                json_kind(other)
            )))
        }
    };

    let mut totals = OpportunityToEarn::default();
    for row in rows {
        sum_row(&mut totals, row);
    }
    Ok(Some(totals))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
