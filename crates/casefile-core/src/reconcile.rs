//! Category reconciliation
//!
//! After a user edits categories, the case's stored transactions are rebuilt into
//! the analyzer's transaction-sheet shape and sent back for summary and
//! opportunity recomputation. The recomputed aggregates are upserted, then the
//! edited categories are written in one bulk update.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::aggregates::{build_summary, sum_opportunity_to_earn};
use crate::analyzer::{Analyzer, CategoryEditRequest, CategoryTotal};
use crate::error::{Error, Result};
use crate::ingest::Pipeline;
use crate::models::{CategoryEdit, Transaction, TransactionType};

/// Outcome of a reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub case_id: i64,
    /// Distinct transactions the edits asked to change
    pub requested: usize,
    /// Rows whose category was rewritten
    pub updated: usize,
    pub opportunity_updated: bool,
}

/// One row of the analyzer's transaction sheet, rebuilt from a stored transaction
pub fn sheet_row(tx: &Transaction, category: &str) -> Value {
    let (debit, credit) = match tx.transaction_type {
        TransactionType::Credit => (Value::Null, json!(tx.amount)),
        TransactionType::Debit => (json!(tx.amount), Value::Null),
    };

    json!({
        "transactionId": tx.id,
        "Value Date": tx.date.format("%d-%m-%Y").to_string(),
        "Description": tx.description,
        "Debit": debit,
        "Credit": credit,
        "Balance": tx.balance,
        "Bank": tx.bank,
        "Entity": tx.entity,
        "Category": category,
        "oldCategory": tx.category,
        "Month": tx.date.format("%b-%Y").to_string(),
        "Date": tx.date.day(),
    })
}

/// Credit/debit totals per category, sorted by category name
pub fn category_table<'a>(rows: impl IntoIterator<Item = (&'a Transaction, &'a str)>) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, CategoryTotal> = BTreeMap::new();
    for (tx, category) in rows {
        let entry = totals.entry(category).or_insert_with(|| CategoryTotal {
            category: category.to_string(),
            credit: 0.0,
            debit: 0.0,
            count: 0,
        });
        match tx.transaction_type {
            TransactionType::Credit => entry.credit += tx.amount,
            TransactionType::Debit => entry.debit += tx.amount,
        }
        entry.count += 1;
    }
    totals.into_values().collect()
}

impl Pipeline {
    /// Recompute a case's aggregates for user-edited categories and persist the edits
    pub async fn reconcile_categories(
        &self,
        edits: &[CategoryEdit],
        case_id: i64,
    ) -> Result<ReconcileReport> {
        let case = self
            .db
            .get_case(case_id)?
            .ok_or_else(|| Error::NotFound(format!("Case {}", case_id)))?;

        if let Some(blank) = edits.iter().find(|e| e.category.trim().is_empty()) {
            return Err(Error::InvalidData(format!(
                "Empty category for transaction {}",
                blank.transaction_id
            )));
        }

        let transactions = self.db.list_transactions_for_case(case_id)?;
        let edited: HashMap<i64, &str> = edits
            .iter()
            .map(|e| (e.transaction_id, e.category.trim()))
            .collect();

        let unknown = edited
            .keys()
            .filter(|id| !transactions.iter().any(|t| t.id == **id))
            .count();
        if unknown > 0 {
            warn!(case_id, unknown, "Edits reference transactions outside the case");
        }

        let effective: Vec<(&Transaction, &str)> = transactions
            .iter()
            .map(|t| {
                let category = edited.get(&t.id).copied().unwrap_or(t.category.as_str());
                (t, category)
            })
            .collect();

        let request = CategoryEditRequest {
            transaction_sheet: effective
                .iter()
                .map(|(tx, category)| sheet_row(tx, category))
                .collect(),
            category_table: category_table(effective.iter().copied()),
            eod: self
                .db
                .get_eod(case_id)?
                .map(|record| record.data)
                .unwrap_or_default(),
            ca_id: case.name.clone(),
        };

        let response = self.analyzer.recompute_categories(&request).await?;
        let payload = response.payload()?;

        let summary = build_summary(Some(&payload))?;
        self.db.upsert_summary(case_id, &summary)?;

        let opportunity_updated = match sum_opportunity_to_earn(payload.get("Opportunity to Earn"))? {
            Some(values) => {
                self.db.upsert_opportunity_to_earn(case_id, &values)?;
                true
            }
            None => false,
        };

        let trimmed: Vec<CategoryEdit> = edits
            .iter()
            .map(|e| CategoryEdit {
                transaction_id: e.transaction_id,
                category: e.category.trim().to_string(),
            })
            .collect();
        let updated = self.db.bulk_update_categories(case_id, &trimmed)?;

        info!(
            case_id,
            requested = edited.len(),
            updated,
            "Reconciled categories"
        );

        Ok(ReconcileReport {
            case_id,
            requested: edited.len(),
            updated,
            opportunity_updated,
        })
    }
}
