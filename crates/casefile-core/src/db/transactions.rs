//! Transaction operations

use std::collections::BTreeMap;

use rusqlite::{params, params_from_iter, types::Value as SqlValue};
use tracing::{debug, info};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{CategoryEdit, NewTransaction, Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str =
    "t.id, t.statement_id, t.date, t.description, t.amount, t.type, t.category, t.balance, t.bank, t.entity";

/// Edits per UPDATE statement (3 bound parameters each, under SQLite's 999 limit)
const EDITS_PER_UPDATE: usize = 300;

impl Database {
    /// Whether a row with the same (statement, date, amount, description) already exists
    pub fn transaction_exists(&self, statement_id: i64, tx: &NewTransaction) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions
                           WHERE statement_id = ? AND date = ? AND amount = ? AND description = ?)",
            params![
                statement_id.to_string(),
                tx.date.to_string(),
                tx.amount,
                tx.description
            ],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Write one statement's transactions, skipping rows that already exist
    ///
    /// Rows are inserted in chunks of `chunk_size`, each chunk in its own SQLite
    /// transaction; chunks committed before a failure stay committed. Returns the
    /// number of rows actually written.
    pub fn insert_transactions_deduplicated(
        &self,
        statement_id: i64,
        transactions: &[NewTransaction],
        chunk_size: usize,
    ) -> Result<usize> {
        let mut unique = Vec::with_capacity(transactions.len());
        for tx in transactions {
            if self.transaction_exists(statement_id, tx)? {
                info!(
                    statement_id,
                    date = %tx.date,
                    amount = tx.amount,
                    "Skipping duplicate transaction: {}",
                    tx.description
                );
            } else {
                unique.push(tx);
            }
        }

        if unique.is_empty() {
            return Ok(0);
        }

        if !self.statement_exists(statement_id)? {
            return Err(Error::StatementNotFound(statement_id));
        }

        let statement_key = statement_id.to_string();
        let mut conn = self.conn()?;
        let mut inserted = 0;

        for (index, chunk) in unique.chunks(chunk_size.max(1)).enumerate() {
            let db_tx = conn.transaction()?;
            {
                // The unique index also absorbs duplicates within the batch itself
                let mut stmt = db_tx.prepare(
                    r#"
                    INSERT OR IGNORE INTO transactions
                        (statement_id, date, description, amount, type, category, balance, bank, entity)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )?;
                for tx in chunk {
                    inserted += stmt.execute(params![
                        statement_key,
                        tx.date.to_string(),
                        tx.description,
                        tx.amount,
                        tx.transaction_type.as_str(),
                        tx.category,
                        tx.balance,
                        tx.bank,
                        tx.entity,
                    ])?;
                }
            }
            db_tx.commit()?;
            debug!(statement_id, chunk = index, rows = chunk.len(), "Committed transaction chunk");
        }

        Ok(inserted)
    }

    /// All transactions of a case, oldest first
    pub fn list_transactions_for_case(&self, case_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t
             JOIN statements s ON t.statement_id = CAST(s.id AS TEXT)
             WHERE s.case_id = ?
             ORDER BY t.date, t.id",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![case_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Transactions of a case in one category, optionally only credits or debits
    pub fn list_transactions_by_category(
        &self,
        case_id: i64,
        category: &str,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut sql = format!(
            "SELECT {} FROM transactions t
             JOIN statements s ON t.statement_id = CAST(s.id AS TEXT)
             WHERE s.case_id = ? AND t.category = ?",
            TRANSACTION_COLUMNS
        );
        let mut values: Vec<SqlValue> = vec![case_id.into(), category.to_string().into()];
        if let Some(kind) = transaction_type {
            sql.push_str(" AND t.type = ?");
            values.push(kind.as_str().to_string().into());
        }
        sql.push_str(" ORDER BY t.date, t.id");

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_from_iter(values), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    pub fn count_transactions_for_case(&self, case_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions t
             JOIN statements s ON t.statement_id = CAST(s.id AS TEXT)
             WHERE s.case_id = ?",
            params![case_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_transactions_for_statement(&self, statement_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE statement_id = ?",
            params![statement_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Rewrite categories for a set of transactions of one case
    ///
    /// Each batch is a single `UPDATE ... SET category = CASE id WHEN ... END
    /// WHERE id IN (...)`. Rows outside the case are never touched; when an id
    /// appears more than once the last edit wins. Returns the number of rows changed.
    pub fn bulk_update_categories(&self, case_id: i64, edits: &[CategoryEdit]) -> Result<usize> {
        let latest: BTreeMap<i64, &str> = edits
            .iter()
            .map(|e| (e.transaction_id, e.category.as_str()))
            .collect();
        if latest.is_empty() {
            return Ok(0);
        }

        let pairs: Vec<(i64, &str)> = latest.into_iter().collect();
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        let mut changed = 0;

        for batch in pairs.chunks(EDITS_PER_UPDATE) {
            let whens = "WHEN ? THEN ? ".repeat(batch.len());
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!(
                "UPDATE transactions SET category = CASE id {}END
                 WHERE id IN ({})
                   AND statement_id IN (SELECT CAST(id AS TEXT) FROM statements WHERE case_id = ?)",
                whens, placeholders
            );

            let mut values: Vec<SqlValue> = Vec::with_capacity(batch.len() * 3 + 1);
            for (id, category) in batch {
                values.push((*id).into());
                values.push(category.to_string().into());
            }
            values.extend(batch.iter().map(|(id, _)| SqlValue::from(*id)));
            values.push(case_id.into());

            changed += db_tx.execute(&sql, params_from_iter(values))?;
        }

        db_tx.commit()?;
        info!(case_id, requested = pairs.len(), changed, "Bulk category update");
        Ok(changed)
    }

    /// Column order: id, statement_id, date, description, amount, type, category, balance, bank, entity
    fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let type_str: String = row.get(5)?;
        Ok(Transaction {
            id: row.get(0)?,
            statement_id: row.get(1)?,
            date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            description: row.get(3)?,
            amount: row.get(4)?,
            transaction_type: type_str.parse().unwrap_or(TransactionType::Debit),
            category: row.get(6)?,
            balance: row.get(7)?,
            bank: row.get(8)?,
            entity: row.get(9)?,
        })
    }
}
