//! Statement operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewStatement, RecordCounts, Statement};

const STATEMENT_COLUMNS: &str =
    "id, case_id, account_number, customer_name, ifsc_code, bank_name, file_path, created_at";

impl Database {
    /// Create a statement row and return its id
    pub fn insert_statement(&self, statement: &NewStatement) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO statements (case_id, account_number, customer_name, ifsc_code, bank_name, file_path)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                statement.case_id,
                statement.account_number,
                statement.customer_name,
                statement.ifsc_code,
                statement.bank_name,
                statement.file_path,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_statement(&self, id: i64) -> Result<Option<Statement>> {
        let conn = self.conn()?;
        let statement = conn
            .query_row(
                &format!("SELECT {} FROM statements WHERE id = ?", STATEMENT_COLUMNS),
                params![id],
                Self::row_to_statement,
            )
            .optional()?;
        Ok(statement)
    }

    /// Statements of a case, in upload order
    pub fn list_statements(&self, case_id: i64) -> Result<Vec<Statement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM statements WHERE case_id = ? ORDER BY id",
            STATEMENT_COLUMNS
        ))?;
        let statements = stmt
            .query_map(params![case_id], Self::row_to_statement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(statements)
    }

    /// Correct the account holder details extracted for a statement
    pub fn update_statement_holder(
        &self,
        id: i64,
        customer_name: &str,
        account_number: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE statements SET customer_name = ?, account_number = ? WHERE id = ?",
            params![customer_name, account_number, id],
        )?;
        if updated == 0 {
            return Err(Error::StatementNotFound(id));
        }
        Ok(())
    }

    pub fn count_statements(&self, case_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM statements WHERE case_id = ?",
            params![case_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Statement, transaction and failed-extraction totals for the whole store
    pub fn record_counts(&self) -> Result<RecordCounts> {
        let conn = self.conn()?;
        let counts = conn.query_row(
            r#"
            SELECT (SELECT COUNT(*) FROM statements),
                   (SELECT COUNT(*) FROM transactions),
                   (SELECT COUNT(*) FROM failed_statements)
            "#,
            [],
            |row| {
                Ok(RecordCounts {
                    statements: row.get(0)?,
                    transactions: row.get(1)?,
                    failed_statements: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }

    pub(crate) fn statement_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM statements WHERE id = ?)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn row_to_statement(row: &rusqlite::Row) -> rusqlite::Result<Statement> {
        let created_at_str: String = row.get(7)?;
        Ok(Statement {
            id: row.get(0)?,
            case_id: row.get(1)?,
            account_number: row.get(2)?,
            customer_name: row.get(3)?,
            ifsc_code: row.get(4)?,
            bank_name: row.get(5)?,
            file_path: row.get(6)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
