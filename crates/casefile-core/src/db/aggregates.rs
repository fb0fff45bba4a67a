//! Per-case aggregate records: EOD grid, summary, opportunity-to-earn, failed statements
//!
//! EOD, summary and opportunity rows are unique per case and written with
//! `INSERT ... ON CONFLICT(case_id) DO UPDATE`. Failed-statement rows are append-only.

use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{
    EodEntry, EodRecord, FailedStatement, OpportunityListing, OpportunityRecord,
    OpportunityToEarn, SummaryData, SummaryRecord,
};

/// Raw JSON-bearing row before the payload is decoded
struct StoredJson {
    id: i64,
    case_id: i64,
    data: String,
    created_at: String,
    updated_at: Option<String>,
}

impl Database {
    /// Create or replace the EOD grid of a case
    pub fn upsert_eod(&self, case_id: i64, entries: &[EodEntry]) -> Result<()> {
        let data = serde_json::to_string(entries)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO eod (case_id, data) VALUES (?, ?)
             ON CONFLICT(case_id) DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP",
            params![case_id, data],
        )?;
        Ok(())
    }

    pub fn get_eod(&self, case_id: i64) -> Result<Option<EodRecord>> {
        let Some(row) = self.stored_json("eod", case_id)? else {
            return Ok(None);
        };
        Ok(Some(EodRecord {
            id: row.id,
            case_id: row.case_id,
            data: serde_json::from_str(&row.data)?,
            created_at: parse_datetime(&row.created_at),
            updated_at: row.updated_at.as_deref().map(parse_datetime),
        }))
    }

    /// Create or replace the income/expense summary of a case
    pub fn upsert_summary(&self, case_id: i64, summary: &SummaryData) -> Result<()> {
        let data = serde_json::to_string(summary)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO summary (case_id, data) VALUES (?, ?)
             ON CONFLICT(case_id) DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP",
            params![case_id, data],
        )?;
        Ok(())
    }

    pub fn get_summary(&self, case_id: i64) -> Result<Option<SummaryRecord>> {
        let Some(row) = self.stored_json("summary", case_id)? else {
            return Ok(None);
        };
        Ok(Some(SummaryRecord {
            id: row.id,
            case_id: row.case_id,
            data: serde_json::from_str(&row.data)?,
            created_at: parse_datetime(&row.created_at),
            updated_at: row.updated_at.as_deref().map(parse_datetime),
        }))
    }

    /// Create or replace the opportunity-to-earn totals of a case
    pub fn upsert_opportunity_to_earn(&self, case_id: i64, values: &OpportunityToEarn) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO opportunity_to_earn
                (case_id, home_loan_value, loan_against_property, business_loan, term_plan, general_insurance)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(case_id) DO UPDATE SET
                home_loan_value = excluded.home_loan_value,
                loan_against_property = excluded.loan_against_property,
                business_loan = excluded.business_loan,
                term_plan = excluded.term_plan,
                general_insurance = excluded.general_insurance,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                case_id,
                values.home_loan_value,
                values.loan_against_property,
                values.business_loan,
                values.term_plan,
                values.general_insurance,
            ],
        )?;
        Ok(())
    }

    pub fn get_opportunity_to_earn(&self, case_id: i64) -> Result<Option<OpportunityRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, case_id, home_loan_value, loan_against_property, business_loan,
                        term_plan, general_insurance
                 FROM opportunity_to_earn WHERE case_id = ?",
                params![case_id],
                |row| {
                    Ok(OpportunityRecord {
                        id: row.get(0)?,
                        case_id: row.get(1)?,
                        values: OpportunityToEarn {
                            home_loan_value: row.get(2)?,
                            loan_against_property: row.get(3)?,
                            business_loan: row.get(4)?,
                            term_plan: row.get(5)?,
                            general_insurance: row.get(6)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Opportunity totals for every case, with the case name and first statement holder
    pub fn list_opportunities(&self) -> Result<Vec<OpportunityListing>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name,
                   (SELECT s.customer_name FROM statements s WHERE s.case_id = c.id ORDER BY s.id LIMIT 1),
                   o.home_loan_value, o.loan_against_property, o.business_loan,
                   o.term_plan, o.general_insurance
            FROM opportunity_to_earn o
            JOIN cases c ON c.id = o.case_id
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )?;

        let listings = stmt
            .query_map([], |row| {
                Ok(OpportunityListing {
                    case_id: row.get(0)?,
                    case_name: row.get(1)?,
                    customer_name: row.get(2)?,
                    values: OpportunityToEarn {
                        home_loan_value: row.get(3)?,
                        loan_against_property: row.get(4)?,
                        business_loan: row.get(5)?,
                        term_plan: row.get(6)?,
                        general_insurance: row.get(7)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    /// Append an extraction-failure audit row
    pub fn insert_failed_statement(&self, case_id: i64, data: &Value) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO failed_statements (case_id, data) VALUES (?, ?)",
            params![case_id, serde_json::to_string(data)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_failed_statements(&self, case_id: i64) -> Result<Vec<FailedStatement>> {
        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, case_id, data, created_at FROM failed_statements
                 WHERE case_id = ? ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![case_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(|(id, case_id, data, created_at)| -> Result<FailedStatement> {
                Ok(FailedStatement {
                    id,
                    case_id,
                    data: serde_json::from_str(&data)?,
                    created_at: parse_datetime(&created_at),
                })
            })
            .collect()
    }

    fn stored_json(&self, table: &str, case_id: i64) -> Result<Option<StoredJson>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, case_id, data, created_at, updated_at FROM {} WHERE case_id = ?",
                    table
                ),
                params![case_id],
                |row| {
                    Ok(StoredJson {
                        id: row.get(0)?,
                        case_id: row.get(1)?,
                        data: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
