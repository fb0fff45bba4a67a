//! Case operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Case, CaseOverview, CaseStatus, CaseStatusCounts};

const CASE_COLUMNS: &str = "id, name, owner_id, status, created_at, updated_at";

impl Database {
    /// Resolve a case name to its id, creating a `Pending` case on first use
    ///
    /// Insert-or-get against the UNIQUE name column, so repeated and concurrent
    /// calls for the same name always land on one row.
    pub fn resolve_case(&self, name: &str, owner_id: i64) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Case name must not be empty".into()));
        }

        let conn = self.conn()?;
        let created = conn.execute(
            "INSERT INTO cases (name, owner_id, status) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
            params![name, owner_id, CaseStatus::Pending.as_str()],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM cases WHERE name = ?",
            params![name],
            |row| row.get(0),
        )?;

        if created > 0 {
            info!(case_id = id, case = name, "Created case");
        }
        Ok(id)
    }

    /// Get a case by ID
    pub fn get_case(&self, id: i64) -> Result<Option<Case>> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("SELECT {} FROM cases WHERE id = ?", CASE_COLUMNS),
                params![id],
                Self::row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    /// Get a case by its exact name
    pub fn get_case_by_name(&self, name: &str) -> Result<Option<Case>> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("SELECT {} FROM cases WHERE name = ?", CASE_COLUMNS),
                params![name.trim()],
                Self::row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    pub fn case_name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM cases WHERE name = ?)",
            params![name.trim()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Set a case's status and touch `updated_at`
    pub fn update_case_status(&self, id: i64, status: CaseStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE cases SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Case {}", id)));
        }

        info!(case_id = id, status = %status, "Updated case status");
        Ok(())
    }

    /// List all cases, newest first, each with its statements
    pub fn list_cases(&self) -> Result<Vec<CaseOverview>> {
        let cases = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM cases ORDER BY created_at DESC, id DESC",
                CASE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], Self::row_to_case)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        cases
            .into_iter()
            .map(|case| -> Result<CaseOverview> {
                let statements = self.list_statements(case.id)?;
                Ok(CaseOverview { case, statements })
            })
            .collect()
    }

    /// Case counts by status
    pub fn case_status_counts(&self) -> Result<CaseStatusCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM cases GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = CaseStatusCounts::default();
        for (status, count) in rows {
            counts.total += count;
            match status.parse::<CaseStatus>() {
                Ok(CaseStatus::Pending) => counts.pending += count,
                Ok(CaseStatus::Success) => counts.success += count,
                Ok(CaseStatus::Failed) => counts.failed += count,
                Err(_) => {}
            }
        }
        Ok(counts)
    }

    /// Column order: id, name, owner_id, status, created_at, updated_at
    fn row_to_case(row: &rusqlite::Row) -> rusqlite::Result<Case> {
        let status_str: String = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        let updated_at_str: Option<String> = row.get(5)?;

        Ok(Case {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_id: row.get(2)?,
            status: status_str.parse().unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
            updated_at: updated_at_str.as_deref().map(parse_datetime),
        })
    }
}
