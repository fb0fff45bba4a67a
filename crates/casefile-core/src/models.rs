//! Domain models for Casefile

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CaseStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown case status: {}", s)),
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A client engagement, identified by its user-chosen unique name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A case together with the statements uploaded against it
#[derive(Debug, Clone, Serialize)]
pub struct CaseOverview {
    #[serde(flatten)]
    pub case: Case,
    pub statements: Vec<Statement>,
}

/// Case counts grouped by status
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaseStatusCounts {
    pub total: i64,
    pub pending: i64,
    pub success: i64,
    pub failed: i64,
}

/// Row totals across every case
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordCounts {
    pub statements: i64,
    pub transactions: i64,
    pub failed_statements: i64,
}

/// Extracted metadata of one uploaded statement document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub case_id: i64,
    pub account_number: String,
    pub customer_name: String,
    pub ifsc_code: Option<String>,
    pub bank_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// A statement to be created (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewStatement {
    pub case_id: i64,
    pub account_number: String,
    pub customer_name: String,
    pub ifsc_code: Option<String>,
    pub bank_name: String,
    pub file_path: String,
}

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" | "cr" => Ok(Self::Credit),
            "debit" | "dr" => Ok(Self::Debit),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Owning statement id (string-typed foreign key)
    pub statement_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Always >= 0; direction lives in `transaction_type`
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: String,
    pub balance: f64,
    pub bank: String,
    pub entity: String,
}

/// A validated transaction not yet attached to a statement
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: String,
    pub balance: f64,
    pub bank: String,
    pub entity: String,
}

/// One day row of the end-of-day balance grid: `{"Day": 5, "Apr-2023": 1200.5, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodEntry {
    #[serde(rename = "Day")]
    pub day: f64,
    #[serde(flatten)]
    pub balances: BTreeMap<String, f64>,
}

/// Stored EOD grid for a case
#[derive(Debug, Clone, Serialize)]
pub struct EodRecord {
    pub id: i64,
    pub case_id: i64,
    pub data: Vec<EodEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Income/expense summary buckets, keyed the way the analyzer names them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    #[serde(rename = "Particulars", default)]
    pub particulars: Vec<Value>,
    #[serde(rename = "Income Receipts", default)]
    pub income_receipts: Vec<Value>,
    #[serde(rename = "Important Expenses", default)]
    pub important_expenses: Vec<Value>,
    #[serde(rename = "Other Expenses", default)]
    pub other_expenses: Vec<Value>,
}

/// Stored summary for a case
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub id: i64,
    pub case_id: i64,
    pub data: SummaryData,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Cross-sell commission potential, one running sum per product line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OpportunityToEarn {
    pub home_loan_value: f64,
    pub loan_against_property: f64,
    pub business_loan: f64,
    pub term_plan: f64,
    pub general_insurance: f64,
}

/// Stored opportunity-to-earn totals for a case
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityRecord {
    pub id: i64,
    pub case_id: i64,
    #[serde(flatten)]
    pub values: OpportunityToEarn,
}

/// Opportunity totals joined with the case and statement holder for display
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityListing {
    pub case_id: i64,
    pub case_name: String,
    pub customer_name: Option<String>,
    #[serde(flatten)]
    pub values: OpportunityToEarn,
}

/// Audit row for an ingestion attempt whose files could not be extracted
#[derive(Debug, Clone, Serialize)]
pub struct FailedStatement {
    pub id: i64,
    pub case_id: i64,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// A statement file handed over by the UI layer
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Original file name (only the basename is used on disk)
    pub file_name: String,
    pub bank_name: String,
    /// Raw file bytes; `None` marks an upload that arrived without content
    pub content: Option<Vec<u8>>,
    pub password: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Per-statement outcome of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedStatement {
    pub statement_id: i64,
    pub bank_name: String,
    pub file_path: PathBuf,
    /// Rows that passed validation for this statement
    pub valid_transactions: usize,
    /// Rows actually written (duplicates excluded)
    pub inserted_transactions: usize,
}

/// Result of a completed ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub case_id: i64,
    pub status: CaseStatus,
    pub processed: Vec<ProcessedStatement>,
    pub total_transactions: usize,
    pub failed_files: Vec<PathBuf>,
    pub successful_files: Vec<PathBuf>,
    /// Raw extraction-failure payload reported by the analyzer, if any
    pub failed_statements: Option<Value>,
}

/// A user's category change for one stored transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEdit {
    pub transaction_id: i64,
    pub category: String,
}
