//! Error types for Casefile

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The analyzer payload could not be repaired into valid JSON
    #[error("Malformed analyzer response: {0}")]
    MalformedResponse(String),

    /// A single transaction row failed validation (recovered by dropping the row)
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Statement {0} not found")]
    StatementNotFound(i64),

    #[error("Invalid summary data: {0}")]
    InvalidSummary(String),

    #[error("Invalid opportunity-to-earn data: {0}")]
    InvalidOpportunityData(String),

    /// The remote analyzer call itself failed
    #[error("Statement analysis failed{}: {}", status_suffix(.status), .detail)]
    AnalysisFailed { status: Option<u16>, detail: String },
}

impl Error {
    pub fn analysis(detail: impl Into<String>) -> Self {
        Self::AnalysisFailed {
            status: None,
            detail: detail.into(),
        }
    }

    /// HTTP status to report to callers (500 when the failure was not an HTTP response)
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AnalysisFailed {
                status: Some(status),
                ..
            } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
            _ => 500,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
