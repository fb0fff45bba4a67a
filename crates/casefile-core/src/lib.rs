//! Casefile Core Library
//!
//! Shared functionality for the Casefile statement ingestion tool:
//! - Database access and migrations (cases, statements, transactions, aggregates)
//! - Pluggable statement analyzer backends (HTTP service, mock)
//! - Repair and normalization of analyzer output
//! - Deduplicating, chunked transaction writer
//! - Ingestion pipeline with per-file success/failure tracking
//! - Category reconciliation against the analyzer

pub mod aggregates;
pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod sanitize;

/// Test utilities including mock analyzer server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analyzer::{
    AnalyzeRequest, AnalyzeResponse, Analyzer, AnalyzerClient, CategoryEditRequest,
    CategoryEditResponse, CategoryTotal, HttpAnalyzer, MockAnalyzer, NerResults, NotExtracted,
};
pub use config::{AnalyzerSettings, IngestSettings, Settings};
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{IngestFailure, Pipeline};
pub use models::*;
pub use reconcile::ReconcileReport;
