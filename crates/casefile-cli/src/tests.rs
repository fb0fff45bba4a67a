//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::fs;

use casefile_core::analyzer::{AnalyzeResponse, AnalyzerClient, MockAnalyzer};
use casefile_core::db::Database;
use casefile_core::models::CaseStatus;
use casefile_core::{IngestSettings, Pipeline};
use serde_json::json;

use crate::commands::{self, truncate, CaseTarget};

fn analysis() -> String {
    json!({
        "Transactions": [
            {"Value Date": "06-04-2023", "Description": "UPI/QURESHI", "Credit": 17000,
             "Balance": 17190, "Bank": "HDFC", "Category": "Upi-cr"},
            {"Value Date": "07-04-2023", "Description": "ATM WDL", "Debit": 2000,
             "Balance": 15190, "Bank": "HDFC", "Category": "Cash Withdrawal"}
        ],
        "EOD": [{"Day": 6, "Apr-2023": 17190.0}],
        "Income Receipts": [],
        "Opportunity to Earn": [{"Maximum BL Value": 300000}]
    })
    .to_string()
}

fn setup_pipeline(mock: &MockAnalyzer, temp: &tempfile::TempDir) -> Pipeline {
    Pipeline::new(
        Database::in_memory().unwrap(),
        AnalyzerClient::mock(mock.clone()),
        IngestSettings {
            temp_dir: temp.path().join("work"),
            ..IngestSettings::default()
        },
    )
}

fn write_statement(temp: &tempfile::TempDir, name: &str) -> String {
    let path = temp.path().join(name);
    fs::write(&path, b"%PDF-1.4 test").unwrap();
    path.to_string_lossy().into_owned()
}

/// Ingest one HDFC statement, returning the case id
async fn ingest_one(pipeline: &Pipeline, temp: &tempfile::TempDir, case: &str) -> i64 {
    let spec = format!("HDFC={}", write_statement(temp, "hdfc.pdf"));
    let uploads = commands::read_uploads(&[spec], &[], None, None).unwrap();
    commands::cmd_ingest(pipeline, uploads, CaseTarget::Name(case.to_string()))
        .await
        .unwrap();
    pipeline.db().get_case_by_name(case).unwrap().unwrap().id
}

// ========== Argument Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer description", 10), "a longe...");
    assert_eq!(truncate("₹₹₹₹₹₹₹₹₹₹₹₹", 6), "₹₹₹...");
}

#[test]
fn test_parse_file_spec() {
    let (bank, path) = commands::parse_file_spec("HDFC=/tmp/a=b.pdf").unwrap();
    assert_eq!(bank, "HDFC");
    assert_eq!(path.to_string_lossy(), "/tmp/a=b.pdf");

    assert!(commands::parse_file_spec("statement.pdf").is_err());
    assert!(commands::parse_file_spec("=statement.pdf").is_err());
    assert!(commands::parse_file_spec("HDFC=").is_err());
}

#[test]
fn test_read_uploads_matches_passwords_by_position() {
    let temp = tempfile::tempdir().unwrap();
    let first = write_statement(&temp, "one.pdf");
    let second = write_statement(&temp, "two.pdf");
    let specs = vec![
        format!("HDFC={}", first),
        format!("SBI={}", second),
        "ICICI=/definitely/missing.pdf".to_string(),
    ];
    let passwords = vec![String::new(), "s3cret".to_string()];

    let uploads =
        commands::read_uploads(&specs, &passwords, Some("01-04-2023"), None).unwrap();

    assert_eq!(uploads.len(), 3);
    assert_eq!(uploads[0].file_name, "one.pdf");
    assert_eq!(uploads[0].password, None);
    assert_eq!(uploads[1].bank_name, "SBI");
    assert_eq!(uploads[1].password.as_deref(), Some("s3cret"));
    assert_eq!(uploads[1].start_date.as_deref(), Some("01-04-2023"));
    assert!(uploads[2].content.is_none());
}

#[test]
fn test_open_db_unencrypted() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("cli.db");
    let db = commands::open_db(&path, true).unwrap();
    assert!(db.list_cases().unwrap().is_empty());
    assert!(path.exists());
}

// ========== Ingest Command Tests ==========

#[tokio::test]
async fn test_cmd_ingest_creates_case() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(analysis()));
    let pipeline = setup_pipeline(&mock, &temp);

    let case_id = ingest_one(&pipeline, &temp, "Acme").await;

    let db = pipeline.db();
    assert_eq!(
        db.get_case(case_id).unwrap().unwrap().status,
        CaseStatus::Success
    );
    assert_eq!(db.count_transactions_for_case(case_id).unwrap(), 2);

    // Into the same case by id
    let spec = format!("HDFC={}", write_statement(&temp, "hdfc-may.pdf"));
    let uploads = commands::read_uploads(&[spec], &[], None, None).unwrap();
    commands::cmd_ingest(&pipeline, uploads, CaseTarget::Id(case_id))
        .await
        .unwrap();
    assert_eq!(db.count_statements(case_id).unwrap(), 2);
}

#[tokio::test]
async fn test_cmd_ingest_reports_failure() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis_failure(500, "extractor crashed");
    let pipeline = setup_pipeline(&mock, &temp);

    let spec = format!("HDFC={}", write_statement(&temp, "hdfc.pdf"));
    let uploads = commands::read_uploads(&[spec], &[], None, None).unwrap();
    let err = commands::cmd_ingest(&pipeline, uploads, CaseTarget::Name("Broken".into()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("extractor crashed"));
    let case = pipeline.db().get_case_by_name("Broken").unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Failed);
}

#[tokio::test]
async fn test_cmd_ingest_unknown_case_id() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = setup_pipeline(&MockAnalyzer::new(), &temp);

    let spec = format!("HDFC={}", write_statement(&temp, "hdfc.pdf"));
    let uploads = commands::read_uploads(&[spec], &[], None, None).unwrap();
    let result = commands::cmd_ingest(&pipeline, uploads, CaseTarget::Id(404)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_reconcile_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(analysis()));
    let pipeline = setup_pipeline(&mock, &temp);
    let case_id = ingest_one(&pipeline, &temp, "Edits").await;

    let atm = pipeline
        .db()
        .list_transactions_by_category(case_id, "Cash Withdrawal", None)
        .unwrap();
    let edits_path = temp.path().join("edits.json");
    fs::write(
        &edits_path,
        json!([{"transaction_id": atm[0].id, "category": "Travel"}]).to_string(),
    )
    .unwrap();

    commands::cmd_reconcile(&pipeline, case_id, &edits_path)
        .await
        .unwrap();

    let travel = pipeline
        .db()
        .list_transactions_by_category(case_id, "Travel", None)
        .unwrap();
    assert_eq!(travel.len(), 1);
    assert_eq!(mock.recompute_requests().len(), 1);
}

#[tokio::test]
async fn test_cmd_reconcile_rejects_bad_file() {
    let temp = tempfile::tempdir().unwrap();
    let pipeline = setup_pipeline(&MockAnalyzer::new(), &temp);
    let edits_path = temp.path().join("edits.json");
    fs::write(&edits_path, r#"{"not": "a list"}"#).unwrap();

    assert!(commands::cmd_reconcile(&pipeline, 1, &edits_path)
        .await
        .is_err());
    assert!(commands::cmd_reconcile(&pipeline, 1, &temp.path().join("missing.json"))
        .await
        .is_err());
}

// ========== Listing Command Tests ==========

#[test]
fn test_listing_commands_on_empty_db() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_cases_list(&db).is_ok());
    assert!(commands::cmd_opportunities(&db).is_ok());
    assert!(commands::cmd_failed(&db, 1).is_ok());
    assert!(commands::cmd_case_show(&db, 1).is_err());
    assert!(commands::cmd_transactions_list(&db, 1, None, None, 10).is_err());
}

#[tokio::test]
async fn test_listing_commands_after_ingest() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(analysis()));
    let pipeline = setup_pipeline(&mock, &temp);
    let case_id = ingest_one(&pipeline, &temp, "Listed").await;
    let db = pipeline.db();

    assert!(commands::cmd_cases_list(db).is_ok());
    assert!(commands::cmd_case_show(db, case_id).is_ok());
    assert!(commands::cmd_opportunities(db).is_ok());
    assert!(commands::cmd_transactions_list(db, case_id, None, None, 1).is_ok());
    assert!(commands::cmd_transactions_list(db, case_id, Some("Upi-cr"), Some("credit"), 10).is_ok());
    assert!(commands::cmd_transactions_list(db, case_id, Some("Upi-cr"), Some("sideways"), 10).is_err());
}

#[test]
fn test_cmd_status_without_database() {
    let temp = tempfile::tempdir().unwrap();
    assert!(commands::cmd_status(&temp.path().join("none.db"), None, true).is_ok());
}

#[test]
fn test_cmd_status_with_records() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("status.db");
    let db = commands::open_db(&path, true).unwrap();
    let case_id = db.resolve_case("Counted", 1).unwrap();
    db.insert_failed_statement(case_id, &json!({"paths": ["sbi.pdf"]}))
        .unwrap();

    assert!(commands::cmd_status(&path, None, true).is_ok());
    assert_eq!(db.record_counts().unwrap().failed_statements, 1);
}

#[test]
fn test_cmd_status_rejects_bad_config() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("casefile.toml");
    fs::write(&config, "[ingest]\nchunk_size = 0\n").unwrap();

    assert!(commands::cmd_status(&temp.path().join("none.db"), Some(&config), true).is_err());
}
