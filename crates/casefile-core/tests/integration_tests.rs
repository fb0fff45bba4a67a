//! Integration tests for casefile-core
//!
//! These tests exercise the full upload → analyze → persist → reconcile workflow.

use casefile_core::{
    test_utils::{envelope, MockAnalyzerServer},
    AnalyzeResponse, AnalyzerClient, CaseStatus, CategoryEdit, Database, IngestSettings,
    MockAnalyzer, Pipeline, TransactionType, UploadedFile,
};
use serde_json::json;

/// Analyzer payload covering three banks
///
/// Contains:
/// - 2 HDFC rows, 1 SBI row, 2 ICICI rows (one ICICI row has no amount)
/// - an EOD grid with Total/Average rows
/// - summary buckets and opportunity rows in the product form
fn three_bank_analysis() -> String {
    json!({
        "Transactions": [
            {"Value Date": "06-04-2023", "Description": "UPI/QURESHI", "Credit": 17000, "Debit": null,
             "Balance": 17190, "Bank": "HDFC", "Category": "Upi-cr", "Entity": "qureshi"},
            {"Value Date": "07-04-2023", "Description": "ATM WDL", "Credit": null, "Debit": 2000,
             "Balance": 15190, "Bank": "HDFC", "Category": "Cash Withdrawal"},
            {"Value Date": "08-04-2023", "Description": "NEFT RENT", "Credit": null, "Debit": 12000,
             "Balance": 3000, "Bank": "SBI", "Category": "Rent"},
            {"Value Date": "09-04-2023", "Description": "SALARY APR", "Credit": 55000, "Debit": null,
             "Balance": "58,000", "Bank": "ICICI", "Category": "Salary"},
            {"Value Date": "10-04-2023", "Description": "OPENING BAL", "Credit": null, "Debit": null,
             "Balance": 3000, "Bank": "ICICI"}
        ],
        "EOD": [
            {"Day": 1, "Apr-2023": 190.0},
            {"Day": 6, "Apr-2023": 17190.0},
            {"Day": "Total", "Apr-2023": 17380.0},
            {"Day": "Average", "Apr-2023": 8690.0}
        ],
        "Particulars": [{"Particulars": "Total Credit", "Apr-2023": 72000}],
        "Income Receipts": [{"Particulars": "Salary", "Apr-2023": 55000}],
        "Important Expenses": [{"Particulars": "Rent", "Apr-2023": 12000}],
        "Other Expenses": [],
        "Opportunity to Earn": [
            {"Product": "Home Loan", "Amount": 400000},
            {"Product": "Term Plan", "Amount": "25000"}
        ]
    })
    .to_string()
}

fn upload(bank: &str, name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        bank_name: bank.to_string(),
        content: Some(b"%PDF-1.4 statement".to_vec()),
        password: None,
        start_date: Some("01-04-2023".into()),
        end_date: Some("30-04-2023".into()),
    }
}

fn pipeline(mock: &MockAnalyzer, temp_dir: &std::path::Path) -> Pipeline {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    Pipeline::new(
        db,
        AnalyzerClient::mock(mock.clone()),
        IngestSettings {
            temp_dir: temp_dir.to_path_buf(),
            chunk_size: 2,
            owner_id: 7,
        },
    )
}

// =============================================================================
// Ingestion Integration Tests
// =============================================================================

#[tokio::test]
async fn test_full_ingest_workflow() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(three_bank_analysis()));
    let pipeline = pipeline(&mock, temp.path());

    let report = pipeline
        .ingest(
            vec![
                upload("HDFC", "hdfc.pdf"),
                upload("SBI", "sbi.pdf"),
                upload("ICICI", "icici.pdf"),
            ],
            "Acme Traders",
        )
        .await
        .expect("ingestion should succeed");

    assert_eq!(report.status, CaseStatus::Success);
    assert_eq!(report.processed.len(), 3);
    assert_eq!(report.total_transactions, 4);
    assert!(report.failed_files.is_empty());
    assert!(report.successful_files.iter().all(|p| !p.exists()));

    let db = pipeline.db();
    let case = db.get_case(report.case_id).unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Success);
    assert_eq!(case.owner_id, 7);
    assert_eq!(db.count_statements(case.id).unwrap(), 3);
    assert_eq!(db.count_transactions_for_case(case.id).unwrap(), 4);

    let eod = db.get_eod(case.id).unwrap().unwrap();
    assert_eq!(eod.data.len(), 2);

    let summary = db.get_summary(case.id).unwrap().unwrap();
    assert_eq!(summary.data.income_receipts.len(), 1);

    let opportunity = db.get_opportunity_to_earn(case.id).unwrap().unwrap();
    assert_eq!(opportunity.values.home_loan_value, 400_000.0);
    assert_eq!(opportunity.values.term_plan, 25_000.0);

    let sent = mock.analyze_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bank_names, vec!["HDFC", "SBI", "ICICI"]);
    assert_eq!(sent[0].ca_id, "Acme Traders");
}

#[tokio::test]
async fn test_partial_failure_keeps_other_files() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(three_bank_analysis()));
    let pipeline = pipeline(&mock, temp.path());

    // Make the second file's statement write fail
    pipeline
        .db()
        .conn()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER fail_sbi BEFORE INSERT ON statements
             WHEN NEW.bank_name = 'SBI'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let report = pipeline
        .ingest(
            vec![
                upload("HDFC", "hdfc.pdf"),
                upload("SBI", "sbi.pdf"),
                upload("ICICI", "icici.pdf"),
            ],
            "Partial",
        )
        .await
        .expect("file-level failures do not abort the run");

    assert_eq!(report.status, CaseStatus::Failed);
    assert_eq!(report.successful_files.len(), 2);
    assert_eq!(report.failed_files.len(), 1);
    assert!(report.failed_files[0].to_string_lossy().ends_with("-sbi.pdf"));
    assert_eq!(report.total_transactions, 3);

    let db = pipeline.db();
    assert_eq!(db.count_statements(report.case_id).unwrap(), 2);
    assert_eq!(
        db.get_case(report.case_id).unwrap().unwrap().status,
        CaseStatus::Failed
    );

    // Failed upload retained for inspection, successful ones removed
    let retained: Vec<_> = std::fs::read_dir(pipeline.failed_dir("Partial"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(retained.len(), 1);
    assert!(report.successful_files.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_reingest_reuses_case_and_drops_repeated_rows() {
    let temp = tempfile::tempdir().unwrap();
    let row = json!({"Value Date": "06-04-2023", "Description": "UPI/QURESHI", "Credit": 17000,
                     "Balance": 17190, "Bank": "HDFC"});
    let repeated = json!({"Transactions": [row.clone(), row.clone(), row]}).to_string();
    let mock = MockAnalyzer::new().with_analysis(AnalyzeResponse::with_data(repeated));
    let pipeline = pipeline(&mock, temp.path());

    let first = pipeline
        .ingest(vec![upload("HDFC", "hdfc.pdf")], "Dedup")
        .await
        .unwrap();
    assert_eq!(first.processed[0].valid_transactions, 3);
    assert_eq!(first.total_transactions, 1);

    let second = pipeline
        .ingest(vec![upload("HDFC", "hdfc.pdf")], "  Dedup ")
        .await
        .unwrap();
    assert_eq!(second.case_id, first.case_id);
    assert_eq!(second.total_transactions, 1);

    let db = pipeline.db();
    assert_eq!(db.list_cases().unwrap().len(), 1);
    assert_eq!(db.count_statements(first.case_id).unwrap(), 2);
    for processed in first.processed.iter().chain(&second.processed) {
        assert_eq!(
            db.count_transactions_for_statement(processed.statement_id)
                .unwrap(),
            1
        );
    }
}

#[tokio::test]
async fn test_reconcile_after_ingest() {
    let temp = tempfile::tempdir().unwrap();
    let recomputed = json!({
        "Particulars": [],
        "Income Receipts": [{"Particulars": "Salary", "Apr-2023": 72000}],
        "Important Expenses": [],
        "Other Expenses": [{"Particulars": "Rent", "Apr-2023": 12000}],
        "Opportunity to Earn": [{"Maximum Home Loan Value": 900000}]
    })
    .to_string();
    let mock = MockAnalyzer::new()
        .with_analysis(AnalyzeResponse::with_data(three_bank_analysis()))
        .with_recompute(casefile_core::CategoryEditResponse::with_data(recomputed));
    let pipeline = pipeline(&mock, temp.path());

    let report = pipeline
        .ingest(vec![upload("HDFC", "hdfc.pdf")], "Reconcile")
        .await
        .unwrap();

    let db = pipeline.db();
    let upi = db
        .list_transactions_by_category(report.case_id, "Upi-cr", Some(TransactionType::Credit))
        .unwrap();
    assert_eq!(upi.len(), 1);

    let outcome = pipeline
        .reconcile_categories(
            &[CategoryEdit {
                transaction_id: upi[0].id,
                category: "Salary".into(),
            }],
            report.case_id,
        )
        .await
        .unwrap();
    assert_eq!(outcome.updated, 1);

    assert!(db
        .list_transactions_by_category(report.case_id, "Upi-cr", None)
        .unwrap()
        .is_empty());
    assert_eq!(
        db.list_transactions_by_category(report.case_id, "Salary", None)
            .unwrap()
            .len(),
        1
    );
    let summary = db.get_summary(report.case_id).unwrap().unwrap();
    assert_eq!(summary.data.other_expenses.len(), 1);
    let opportunity = db.get_opportunity_to_earn(report.case_id).unwrap().unwrap();
    assert_eq!(opportunity.values.home_loan_value, 900_000.0);
    assert_eq!(opportunity.values.term_plan, 0.0);

    let sent = mock.recompute_requests();
    assert_eq!(sent[0].transaction_sheet.len(), 2);
    assert_eq!(sent[0].eod.len(), 2);
}

// =============================================================================
// HTTP Analyzer Integration Tests
// =============================================================================

#[tokio::test]
async fn test_ingest_over_http() {
    let temp = tempfile::tempdir().unwrap();
    let server = MockAnalyzerServer::start().await;
    server.respond_analyze(200, envelope(&three_bank_analysis()));

    let db = Database::in_memory().unwrap();
    let analyzer = AnalyzerClient::http(&server.settings()).unwrap();
    let pipeline = Pipeline::new(
        db,
        analyzer,
        IngestSettings {
            temp_dir: temp.path().to_path_buf(),
            ..IngestSettings::default()
        },
    );

    let report = pipeline
        .ingest(vec![upload("ICICI", "icici.pdf")], "Over HTTP")
        .await
        .unwrap();

    assert_eq!(report.status, CaseStatus::Success);
    assert_eq!(report.total_transactions, 1);
    let tx = &pipeline
        .db()
        .list_transactions_for_case(report.case_id)
        .unwrap()[0];
    assert_eq!(tx.balance, 58_000.0);

    let received = server.analyze_requests();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["bank_names"], json!(["ICICI"]));
    assert_eq!(received[0]["start_date"], json!(["01-04-2023"]));
}

#[tokio::test]
async fn test_http_analyzer_failure_fails_case() {
    let temp = tempfile::tempdir().unwrap();
    let server = MockAnalyzerServer::start().await;
    server.respond_analyze(400, r#"{"detail": "Unsupported bank: XYZ"}"#);

    let pipeline = Pipeline::new(
        Database::in_memory().unwrap(),
        AnalyzerClient::http(&server.settings()).unwrap(),
        IngestSettings {
            temp_dir: temp.path().to_path_buf(),
            ..IngestSettings::default()
        },
    );

    let failure = pipeline
        .ingest(vec![upload("XYZ", "xyz.pdf")], "Rejected")
        .await
        .unwrap_err();

    assert_eq!(failure.status_code(), 400);
    assert!(failure.to_string().contains("Unsupported bank: XYZ"));
    assert_eq!(failure.failed_files.len(), 1);

    let case_id = failure.case_id.unwrap();
    assert_eq!(
        pipeline.db().get_case(case_id).unwrap().unwrap().status,
        CaseStatus::Failed
    );
}
