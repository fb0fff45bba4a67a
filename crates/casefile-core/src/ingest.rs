//! Ingestion orchestrator
//!
//! One run takes a set of uploaded statement files for a case through:
//! staging to disk, one batched analyzer call, payload repair, extraction-failure
//! accounting, per-file statement + transaction writes, the per-case aggregate
//! upserts, and finally case status and temp-file cleanup.
//!
//! Row- and file-level problems are contained (the row is dropped, the file moves
//! to the failure set). Response- and aggregate-level problems end the run, but the
//! case is still finalized and the caller gets the file bookkeeping back in an
//! [`IngestFailure`].

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::aggregates::{build_summary, clean_eod_entries, sum_opportunity_to_earn};
use crate::analyzer::{AnalyzeRequest, Analyzer, AnalyzerClient, NerResults};
use crate::config::IngestSettings;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    CaseStatus, EodEntry, IngestReport, NewStatement, ProcessedStatement, UploadedFile,
};
use crate::normalize::{ingestable_rows, normalize_for_bank};

/// Placeholder for holder details the analyzer could not recognize
pub const UNKNOWN_HOLDER: &str = "UNKNOWN";

/// Directory (under the temp root) where files of failed uploads are kept
pub const FAILED_DIR: &str = "failed_pdfs";

const UPLOAD_DIR: &str = "uploads";

/// A run that ended early, with everything the run had established so far
#[derive(Debug, thiserror::Error)]
#[error("Ingestion failed: {source}")]
pub struct IngestFailure {
    #[source]
    pub source: Error,
    /// Case the run was for, once resolved
    pub case_id: Option<i64>,
    pub successful_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,
    /// Extraction-failure payload reported by the analyzer, if any
    pub failed_statements: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl IngestFailure {
    fn unresolved(source: Error) -> Self {
        Self {
            source,
            case_id: None,
            successful_files: Vec::new(),
            failed_files: Vec::new(),
            failed_statements: None,
            timestamp: Utc::now(),
        }
    }

    /// HTTP-style status for callers that surface the failure over a wire
    pub fn status_code(&self) -> u16 {
        self.source.status_code()
    }
}

/// A file written to the case's upload directory and included in the analyzer request
#[derive(Debug)]
struct StagedFile {
    /// Position in the analyzer request (NER results are indexed by it)
    request_index: usize,
    path: PathBuf,
    bank_name: String,
    password: String,
    start_date: String,
    end_date: String,
}

/// File bookkeeping for one run
#[derive(Debug, Default)]
struct RunState {
    /// Staged, not yet classified as succeeded or failed
    pending: Vec<PathBuf>,
    successful: Vec<PathBuf>,
    failed: Vec<PathBuf>,
    failed_statements: Option<Value>,
}

impl RunState {
    fn fail(&mut self, path: &Path) {
        self.pending.retain(|p| p != path);
        if !self.failed.iter().any(|p| p == path) {
            self.failed.push(path.to_path_buf());
        }
    }

    fn succeed(&mut self, path: &Path) {
        self.pending.retain(|p| p != path);
        self.successful.push(path.to_path_buf());
    }
}

/// Explicitly constructed service handles for ingestion and reconciliation
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) db: Database,
    pub(crate) analyzer: AnalyzerClient,
    pub(crate) settings: IngestSettings,
}

impl Pipeline {
    pub fn new(db: Database, analyzer: AnalyzerClient, settings: IngestSettings) -> Self {
        Self {
            db,
            analyzer,
            settings,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn analyzer(&self) -> &AnalyzerClient {
        &self.analyzer
    }

    /// Ingest files into the case named `case_name`, creating the case on first use
    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        case_name: &str,
    ) -> std::result::Result<IngestReport, IngestFailure> {
        let case_id = self
            .db
            .resolve_case(case_name, self.settings.owner_id)
            .map_err(IngestFailure::unresolved)?;
        self.run(files, case_id, case_name.trim()).await
    }

    /// Ingest additional files into an existing case
    pub async fn ingest_into_case(
        &self,
        files: Vec<UploadedFile>,
        case_id: i64,
    ) -> std::result::Result<IngestReport, IngestFailure> {
        let case = self
            .db
            .get_case(case_id)
            .and_then(|case| case.ok_or_else(|| Error::NotFound(format!("Case {}", case_id))))
            .map_err(IngestFailure::unresolved)?;
        self.run(files, case.id, &case.name).await
    }

    async fn run(
        &self,
        files: Vec<UploadedFile>,
        case_id: i64,
        case_name: &str,
    ) -> std::result::Result<IngestReport, IngestFailure> {
        info!(case_id, case = case_name, files = files.len(), "Starting ingestion");
        let mut state = RunState::default();

        match self.execute(&mut state, files, case_id, case_name).await {
            Ok(report) => {
                info!(
                    case_id,
                    status = %report.status,
                    transactions = report.total_transactions,
                    failed = report.failed_files.len(),
                    "Ingestion finished"
                );
                Ok(report)
            }
            Err(source) => {
                error!(case_id, "Ingestion failed: {}", source);
                if let Err(e) = self.db.update_case_status(case_id, CaseStatus::Failed) {
                    warn!(case_id, "Could not mark case as failed: {}", e);
                }

                let pending = std::mem::take(&mut state.pending);
                state.failed.extend(pending);
                self.cleanup_files(&state, case_name);

                Err(IngestFailure {
                    source,
                    case_id: Some(case_id),
                    successful_files: state.successful,
                    failed_files: state.failed,
                    failed_statements: state.failed_statements,
                    timestamp: Utc::now(),
                })
            }
        }
    }

    async fn execute(
        &self,
        state: &mut RunState,
        files: Vec<UploadedFile>,
        case_id: i64,
        case_name: &str,
    ) -> Result<IngestReport> {
        if files.is_empty() {
            return Err(Error::InvalidData("No statement files provided".into()));
        }

        let staged = self.stage_files(state, files, case_name)?;
        if staged.is_empty() {
            return Err(Error::InvalidData(
                "None of the uploaded files had any content".into(),
            ));
        }

        let request = AnalyzeRequest {
            bank_names: staged.iter().map(|f| f.bank_name.clone()).collect(),
            pdf_paths: staged
                .iter()
                .map(|f| f.path.to_string_lossy().into_owned())
                .collect(),
            passwords: staged.iter().map(|f| f.password.clone()).collect(),
            start_date: staged.iter().map(|f| f.start_date.clone()).collect(),
            end_date: staged.iter().map(|f| f.end_date.clone()).collect(),
            ca_id: case_name.to_string(),
        };
        let response = self.analyzer.analyze_statements(&request).await?;

        if let Some(not_extracted) = &response.pdf_paths_not_extracted {
            let payload = serde_json::to_value(not_extracted)?;
            self.db.insert_failed_statement(case_id, &payload)?;
            state.failed_statements = Some(payload);

            for reported in &not_extracted.paths {
                for file in staged.iter().filter(|f| same_upload(&f.path, reported)) {
                    warn!(case_id, file = %file.path.display(), "Analyzer could not extract statement");
                    state.fail(&file.path);
                }
            }
        }

        let payload = response.payload()?;

        let rows = payload
            .get("Transactions")
            .and_then(Value::as_array)
            .map(|rows| ingestable_rows(rows))
            .unwrap_or_default();
        let eod = payload
            .get("EOD")
            .and_then(Value::as_array)
            .map(|raw| clean_eod_entries(raw));
        let ner = response.ner_results.clone().unwrap_or_default();

        let mut processed = Vec::new();
        for file in &staged {
            if !state.pending.contains(&file.path) {
                continue;
            }

            match self.process_file(case_id, file, &rows, eod.as_deref(), &ner) {
                Ok(result) => {
                    state.succeed(&file.path);
                    processed.push(result);
                }
                Err(e) => {
                    error!(
                        case_id,
                        bank = %file.bank_name,
                        file = %file.path.display(),
                        "Statement processing failed: {}",
                        e
                    );
                    state.fail(&file.path);
                }
            }
        }

        let summary = build_summary(Some(&payload))?;
        self.db.upsert_summary(case_id, &summary)?;

        match sum_opportunity_to_earn(payload.get("Opportunity to Earn"))? {
            Some(values) => self.db.upsert_opportunity_to_earn(case_id, &values)?,
            None => warn!(case_id, "No opportunity-to-earn data in analysis"),
        }

        let status = if state.failed.is_empty() {
            CaseStatus::Success
        } else {
            CaseStatus::Failed
        };
        self.db.update_case_status(case_id, status)?;
        self.cleanup_files(state, case_name);

        Ok(IngestReport {
            case_id,
            status,
            total_transactions: processed.iter().map(|p| p.inserted_transactions).sum(),
            processed,
            failed_files: state.failed.clone(),
            successful_files: state.successful.clone(),
            failed_statements: state.failed_statements.clone(),
        })
    }

    /// Write uploads to the case's directory; uploads without content fail immediately
    fn stage_files(
        &self,
        state: &mut RunState,
        files: Vec<UploadedFile>,
        case_name: &str,
    ) -> Result<Vec<StagedFile>> {
        let upload_dir = self
            .settings
            .temp_dir
            .join(UPLOAD_DIR)
            .join(dir_name(case_name));
        fs::create_dir_all(&upload_dir)?;

        let mut staged = Vec::new();
        // Content-less uploads never reach disk, so their paths are held here
        let mut reserved = HashSet::new();
        for file in files {
            let path = unique_upload_path(&upload_dir, &file.file_name, &reserved);
            reserved.insert(path.clone());

            let content = match file.content.as_deref() {
                Some(bytes) if !bytes.is_empty() => bytes,
                _ => {
                    warn!(bank = %file.bank_name, file = %file.file_name, "No file content");
                    state.fail(&path);
                    continue;
                }
            };

            if let Err(e) = fs::write(&path, content) {
                warn!(file = %path.display(), "Failed to write upload: {}", e);
                state.fail(&path);
                continue;
            }

            state.pending.push(path.clone());
            staged.push(StagedFile {
                request_index: staged.len(),
                path,
                bank_name: file.bank_name,
                password: file.password.unwrap_or_default(),
                start_date: file.start_date.unwrap_or_default(),
                end_date: file.end_date.unwrap_or_default(),
            });
        }

        Ok(staged)
    }

    /// Statement row, transactions and EOD grid for one file
    fn process_file(
        &self,
        case_id: i64,
        file: &StagedFile,
        rows: &[serde_json::Map<String, Value>],
        eod: Option<&[EodEntry]>,
        ner: &NerResults,
    ) -> Result<ProcessedStatement> {
        // Validate before the statement row exists
        let transactions = normalize_for_bank(rows, &file.bank_name);

        let statement_id = self.db.insert_statement(&NewStatement {
            case_id,
            account_number: ner
                .account_number_at(file.request_index)
                .unwrap_or(UNKNOWN_HOLDER)
                .to_string(),
            customer_name: ner
                .name_at(file.request_index)
                .unwrap_or(UNKNOWN_HOLDER)
                .to_string(),
            ifsc_code: None,
            bank_name: file.bank_name.clone(),
            file_path: file.path.to_string_lossy().into_owned(),
        })?;

        let inserted = self.db.insert_transactions_deduplicated(
            statement_id,
            &transactions,
            self.settings.chunk_size,
        )?;

        if let Some(entries) = eod.filter(|e| !e.is_empty()) {
            self.db.upsert_eod(case_id, entries)?;
        }

        info!(
            case_id,
            statement_id,
            bank = %file.bank_name,
            valid = transactions.len(),
            inserted,
            "Processed statement"
        );

        Ok(ProcessedStatement {
            statement_id,
            bank_name: file.bank_name.clone(),
            file_path: file.path.clone(),
            valid_transactions: transactions.len(),
            inserted_transactions: inserted,
        })
    }

    /// Delete files of the success set, move files of the failure set under `failed_pdfs/<case>`
    ///
    /// Best effort: problems are logged, never escalated.
    fn cleanup_files(&self, state: &RunState, case_name: &str) {
        for path in &state.successful {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!(file = %path.display(), "Failed to clean up temp file: {}", e);
                }
            }
        }

        let failed_dir = self.failed_dir(case_name);
        for path in state.failed.iter().filter(|p| p.exists()) {
            if let Err(e) = retain_file(path, &failed_dir) {
                warn!(file = %path.display(), "Failed to retain failed upload: {}", e);
            }
        }
    }

    /// Where files of failed uploads for a case are kept
    pub fn failed_dir(&self, case_name: &str) -> PathBuf {
        self.settings
            .temp_dir
            .join(FAILED_DIR)
            .join(dir_name(case_name))
    }
}

fn retain_file(path: &Path, failed_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(failed_dir)?;
    let Some(name) = path.file_name() else {
        return Ok(());
    };
    let dest = failed_dir.join(name);
    fs::copy(path, &dest)?;
    fs::remove_file(path)?;
    info!(file = %dest.display(), "Kept failed upload for inspection");
    Ok(())
}

/// `<unix-millis>-<basename>`, bumped until unused so uploads never overwrite each other
fn unique_upload_path(dir: &Path, file_name: &str, reserved: &HashSet<PathBuf>) -> PathBuf {
    let basename = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "statement.pdf".to_string());

    let mut millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    loop {
        let candidate = dir.join(format!("{}-{}", millis, basename));
        if !candidate.exists() && !reserved.contains(&candidate) {
            return candidate;
        }
        millis += 1;
    }
}

/// Whether a path reported by the analyzer refers to this staged upload
fn same_upload(staged: &Path, reported: &str) -> bool {
    let Some(reported_name) = Path::new(reported).file_name() else {
        return false;
    };
    let Some(staged_name) = staged.file_name() else {
        return false;
    };
    let reported_name = reported_name.to_string_lossy();
    let staged_name = staged_name.to_string_lossy();
    staged_name == reported_name || staged_name.ends_with(&format!("-{}", reported_name))
}

/// Case names are user text; keep them to one safe path component
fn dir_name(case_name: &str) -> String {
    let cleaned: String = case_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "case".to_string()
    } else {
        cleaned
    }
}
