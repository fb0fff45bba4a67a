//! Ingestion and reconciliation commands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use casefile_core::models::{CategoryEdit, IngestReport, UploadedFile};
use casefile_core::Pipeline;

/// Which case an ingestion goes to
#[derive(Debug, Clone, PartialEq)]
pub enum CaseTarget {
    Name(String),
    Id(i64),
}

/// Split a `BANK=PATH` argument
pub fn parse_file_spec(spec: &str) -> Result<(String, PathBuf)> {
    let (bank, path) = spec
        .split_once('=')
        .with_context(|| format!("Expected BANK=PATH, got '{}'", spec))?;
    let bank = bank.trim();
    let path = path.trim();
    if bank.is_empty() || path.is_empty() {
        anyhow::bail!("Expected BANK=PATH, got '{}'", spec);
    }
    Ok((bank.to_string(), PathBuf::from(path)))
}

/// Read every `BANK=PATH` file into an upload
///
/// Unreadable files are passed on without content; the pipeline records them as failed.
pub fn read_uploads(
    specs: &[String],
    passwords: &[String],
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Vec<UploadedFile>> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let (bank_name, path) = parse_file_spec(spec)?;
            let content = match fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    eprintln!("   ⚠️  Could not read {}: {}", path.display(), e);
                    None
                }
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| spec.clone());

            Ok(UploadedFile {
                file_name,
                bank_name,
                content,
                password: passwords.get(i).filter(|p| !p.is_empty()).cloned(),
                start_date: start_date.map(str::to_string),
                end_date: end_date.map(str::to_string),
            })
        })
        .collect()
}

pub async fn cmd_ingest(
    pipeline: &Pipeline,
    uploads: Vec<UploadedFile>,
    target: CaseTarget,
) -> Result<()> {
    println!("📥 Sending {} statement file(s) to the analyzer...", uploads.len());

    let result = match &target {
        CaseTarget::Name(name) => pipeline.ingest(uploads, name).await,
        CaseTarget::Id(id) => pipeline.ingest_into_case(uploads, *id).await,
    };

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(failure) => {
            println!();
            println!("❌ Ingestion failed (HTTP {})", failure.status_code());
            println!("   {}", failure.source);
            if let Some(case_id) = failure.case_id {
                println!("   Case: #{} (marked failed)", case_id);
            }
            print_files("Succeeded", &failure.successful_files);
            print_files("Failed", &failure.failed_files);
            Err(failure.into())
        }
    }
}

fn print_report(report: &IngestReport) {
    println!();
    println!("📊 Ingestion Results (case #{})", report.case_id);
    println!("   ─────────────────────────────");
    for processed in &report.processed {
        println!(
            "   {} │ statement #{} │ {} valid, {} new",
            processed.bank_name,
            processed.statement_id,
            processed.valid_transactions,
            processed.inserted_transactions
        );
    }
    println!("   Transactions stored: {}", report.total_transactions);
    println!("   Status: {}", report.status);

    if !report.failed_files.is_empty() {
        print_files("Failed", &report.failed_files);
        println!("   Failed files are kept for inspection; see 'casefile failed {}'", report.case_id);
    }
}

fn print_files(label: &str, files: &[PathBuf]) {
    if files.is_empty() {
        return;
    }
    println!("   {}:", label);
    for file in files {
        println!("     - {}", file.display());
    }
}

pub async fn cmd_reconcile(pipeline: &Pipeline, case_id: i64, edits_path: &Path) -> Result<()> {
    let raw = fs::read_to_string(edits_path)
        .with_context(|| format!("Failed to read {}", edits_path.display()))?;
    let edits: Vec<CategoryEdit> =
        serde_json::from_str(&raw).context("Edits must be a JSON list of {transaction_id, category}")?;

    if edits.is_empty() {
        println!("No edits to apply.");
        return Ok(());
    }

    println!("🔁 Reconciling {} category edit(s) for case #{}...", edits.len(), case_id);
    let report = pipeline.reconcile_categories(&edits, case_id).await?;

    println!("   Transactions updated: {}", report.updated);
    if report.updated < report.requested {
        println!(
            "   ⚠️  {} edit(s) did not match a transaction in this case",
            report.requested - report.updated
        );
    }
    if report.opportunity_updated {
        println!("   Opportunity-to-earn figures refreshed");
    }
    println!("✅ Summary recomputed");
    Ok(())
}
