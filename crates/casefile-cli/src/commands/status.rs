//! Status command: effective settings plus what the store currently holds

use std::path::Path;

use anyhow::Result;
use casefile_core::db::{Database, DB_KEY_ENV};
use casefile_core::Settings;

use super::{load_settings, open_db};

pub fn cmd_status(db_path: &Path, config: Option<&Path>, no_encrypt: bool) -> Result<()> {
    let settings = load_settings(config)?;

    println!();
    println!("📁 Casefile");
    print_settings(&settings);

    println!();
    println!("🗄️  Store at {}", db_path.display());
    if !db_path.exists() {
        println!("   Not created yet; run `casefile init`");
        println!();
        return Ok(());
    }

    let key_note = if no_encrypt {
        "unencrypted (--no-encrypt)"
    } else if std::env::var(DB_KEY_ENV).is_ok() {
        "encrypted"
    } else {
        "encrypted, but no key in the environment"
    };
    println!("   Mode: {}", key_note);

    match open_db(db_path, no_encrypt) {
        Ok(db) => print_store(&db)?,
        Err(e) => println!("   ❌ Could not open: {:#}", e),
    }

    println!();
    Ok(())
}

fn print_settings(settings: &Settings) {
    let analyzer = &settings.analyzer;
    println!("   Analyzer:   {}", analyzer.base_url);
    println!("   Timeout:    {}s", analyzer.timeout.as_secs());
    println!("   Work dir:   {}", settings.ingest.temp_dir.display());
    println!("   Chunk size: {}", settings.ingest.chunk_size);
}

fn print_store(db: &Database) -> Result<()> {
    let cases = db.case_status_counts()?;
    let records = db.record_counts()?;

    println!(
        "   Cases: {} ({} succeeded, {} failed, {} pending)",
        cases.total, cases.success, cases.failed, cases.pending
    );
    println!("   Statements: {}", records.statements);
    println!("   Transactions: {}", records.transactions);
    if records.failed_statements > 0 {
        println!(
            "   ⚠️  {} extraction failure(s) on record; see `casefile failed <CASE_ID>`",
            records.failed_statements
        );
    }
    Ok(())
}
