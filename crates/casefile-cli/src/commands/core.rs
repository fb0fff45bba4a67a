//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `load_settings` / `build_pipeline` - Shared openers
//! - `cmd_init` - Initialize the database
//! - `cmd_health` - Probe the statement analyzer

use std::path::Path;

use anyhow::{Context, Result};
use casefile_core::analyzer::{Analyzer, AnalyzerClient};
use casefile_core::{Database, Pipeline, Settings};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Settings from --config, or the default override location / embedded defaults
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };
    debug!(
        analyzer = %settings.analyzer.base_url,
        temp_dir = %settings.ingest.temp_dir.display(),
        "Loaded settings"
    );
    Ok(settings)
}

/// Database + analyzer + ingest settings, ready to run
pub fn build_pipeline(db_path: &Path, config: Option<&Path>, no_encrypt: bool) -> Result<Pipeline> {
    let settings = load_settings(config)?;
    let db = open_db(db_path, no_encrypt)?;
    let analyzer = AnalyzerClient::from_settings(&settings.analyzer)
        .context("Failed to create analyzer client")?;
    Ok(Pipeline::new(db, analyzer, settings.ingest))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Check the analyzer: casefile health");
    println!("  2. Ingest statements:  casefile ingest --case \"Client\" --file HDFC=statement.pdf");

    Ok(())
}

pub async fn cmd_health(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let analyzer = AnalyzerClient::from_settings(&settings.analyzer)?;

    println!("🩺 Checking analyzer at {}...", analyzer.host());
    if analyzer.health_check().await {
        println!("   ✅ Analyzer is reachable");
        Ok(())
    } else {
        anyhow::bail!("Analyzer at {} is not reachable", analyzer.host())
    }
}
