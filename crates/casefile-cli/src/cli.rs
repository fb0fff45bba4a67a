//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Casefile - Bank statement ingestion and reconciliation
#[derive(Parser)]
#[command(name = "casefile")]
#[command(about = "Ingest analyzed bank statements into per-client cases", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "casefile.db", global = true)]
    pub db: PathBuf,

    /// Settings file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CASEFILE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Send statement files to the analyzer and store the results
    Ingest {
        /// Case name (created on first use)
        #[arg(short, long, conflicts_with = "case_id", required_unless_present = "case_id")]
        case: Option<String>,

        /// Add the files to an existing case instead
        #[arg(long)]
        case_id: Option<i64>,

        /// Statement file as BANK=PATH (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<String>,

        /// PDF password, matched to --file by position (use "" for none)
        #[arg(short, long = "password")]
        passwords: Vec<String>,

        /// Statement period start (DD-MM-YYYY), applied to every file
        #[arg(long)]
        start_date: Option<String>,

        /// Statement period end (DD-MM-YYYY), applied to every file
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Apply category edits and recompute the case's summary
    Reconcile {
        /// Case to reconcile
        #[arg(long)]
        case_id: i64,

        /// JSON file with a list of {"transaction_id": .., "category": ".."}
        #[arg(short, long)]
        edits: PathBuf,
    },

    /// List cases with their statements
    Cases,

    /// Show one case: statements, EOD, summary and opportunity data
    Show {
        /// Case ID
        case_id: i64,
    },

    /// List a case's transactions
    Transactions {
        /// Case ID
        case_id: i64,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only credits or debits (requires --category)
        #[arg(short = 't', long = "type", requires = "category")]
        transaction_type: Option<String>,

        /// Maximum rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show extraction failures recorded for a case
    Failed {
        /// Case ID
        case_id: i64,
    },

    /// List opportunity-to-earn figures across cases
    Opportunities,

    /// Show effective settings and record counts
    Status,

    /// Check that the statement analyzer is reachable
    Health,
}
