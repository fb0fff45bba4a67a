//! Casefile CLI - Bank statement ingestion
//!
//! Usage:
//!   casefile init                                 Initialize database
//!   casefile ingest --case NAME --file BANK=PDF   Analyze and store statements
//!   casefile reconcile --case-id 1 --edits E.json Apply category edits
//!   casefile cases                                List cases

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Ingest {
            case,
            case_id,
            files,
            passwords,
            start_date,
            end_date,
        } => {
            let pipeline =
                commands::build_pipeline(&cli.db, cli.config.as_deref(), cli.no_encrypt)?;
            let target = match (case, case_id) {
                (_, Some(id)) => commands::CaseTarget::Id(id),
                (Some(name), None) => commands::CaseTarget::Name(name),
                (None, None) => anyhow::bail!("Either --case or --case-id is required"),
            };
            let uploads = commands::read_uploads(
                &files,
                &passwords,
                start_date.as_deref(),
                end_date.as_deref(),
            )?;
            commands::cmd_ingest(&pipeline, uploads, target).await
        }
        Commands::Reconcile { case_id, edits } => {
            let pipeline =
                commands::build_pipeline(&cli.db, cli.config.as_deref(), cli.no_encrypt)?;
            commands::cmd_reconcile(&pipeline, case_id, &edits).await
        }
        Commands::Cases => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_cases_list(&db)
        }
        Commands::Show { case_id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_case_show(&db, case_id)
        }
        Commands::Transactions {
            case_id,
            category,
            transaction_type,
            limit,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(
                &db,
                case_id,
                category.as_deref(),
                transaction_type.as_deref(),
                limit,
            )
        }
        Commands::Failed { case_id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_failed(&db, case_id)
        }
        Commands::Opportunities => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_opportunities(&db)
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.config.as_deref(), cli.no_encrypt),
        Commands::Health => commands::cmd_health(cli.config.as_deref()).await,
    }
}
