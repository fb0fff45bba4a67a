//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `cases` - Case listing and detail commands (cases, show, failed, opportunities)
//! - `core` - Core commands (init, health) and shared utilities (open_db, build_pipeline)
//! - `ingest` - Statement ingestion and category reconciliation
//! - `status` - Effective settings and record counts
//! - `transactions` - Transaction listing

pub mod cases;
pub mod core;
pub mod ingest;
pub mod status;
pub mod transactions;

// Re-export command functions for main.rs
pub use cases::*;
pub use core::*;
pub use ingest::*;
pub use status::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
