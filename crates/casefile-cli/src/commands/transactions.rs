//! Transaction command implementations

use anyhow::Result;
use casefile_core::db::Database;
use casefile_core::models::TransactionType;

use super::truncate;

pub fn cmd_transactions_list(
    db: &Database,
    case_id: i64,
    category: Option<&str>,
    transaction_type: Option<&str>,
    limit: usize,
) -> Result<()> {
    if db.get_case(case_id)?.is_none() {
        anyhow::bail!("Case {} not found", case_id);
    }

    let transaction_type: Option<TransactionType> = transaction_type
        .map(|t| t.parse().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;

    let transactions = match category {
        Some(category) => db.list_transactions_by_category(case_id, category, transaction_type)?,
        None => db.list_transactions_for_case(case_id)?,
    };

    if transactions.is_empty() {
        println!("No transactions found for case {}.", case_id);
        return Ok(());
    }

    println!();
    match category {
        Some(category) => println!("📝 Transactions in '{}' ({} total)", category, transactions.len()),
        None => println!("📝 Transactions ({} total)", transactions.len()),
    }
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions.iter().take(limit) {
        let amount_str = match tx.transaction_type {
            TransactionType::Debit => format!("\x1b[31m-{:.2}\x1b[0m", tx.amount), // Red for debits
            TransactionType::Credit => format!("\x1b[32m+{:.2}\x1b[0m", tx.amount), // Green for credits
        };

        println!(
            "   [{}] {} │ {:>14} │ {:<20} │ {}",
            tx.id,
            tx.date.format("%d-%m-%Y"),
            amount_str,
            truncate(&tx.category, 20),
            truncate(&tx.description, 40)
        );
    }

    if transactions.len() > limit {
        println!();
        println!("   ... {} more (use --limit)", transactions.len() - limit);
    }

    Ok(())
}
