//! Case command implementations (list, show, failed extractions, opportunities)

use anyhow::Result;
use casefile_core::db::Database;
use casefile_core::models::OpportunityToEarn;

use super::truncate;

pub fn cmd_cases_list(db: &Database) -> Result<()> {
    let cases = db.list_cases()?;

    if cases.is_empty() {
        println!("No cases yet. Ingest statements with:");
        println!("  casefile ingest --case \"Client\" --file HDFC=statement.pdf");
        return Ok(());
    }

    println!();
    println!("📁 Cases");
    println!("   ─────────────────────────────────────────────────────────────");

    for overview in cases {
        let case = &overview.case;
        println!(
            "   [{}] {} │ {} │ {} statement(s) │ {}",
            case.id,
            truncate(&case.name, 30),
            case.status,
            overview.statements.len(),
            case.created_at.format("%Y-%m-%d")
        );
        for statement in &overview.statements {
            println!(
                "        {} │ {} │ {}",
                statement.bank_name,
                statement.account_number,
                truncate(&statement.customer_name, 30)
            );
        }
    }

    Ok(())
}

pub fn cmd_case_show(db: &Database, case_id: i64) -> Result<()> {
    let case = db
        .get_case(case_id)?
        .ok_or_else(|| anyhow::anyhow!("Case {} not found", case_id))?;

    println!();
    println!("📁 {} (#{})", case.name, case.id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Status: {}", case.status);
    println!("   Created: {}", case.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(updated) = case.updated_at {
        println!("   Updated: {}", updated.format("%Y-%m-%d %H:%M"));
    }

    let statements = db.list_statements(case_id)?;
    println!();
    println!("   Statements: {}", statements.len());
    for statement in &statements {
        let count = db.count_transactions_for_statement(statement.id)?;
        println!(
            "     #{} {} │ {} │ {} │ {} transactions",
            statement.id,
            statement.bank_name,
            statement.account_number,
            truncate(&statement.customer_name, 25),
            count
        );
    }

    if let Some(eod) = db.get_eod(case_id)? {
        let months: std::collections::BTreeSet<&str> = eod
            .data
            .iter()
            .flat_map(|e| e.balances.keys().map(String::as_str))
            .collect();
        println!();
        println!(
            "   EOD balances: {} day(s) across {}",
            eod.data.len(),
            months.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    if let Some(summary) = db.get_summary(case_id)? {
        println!();
        println!("   Summary rows:");
        println!("     Particulars:        {}", summary.data.particulars.len());
        println!("     Income receipts:    {}", summary.data.income_receipts.len());
        println!("     Important expenses: {}", summary.data.important_expenses.len());
        println!("     Other expenses:     {}", summary.data.other_expenses.len());
    }

    if let Some(opportunity) = db.get_opportunity_to_earn(case_id)? {
        println!();
        println!("   💡 Opportunity to earn:");
        print_opportunity(&opportunity.values, "     ");
    }

    let failures = db.list_failed_statements(case_id)?;
    if !failures.is_empty() {
        println!();
        println!(
            "   ⚠️  {} extraction failure record(s); run 'casefile failed {}'",
            failures.len(),
            case_id
        );
    }

    Ok(())
}

pub fn cmd_failed(db: &Database, case_id: i64) -> Result<()> {
    let failures = db.list_failed_statements(case_id)?;

    if failures.is_empty() {
        println!("✅ No extraction failures recorded for case {}.", case_id);
        return Ok(());
    }

    println!();
    println!("⚠️  Extraction failures (case #{})", case_id);
    println!("   ─────────────────────────────────────────────────────────────");

    for failure in failures {
        println!(
            "   [{}] {}",
            failure.id,
            failure.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(paths) = failure.data.get("paths").and_then(|p| p.as_array()) {
            for path in paths.iter().filter_map(|p| p.as_str()) {
                println!("        {}", path);
            }
        } else {
            println!("        {}", failure.data);
        }
    }

    Ok(())
}

pub fn cmd_opportunities(db: &Database) -> Result<()> {
    let listings = db.list_opportunities()?;

    if listings.is_empty() {
        println!("No opportunity-to-earn data yet.");
        return Ok(());
    }

    println!();
    println!("💡 Opportunities to Earn");
    println!("   ─────────────────────────────────────────────────────────────");

    for listing in listings {
        println!(
            "   [{}] {} ({})",
            listing.case_id,
            truncate(&listing.case_name, 30),
            listing.customer_name.as_deref().unwrap_or("unknown holder")
        );
        print_opportunity(&listing.values, "        ");
    }

    Ok(())
}

fn print_opportunity(values: &OpportunityToEarn, indent: &str) {
    println!("{}Home loan:             {:>14.2}", indent, values.home_loan_value);
    println!("{}Loan against property: {:>14.2}", indent, values.loan_against_property);
    println!("{}Business loan:         {:>14.2}", indent, values.business_loan);
    println!("{}Term plan:             {:>14.2}", indent, values.term_plan);
    println!("{}General insurance:     {:>14.2}", indent, values.general_insurance);
}
