//! Reconciliation CLI command
//!
//! Matches a month's obligations against its recorded transactions.

use crate::config::{Settings, SimilarityMode};
use crate::display::format_reconciliation;
use crate::error::LedgerResult;
use crate::services::{ExactTable, FuzzyTable, MonthViewService, Reconciler, SimilarityProvider};
use crate::storage::Storage;

use super::parse_month_or_current;

/// Handle `reconcile [MONTH]`
pub fn handle_reconcile_command(
    storage: &Storage,
    settings: &Settings,
    month: Option<String>,
) -> LedgerResult<()> {
    let month = parse_month_or_current(month.as_deref())?;
    let inputs = MonthViewService::new(storage).budget_inputs(settings.owner_id, month)?;

    let provider: Box<dyn SimilarityProvider> = match settings.similarity {
        SimilarityMode::Exact => Box::new(ExactTable),
        SimilarityMode::Fuzzy => Box::new(FuzzyTable::default()),
    };
    let result = Reconciler::with_provider(provider).reconcile(&inputs.expected, &inputs.actual);

    println!("Reconciliation: {}", month);
    println!("{}", "=".repeat(40));
    print!(
        "{}",
        format_reconciliation(&result, &settings.currency_symbol)
    );
    if result.is_fully_matched() {
        println!("\nEverything expected this month is accounted for.");
    }

    Ok(())
}
