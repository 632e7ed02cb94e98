//! Budget comparison CLI command

use crate::config::Settings;
use crate::display::format_budget_table;
use crate::error::LedgerResult;
use crate::services::{compare_budget, MonthViewService};
use crate::storage::Storage;

use super::parse_month_or_current;

/// Handle `budget [MONTH]`: expected vs actual per kind and category
pub fn handle_budget_command(
    storage: &Storage,
    settings: &Settings,
    month: Option<String>,
) -> LedgerResult<()> {
    let month = parse_month_or_current(month.as_deref())?;
    let inputs = MonthViewService::new(storage).budget_inputs(settings.owner_id, month)?;
    let comparisons = compare_budget(&inputs.expected, &inputs.actual);

    println!("Budget: {}", month);
    println!("{}", "=".repeat(40));
    print!(
        "{}",
        format_budget_table(&comparisons, &settings.currency_symbol)
    );

    Ok(())
}
