//! Budget comparison formatting

use crate::models::TransactionType;
use crate::services::{BudgetComparison, BudgetStatus, BudgetTotals};

use super::truncate;

fn status_label(status: BudgetStatus) -> &'static str {
    match status {
        BudgetStatus::OnTrack => "On track",
        BudgetStatus::UnderBudget => "Under budget",
        BudgetStatus::OverBudget => "OVER BUDGET",
        BudgetStatus::CloseToLimit => "Close to limit",
    }
}

/// Format a per-category comparison table with a totals row per kind
pub fn format_budget_table(comparisons: &[BudgetComparison], currency: &str) -> String {
    if comparisons.is_empty() {
        return "Nothing expected or recorded.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<20}  {:<7}  {:>12}  {:>12}  {:>12}  {:>6}  {}\n",
        "Category", "Type", "Expected", "Actual", "Variance", "%", "Status"
    ));
    output.push_str(&format!("{}\n", "-".repeat(91)));

    for c in comparisons {
        output.push_str(&format!(
            "{:<20}  {:<7}  {:>12}  {:>12}  {:>12}  {:>6.1}  {}\n",
            truncate(&c.category, 20),
            c.kind.to_string(),
            c.expected.format_with_symbol(currency),
            c.actual.format_with_symbol(currency),
            c.variance.format_with_symbol(currency),
            c.percentage,
            status_label(c.status)
        ));
    }

    output.push_str(&format!("{}\n", "-".repeat(91)));
    for (kind, label) in [
        (TransactionType::Expense, "Total spending"),
        (TransactionType::Income, "Total income"),
    ] {
        if !comparisons.iter().any(|c| c.kind == kind) {
            continue;
        }
        let totals = BudgetTotals::from_comparisons(comparisons, kind);
        output.push_str(&format!(
            "{:<29}  {:>12}  {:>12}  {:>12}  {:>6.1}  {}\n",
            label,
            totals.expected.format_with_symbol(currency),
            totals.actual.format_with_symbol(currency),
            totals.variance.format_with_symbol(currency),
            totals.percentage(),
            status_label(totals.status())
        ));
    }

    output
}
