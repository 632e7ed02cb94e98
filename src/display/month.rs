//! Month view formatting
//!
//! Register-style listing of a month: durable records and projected
//! instances side by side, with totals split by direction.

use crate::models::{Money, MonthKey, Transaction, TransactionType};

use super::truncate;

/// Format one register row
fn format_row(txn: &Transaction, currency: &str) -> String {
    let marker = if txn.is_projected {
        "~"
    } else if txn.is_materialized() {
        "✓"
    } else {
        " "
    };
    let label = if txn.description.is_empty() {
        txn.category.as_str()
    } else {
        txn.description.as_str()
    };

    format!(
        "{} {} {:<24} {:<16} {:>12}",
        marker,
        txn.date.format("%Y-%m-%d"),
        truncate(label, 24),
        truncate(&txn.category, 16),
        txn.signed_amount().format_with_symbol(currency)
    )
}

fn header() -> String {
    format!(
        "{:1} {:10} {:<24} {:<16} {:>12}\n{}\n",
        "",
        "Date",
        "Description",
        "Category",
        "Amount",
        "-".repeat(67)
    )
}

/// Format a plain transaction listing
pub fn format_transaction_list(transactions: &[Transaction], currency: &str) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = header();
    for txn in transactions {
        output.push_str(&format_row(txn, currency));
        output.push('\n');
    }
    output
}

/// Format the merged month view
///
/// `~` marks a projected instance, `✓` a record materialized from a template.
pub fn format_month_view(month: MonthKey, items: &[Transaction], currency: &str) -> String {
    let mut output = format!("Month: {}\n\n", month);

    if items.is_empty() {
        output.push_str("Nothing recorded or projected.\n");
        return output;
    }

    output.push_str(&format_transaction_list(items, currency));

    let total = |kind: TransactionType, projected: bool| -> Money {
        items
            .iter()
            .filter(|t| t.kind == kind && t.is_projected == projected)
            .map(|t| t.amount)
            .sum()
    };

    output.push('\n');
    output.push_str(&format!(
        "Income:    {:>12} recorded  {:>12} projected\n",
        total(TransactionType::Income, false).format_with_symbol(currency),
        total(TransactionType::Income, true).format_with_symbol(currency),
    ));
    output.push_str(&format!(
        "Expenses:  {:>12} recorded  {:>12} projected\n",
        total(TransactionType::Expense, false).format_with_symbol(currency),
        total(TransactionType::Expense, true).format_with_symbol(currency),
    ));
    let net: Money = items.iter().map(|t| t.signed_amount()).sum();
    output.push_str(&format!("Net:       {:>12}\n", net.format_with_symbol(currency)));

    output
}
