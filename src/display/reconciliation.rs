//! Reconciliation result formatting

use crate::models::Transaction;
use crate::services::ReconciliationResult;

use super::truncate;

fn describe(txn: &Transaction, currency: &str) -> String {
    let label = if txn.description.is_empty() {
        &txn.category
    } else {
        &txn.description
    };
    format!(
        "{} {:<20} {:>11}",
        txn.date.format("%Y-%m-%d"),
        truncate(label, 20),
        txn.amount.format_with_symbol(currency)
    )
}

/// Format matches, unmatched items and suggestions
pub fn format_reconciliation(result: &ReconciliationResult, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Matched ({}):\n", result.matches.len()));
    if result.matches.is_empty() {
        output.push_str("  (none)\n");
    }
    for m in &result.matches {
        output.push_str(&format!(
            "  {}  <->  {}  {:>4.0}%  {}\n",
            describe(&m.expected, currency),
            describe(&m.actual, currency),
            m.confidence * 100.0,
            m.reason
        ));
    }

    if !result.unmatched_expected.is_empty() {
        output.push_str(&format!(
            "\nExpected without a record ({}):\n",
            result.unmatched_expected.len()
        ));
        for txn in &result.unmatched_expected {
            output.push_str(&format!("  {}\n", describe(txn, currency)));
        }
    }

    if !result.unmatched_actual.is_empty() {
        output.push_str(&format!(
            "\nRecorded but not expected ({}):\n",
            result.unmatched_actual.len()
        ));
        for txn in &result.unmatched_actual {
            output.push_str(&format!("  {}\n", describe(txn, currency)));
        }
    }

    if !result.suggestions.is_empty() {
        output.push_str("\nSuggestions:\n");
        for suggestion in &result.suggestions {
            output.push_str(&format!("  - {}\n", suggestion));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, OwnerId, TransactionType};
    use crate::services::reconcile;
    use chrono::NaiveDate;

    fn expense(category: &str, cents: i64) -> Transaction {
        Transaction::new(
            OwnerId::new(),
            TransactionType::Expense,
            Money::from_cents(cents),
            category,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        )
    }

    #[test]
    fn test_format_result() {
        let result = reconcile(
            &[expense("Food", 5_000)],
            &[expense("Food", 5_200), expense("Transport", 5_200)],
        );

        let output = format_reconciliation(&result, "$");
        assert!(output.contains("Matched (1):"));
        assert!(output.contains(" 100%"));
        assert!(output.contains("Recorded but not expected (1):"));
        assert!(output.contains("Transport"));
        assert!(output.contains("Suggestions:"));
        assert!(!output.contains("Expected without a record"));
    }

    #[test]
    fn test_format_empty() {
        let output = format_reconciliation(&ReconciliationResult::default(), "$");
        assert_eq!(output, "Matched (0):\n  (none)\n");
    }
}
