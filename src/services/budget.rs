//! Budget comparator
//!
//! Rolls expected and actual transactions up by kind and category and
//! classifies the variance of each row. Income and expense never share a row.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::models::{Money, Transaction, TransactionType};

/// Category label used for transactions without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// How a category's actual spend relates to its expected spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    UnderBudget,
    OverBudget,
    CloseToLimit,
}

impl BudgetStatus {
    /// Classify a percentage of expected
    ///
    /// Above 110 is over budget, above 90 is close to the limit, below 70 is
    /// under budget; anything else is on track.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > 110.0 {
            Self::OverBudget
        } else if percentage > 90.0 {
            Self::CloseToLimit
        } else if percentage < 70.0 {
            Self::UnderBudget
        } else {
            Self::OnTrack
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnTrack => write!(f, "on_track"),
            Self::UnderBudget => write!(f, "under_budget"),
            Self::OverBudget => write!(f, "over_budget"),
            Self::CloseToLimit => write!(f, "close_to_limit"),
        }
    }
}

/// Expected vs actual for one category of one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetComparison {
    pub kind: TransactionType,
    pub category: String,
    pub expected: Money,
    pub actual: Money,
    /// `actual - expected`
    pub variance: Money,
    /// `actual / expected * 100`, or 0 when nothing was expected
    pub percentage: f64,
    pub status: BudgetStatus,
}

impl BudgetComparison {
    fn new(kind: TransactionType, category: String, expected: Money, actual: Money) -> Self {
        let percentage = percentage_of(actual, expected);
        Self {
            kind,
            category,
            expected,
            actual,
            variance: actual - expected,
            percentage,
            status: BudgetStatus::from_percentage(percentage),
        }
    }
}

/// Sums across the categories of one kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetTotals {
    pub expected: Money,
    pub actual: Money,
    pub variance: Money,
}

impl BudgetTotals {
    pub fn from_comparisons(comparisons: &[BudgetComparison], kind: TransactionType) -> Self {
        comparisons
            .iter()
            .filter(|c| c.kind == kind)
            .fold(Self::default(), |acc, c| Self {
            expected: acc.expected + c.expected,
            actual: acc.actual + c.actual,
                variance: acc.variance + c.variance,
            })
    }

    pub fn percentage(&self) -> f64 {
        percentage_of(self.actual, self.expected)
    }

    pub fn status(&self) -> BudgetStatus {
        BudgetStatus::from_percentage(self.percentage())
    }
}

fn percentage_of(actual: Money, expected: Money) -> f64 {
    if expected.is_positive() {
        actual.cents() as f64 * 100.0 / expected.cents() as f64
    } else {
        0.0
    }
}

fn category_key(txn: &Transaction) -> String {
    match txn.category.trim() {
        "" => UNCATEGORIZED.to_string(),
        category => category.to_string(),
    }
}

/// Rows sort expenses before income, then by category
fn row_key(txn: &Transaction) -> (bool, String) {
    (txn.kind == TransactionType::Income, category_key(txn))
}

/// Compare expected and actual transactions per kind and category
pub fn compare_budget(expected: &[Transaction], actual: &[Transaction]) -> Vec<BudgetComparison> {
    let mut totals: BTreeMap<(bool, String), (Money, Money)> = BTreeMap::new();

    for txn in expected {
        totals.entry(row_key(txn)).or_default().0 += txn.amount;
    }
    for txn in actual {
        totals.entry(row_key(txn)).or_default().1 += txn.amount;
    }

    totals
        .into_iter()
        .map(|((is_income, category), (expected, actual))| {
            let kind = if is_income {
                TransactionType::Income
            } else {
                TransactionType::Expense
            };
            BudgetComparison::new(kind, category, expected, actual)
        })
        .collect()
}

/// Compare a single list where `is_expected` tells the two sides apart
pub fn compare_budget_marked<F>(items: &[Transaction], is_expected: F) -> Vec<BudgetComparison>
where
    F: Fn(&Transaction) -> bool,
{
    let (expected, actual): (Vec<Transaction>, Vec<Transaction>) =
        items.iter().cloned().partition(|t| is_expected(t));
    compare_budget(&expected, &actual)
}
