//! Reconciliation matcher
//!
//! Pairs expected transactions (obligations) with actual records. Every
//! same-type pair is scored in points, one point per hundredth of
//! confidence; pairs above the threshold are committed greedily from the
//! highest score down. The matcher is pure and deterministic: identical
//! inputs in the same order always produce identical results.

use crate::models::{Money, Transaction};

use super::similarity::{ExactTable, SimilarityProvider};

const CATEGORY_EXACT: u32 = 40;
const CATEGORY_SIMILAR: u32 = 30;
const AMOUNT_CLOSE: u32 = 40;
const AMOUNT_NEAR: u32 = 20;
const DATE_CLOSE: u32 = 20;
const DATE_NEAR: u32 = 10;
const DESCRIPTION: u32 = 10;

/// Pairs scoring at or below this are never matched
const MIN_POINTS: u32 = 30;
const MAX_POINTS: u32 = 100;

/// Smallest amount tolerance, regardless of the expected amount
const MIN_TOLERANCE: Money = Money::from_cents(100);

/// Words in an unexpected record's description that hint at a missing template
const RECURRING_HINTS: &[&str] = &["salary", "paycheck", "rent"];

/// One committed pairing
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationMatch {
    pub expected: Transaction,
    pub actual: Transaction,
    /// In `(0.3, 1.0]`
    pub confidence: f64,
    /// Contributing factors, e.g. "category match, amount within tolerance"
    pub reason: String,
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    pub matches: Vec<ReconciliationMatch>,
    pub unmatched_expected: Vec<Transaction>,
    pub unmatched_actual: Vec<Transaction>,
    pub suggestions: Vec<String>,
}

impl ReconciliationResult {
    pub fn is_fully_matched(&self) -> bool {
        self.unmatched_expected.is_empty() && self.unmatched_actual.is_empty()
    }
}

struct Candidate {
    expected: usize,
    actual: usize,
    points: u32,
    reasons: Vec<&'static str>,
}

/// Matcher over an injectable similarity provider
#[derive(Debug, Clone, Default)]
pub struct Reconciler<P = ExactTable> {
    provider: P,
}

impl Reconciler<ExactTable> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: SimilarityProvider> Reconciler<P> {
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Pair `expected` with `actual`
    pub fn reconcile(&self, expected: &[Transaction], actual: &[Transaction]) -> ReconciliationResult {
        let mut candidates = Vec::new();
        for (ei, e) in expected.iter().enumerate() {
            for (ai, a) in actual.iter().enumerate() {
                if let Some(candidate) = self.score(ei, e, ai, a) {
                    candidates.push(candidate);
                }
            }
        }
        // Stable: equal scores keep (expected, actual) enumeration order
        candidates.sort_by(|a, b| b.points.cmp(&a.points));

        let mut expected_used = vec![false; expected.len()];
        let mut actual_used = vec![false; actual.len()];
        let mut matches = Vec::new();

        for candidate in candidates {
            if expected_used[candidate.expected] || actual_used[candidate.actual] {
                continue;
            }
            expected_used[candidate.expected] = true;
            actual_used[candidate.actual] = true;

            matches.push(ReconciliationMatch {
                expected: expected[candidate.expected].clone(),
                actual: actual[candidate.actual].clone(),
                confidence: f64::from(candidate.points.min(MAX_POINTS)) / 100.0,
                reason: candidate.reasons.join(", "),
            });
        }

        let unmatched_expected = unused(expected, &expected_used);
        let unmatched_actual = unused(actual, &actual_used);
        let suggestions = suggestions(&unmatched_expected, &unmatched_actual);

        ReconciliationResult {
            matches,
            unmatched_expected,
            unmatched_actual,
            suggestions,
        }
    }

    fn score(&self, ei: usize, e: &Transaction, ai: usize, a: &Transaction) -> Option<Candidate> {
        if e.kind != a.kind {
            return None;
        }

        let mut points = 0;
        let mut reasons = Vec::new();

        if e.category.trim().eq_ignore_ascii_case(a.category.trim()) {
            points += CATEGORY_EXACT;
            reasons.push("category match");
        } else if self.provider.similar_categories(&e.category, &a.category) {
            points += CATEGORY_SIMILAR;
            reasons.push("similar category");
        }

        let tolerance = amount_tolerance(e.amount);
        let difference = e.amount.abs_diff(a.amount);
        if difference <= tolerance {
            points += AMOUNT_CLOSE;
            reasons.push("amount within tolerance");
        } else if difference <= tolerance + tolerance {
            points += AMOUNT_NEAR;
            reasons.push("amount close");
        }

        let days = (e.date - a.date).num_days().abs();
        if days <= 1 {
            points += DATE_CLOSE;
            reasons.push("date within 1 day");
        } else if days <= 3 {
            points += DATE_NEAR;
            reasons.push("date within 3 days");
        }

        if descriptions_related(&self.provider, &e.description, &a.description) {
            points += DESCRIPTION;
            reasons.push("description match");
        }

        (points > MIN_POINTS).then_some(Candidate {
            expected: ei,
            actual: ai,
            points,
            reasons,
        })
    }
}

/// Match with the default `ExactTable` provider
pub fn reconcile(expected: &[Transaction], actual: &[Transaction]) -> ReconciliationResult {
    Reconciler::new().reconcile(expected, actual)
}

/// Ten percent of the expected amount, but never less than one dollar
fn amount_tolerance(expected: Money) -> Money {
    expected.abs().scale(0.10).max(MIN_TOLERANCE)
}

fn descriptions_related<P: SimilarityProvider>(provider: &P, a: &str, b: &str) -> bool {
    let a_lower = a.trim().to_lowercase();
    let b_lower = b.trim().to_lowercase();
    if a_lower.is_empty() || b_lower.is_empty() {
        return false;
    }
    a_lower.contains(&b_lower)
        || b_lower.contains(&a_lower)
        || provider.synonymous_descriptions(&a_lower, &b_lower)
}

fn unused(items: &[Transaction], used: &[bool]) -> Vec<Transaction> {
    items
        .iter()
        .zip(used)
        .filter(|(_, used)| !**used)
        .map(|(t, _)| t.clone())
        .collect()
}

fn suggestions(unmatched_expected: &[Transaction], unmatched_actual: &[Transaction]) -> Vec<String> {
    let mut suggestions = Vec::new();

    if !unmatched_expected.is_empty() {
        suggestions.push(format!(
            "{} expected transaction(s) have no matching record yet",
            unmatched_expected.len()
        ));
    }
    if !unmatched_actual.is_empty() {
        suggestions.push(format!(
            "{} recorded transaction(s) were not expected",
            unmatched_actual.len()
        ));
    }

    for txn in unmatched_actual {
        let description = txn.description.to_lowercase();
        if RECURRING_HINTS.iter().any(|hint| description.contains(hint)) {
            suggestions.push(format!(
                "'{}' looks recurring; consider making it a template",
                txn.description.trim()
            ));
        }
    }

    suggestions
}
