//! Similarity providers for reconciliation
//!
//! The matcher asks a provider whether two categories belong together and
//! whether two descriptions name the same thing. `ExactTable` answers from
//! fixed lookup tables; `FuzzyTable` also accepts near-miss spellings.

use strsim::jaro_winkler;

/// Category and description similarity rules used by the matcher
pub trait SimilarityProvider {
    /// Whether two distinct categories should be treated as related
    fn similar_categories(&self, a: &str, b: &str) -> bool;

    /// Whether two descriptions are synonyms of each other
    fn synonymous_descriptions(&self, a: &str, b: &str) -> bool;
}

impl<P: SimilarityProvider + ?Sized> SimilarityProvider for Box<P> {
    fn similar_categories(&self, a: &str, b: &str) -> bool {
        (**self).similar_categories(a, b)
    }

    fn synonymous_descriptions(&self, a: &str, b: &str) -> bool {
        (**self).synonymous_descriptions(a, b)
    }
}

const CATEGORY_GROUPS: &[&[&str]] = &[
    &["groceries", "food", "dining", "restaurants", "supermarket"],
    &["transport", "transportation", "fuel", "gas", "parking", "transit"],
    &["housing", "rent", "mortgage"],
    &["utilities", "electric", "electricity", "water", "internet", "phone"],
    &["health", "medical", "pharmacy", "fitness", "gym"],
    &["entertainment", "subscriptions", "streaming"],
    &["income", "salary", "wages", "payroll"],
    &["insurance", "premiums"],
];

const DESCRIPTION_SYNONYMS: &[&[&str]] = &[
    &["salary", "paycheck", "payroll", "wages"],
    &["rent", "lease"],
    &["mortgage", "home loan"],
    &["electric", "electricity", "power"],
    &["internet", "broadband", "wifi"],
    &["gym", "fitness"],
];

fn group_of(table: &[&[&str]], word: &str) -> Option<usize> {
    table.iter().position(|group| group.contains(&word))
}

fn mentions_group(table: &[&[&str]], text: &str) -> Vec<usize> {
    table
        .iter()
        .enumerate()
        .filter(|(_, group)| group.iter().any(|w| text.contains(w)))
        .map(|(i, _)| i)
        .collect()
}

/// Fixed category groups and description synonym lists
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTable;

impl SimilarityProvider for ExactTable {
    fn similar_categories(&self, a: &str, b: &str) -> bool {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        match (
            group_of(CATEGORY_GROUPS, &a),
            group_of(CATEGORY_GROUPS, &b),
        ) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn synonymous_descriptions(&self, a: &str, b: &str) -> bool {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        let in_b = mentions_group(DESCRIPTION_SYNONYMS, &b);
        mentions_group(DESCRIPTION_SYNONYMS, &a)
            .iter()
            .any(|group| in_b.contains(group))
    }
}

/// `ExactTable` plus Jaro-Winkler similarity for misspelled categories and
/// descriptions
#[derive(Debug, Clone, Copy)]
pub struct FuzzyTable {
    threshold: f64,
}

impl FuzzyTable {
    pub const DEFAULT_THRESHOLD: f64 = 0.88;

    /// `threshold` is clamped to `[0, 1]`
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn close(&self, a: &str, b: &str) -> bool {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        !a.is_empty() && !b.is_empty() && jaro_winkler(&a, &b) >= self.threshold
    }
}

impl Default for FuzzyTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl SimilarityProvider for FuzzyTable {
    fn similar_categories(&self, a: &str, b: &str) -> bool {
        ExactTable.similar_categories(a, b) || self.close(a, b)
    }

    fn synonymous_descriptions(&self, a: &str, b: &str) -> bool {
        ExactTable.synonymous_descriptions(a, b) || self.close(a, b)
    }
}
