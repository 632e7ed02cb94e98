//! Recurring obligation templates
//!
//! A template describes an income or expense that repeats (rent, salary,
//! insurance premiums). Templates carry their own per-month ledger: a map of
//! month keys to either an override of the default values or a skip marker.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ids::{OwnerId, TemplateId, TransactionId};
use super::money::Money;
use super::month::MonthKey;
use super::transaction::TransactionType;
use crate::error::{LedgerError, LedgerResult};

/// How often a template recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Factor converting one occurrence into its monthly equivalent
    ///
    /// Weekly and biweekly use calendar averages (52/12 weeks per month,
    /// rounded to 4.33, and 26/12 rounded to 2.17).
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 4.33,
            Self::Biweekly => 2.17,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::Yearly => 1.0 / 12.0,
        }
    }

    /// Months between firings for anchor-based frequencies
    pub fn month_interval(&self) -> u32 {
        match self {
            Self::Quarterly => 3,
            Self::Yearly => 12,
            Self::Weekly | Self::Biweekly | Self::Monthly => 1,
        }
    }

    /// Whether a template anchored at `anchor` fires in `month`
    ///
    /// Nothing fires before the anchor month. Quarterly and yearly templates
    /// fire every 3 or 12 months counted from the anchor; all other
    /// frequencies fire every month.
    pub fn fires_in(&self, anchor: MonthKey, month: MonthKey) -> bool {
        let elapsed = month.months_since(anchor);
        elapsed >= 0 && elapsed % self.month_interval() as i32 == 0
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "biweekly" | "bi-weekly" | "fortnightly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "yearly" | "annual" | "annually" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        };
        write!(f, "{}", name)
    }
}

/// Replacement values for one month of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideValues {
    pub amount: Money,
    pub category: String,
    pub name: String,
}

/// A ledger entry for one (template, month) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthOverride {
    Override(OverrideValues),
    Skip,
}

impl MonthOverride {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Effective values of one projected occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub amount: Money,
    pub category: String,
    pub name: String,
}

/// A recurring obligation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: TemplateId,
    pub owner_id: OwnerId,
    pub name: String,
    /// Amount of a single occurrence
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub month_overrides: BTreeMap<MonthKey, MonthOverride>,
    /// Standalone transaction this template was promoted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_from: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl RecurringTemplate {
    pub fn new(
        owner_id: OwnerId,
        name: impl Into<String>,
        kind: TransactionType,
        amount: Money,
        category: impl Into<String>,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TemplateId::new(),
            owner_id,
            name: name.into(),
            amount,
            kind,
            category: category.into(),
            frequency,
            start_date,
            end_date: None,
            is_active: true,
            month_overrides: BTreeMap::new(),
            promoted_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The month of `start_date`; recurrence is counted from here
    pub fn anchor_month(&self) -> MonthKey {
        MonthKey::from_date(self.start_date)
    }

    /// Per-occurrence amount normalized to a monthly figure
    pub fn monthly_equivalent(&self) -> Money {
        self.amount.scale(self.frequency.monthly_factor())
    }

    /// Default amount a projected instance carries
    ///
    /// Sub-monthly frequencies collapse into one instance per month carrying
    /// their monthly equivalent. Monthly, quarterly and yearly templates fire
    /// only in their own months and carry the full occurrence amount there.
    pub fn projected_amount(&self) -> Money {
        match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => self.monthly_equivalent(),
            Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => self.amount,
        }
    }

    /// Whether the [start, end] range overlaps the month at all
    pub fn overlaps(&self, month: MonthKey) -> bool {
        if self.start_date > month.end_date() {
            return false;
        }
        match self.end_date {
            Some(end) => end >= month.start_date(),
            None => true,
        }
    }

    /// Date a projected instance falls on in `month`
    pub fn occurrence_date(&self, month: MonthKey) -> NaiveDate {
        let date = month.clamped_day(self.start_date.day());
        match self.end_date {
            Some(end) if end < date => end,
            _ => date,
        }
    }

    /// Whether the template yields an occurrence in `month`, ignoring skips
    pub fn recurs_in(&self, month: MonthKey) -> bool {
        self.is_active
            && self.overlaps(month)
            && self.frequency.fires_in(self.anchor_month(), month)
    }

    /// Effective values for `month`, or `None` when nothing projects
    pub fn occurrence(&self, month: MonthKey) -> Option<Occurrence> {
        if !self.recurs_in(month) {
            return None;
        }

        let date = self.occurrence_date(month);
        match self.month_overrides.get(&month) {
            Some(MonthOverride::Skip) => None,
            Some(MonthOverride::Override(values)) => Some(Occurrence {
                date,
                amount: values.amount,
                category: values.category.clone(),
                name: values.name.clone(),
            }),
            None => Some(Occurrence {
                date,
                amount: self.projected_amount(),
                category: self.category.clone(),
                name: self.name.clone(),
            }),
        }
    }

    /// Ledger entry for a month, if any
    pub fn month_entry(&self, month: MonthKey) -> Option<&MonthOverride> {
        self.month_overrides.get(&month)
    }

    /// Record an override for a month
    ///
    /// Rejected when the month is skipped or lies before the start month.
    pub fn set_override(&mut self, month: MonthKey, values: OverrideValues) -> LedgerResult<()> {
        if !values.amount.is_positive() {
            return Err(LedgerError::Validation(format!(
                "Override amount must be positive, got {}",
                values.amount
            )));
        }
        if month < self.anchor_month() {
            return Err(LedgerError::InvalidState(format!(
                "Cannot override {} before the template starts ({})",
                month,
                self.anchor_month()
            )));
        }
        if let Some(MonthOverride::Skip) = self.month_overrides.get(&month) {
            return Err(LedgerError::InvalidState(format!(
                "Month {} is skipped; clear it before overriding",
                month
            )));
        }

        self.month_overrides
            .insert(month, MonthOverride::Override(values));
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a skip marker for a month
    ///
    /// Rejected when the month already carries an override.
    pub fn set_skip(&mut self, month: MonthKey) -> LedgerResult<()> {
        if let Some(MonthOverride::Override(_)) = self.month_overrides.get(&month) {
            return Err(LedgerError::InvalidState(format!(
                "Month {} has an override; clear it before skipping",
                month
            )));
        }

        self.month_overrides.insert(month, MonthOverride::Skip);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace whatever entry the month has with a skip marker
    pub(crate) fn force_skip(&mut self, month: MonthKey) {
        self.month_overrides.insert(month, MonthOverride::Skip);
        self.updated_at = Utc::now();
    }

    /// Remove a month's entry, returning it
    pub fn clear_month(&mut self, month: MonthKey) -> Option<MonthOverride> {
        let removed = self.month_overrides.remove(&month);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Remove every entry for months at or after `from`, returning how many
    pub fn prune_from(&mut self, from: MonthKey) -> usize {
        let removed = self.month_overrides.split_off(&from).len();
        if removed > 0 {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Bound recurrence at the end of the month containing `reference_date`
    pub fn end_at_month_of(&mut self, reference_date: NaiveDate) -> LedgerResult<NaiveDate> {
        let end = MonthKey::from_date(reference_date).end_date();
        if end < self.start_date {
            return Err(LedgerError::InvalidState(format!(
                "End date {} is before the start date {}",
                end, self.start_date
            )));
        }
        self.end_date = Some(end);
        self.prune_from(MonthKey::from_date(end).next());
        self.updated_at = Utc::now();
        Ok(end)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Validate the template
    pub fn validate(&self) -> Result<(), TemplateValidationError> {
        if self.name.trim().is_empty() {
            return Err(TemplateValidationError::EmptyName);
        }
        if !self.amount.is_positive() {
            return Err(TemplateValidationError::NonPositiveAmount(self.amount));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(TemplateValidationError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for RecurringTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.amount, self.frequency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValidationError {
    EmptyName,
    NonPositiveAmount(Money),
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for TemplateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Template name cannot be empty"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "Template amount must be positive, got {}", amount)
            }
            Self::EndBeforeStart { start, end } => {
                write!(f, "End date {} is before the start date {}", end, start)
            }
        }
    }
}

impl std::error::Error for TemplateValidationError {}

impl From<TemplateValidationError> for LedgerError {
    fn from(err: TemplateValidationError) -> Self {
        match err {
            TemplateValidationError::EndBeforeStart { .. } => {
                LedgerError::InvalidState(err.to_string())
            }
            _ => LedgerError::Validation(err.to_string()),
        }
    }
}
