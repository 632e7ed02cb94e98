//! Transaction model
//!
//! Represents both durable income/expense records and the virtual instances
//! the projection engine derives from recurring templates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{OwnerId, TemplateId, TransactionId};
use super::money::Money;
use super::month::MonthKey;
use crate::error::LedgerError;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "in" => Some(Self::Income),
            "expense" | "out" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    pub owner_id: OwnerId,

    /// Positive magnitude; the direction is carried by `kind`
    pub amount: Money,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub description: String,

    pub date: NaiveDate,

    /// Template this record was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,

    /// Month of the template occurrence this record materializes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_key: Option<MonthKey>,

    /// True only for virtual instances produced by projection
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_projected: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new standalone transaction
    pub fn new(
        owner_id: OwnerId,
        kind: TransactionType,
        amount: Money,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            owner_id,
            amount,
            kind,
            category: category.into(),
            description: String::new(),
            date,
            template_id: None,
            month_key: None,
            is_projected: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style description setter
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The (template, month) pair this record materializes, if any
    pub fn materialization_key(&self) -> Option<(TemplateId, MonthKey)> {
        match (self.template_id, self.month_key) {
            (Some(template_id), Some(month)) => Some((template_id, month)),
            _ => None,
        }
    }

    /// Whether this record was materialized from a template
    pub fn is_materialized(&self) -> bool {
        !self.is_projected && self.template_id.is_some()
    }

    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// Validate the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }
        if self.template_id.is_some() != self.month_key.is_some() {
            return Err(TransactionValidationError::PartialTemplateTag);
        }
        if let Some(month) = self.month_key {
            if !month.contains(self.date) {
                return Err(TransactionValidationError::DateOutsideMonth {
                    date: self.date,
                    month,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.date.format("%Y-%m-%d"),
            self.kind,
            self.amount,
            self.category
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    NonPositiveAmount(Money),
    PartialTemplateTag,
    DateOutsideMonth { date: NaiveDate, month: MonthKey },
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Transaction amount must be positive, got {}", amount)
            }
            Self::PartialTemplateTag => {
                write!(f, "Template id and month key must be set together")
            }
            Self::DateOutsideMonth { date, month } => {
                write!(f, "Date {} is outside the tagged month {}", date, month)
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}

impl From<TransactionValidationError> for LedgerError {
    fn from(err: TransactionValidationError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_transaction_is_durable() {
        let txn = Transaction::new(
            OwnerId::new(),
            TransactionType::Expense,
            Money::from_cents(5000),
            "Food",
            date(2025, 1, 15),
        );
        assert!(!txn.is_projected);
        assert!(!txn.is_materialized());
        assert!(txn.materialization_key().is_none());
        assert!(txn.validate().is_ok());
        assert_eq!(txn.signed_amount().cents(), -5000);
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let txn = Transaction::new(
            OwnerId::new(),
            TransactionType::Income,
            Money::zero(),
            "Salary",
            date(2025, 1, 1),
        );
        assert_eq!(
            txn.validate(),
            Err(TransactionValidationError::NonPositiveAmount(Money::zero()))
        );
    }

    #[test]
    fn test_validate_template_tag() {
        let mut txn = Transaction::new(
            OwnerId::new(),
            TransactionType::Expense,
            Money::from_cents(100),
            "Rent",
            date(2025, 1, 1),
        );
        txn.template_id = Some(TemplateId::new());
        assert_eq!(
            txn.validate(),
            Err(TransactionValidationError::PartialTemplateTag)
        );

        txn.month_key = Some(MonthKey::new(2025, 2).unwrap());
        assert!(matches!(
            txn.validate(),
            Err(TransactionValidationError::DateOutsideMonth { .. })
        ));

        txn.month_key = Some(MonthKey::new(2025, 1).unwrap());
        assert!(txn.validate().is_ok());
        assert!(txn.is_materialized());
    }

    #[test]
    fn test_projected_flag_not_serialized_when_false() {
        let txn = Transaction::new(
            OwnerId::new(),
            TransactionType::Expense,
            Money::from_cents(100),
            "Rent",
            date(2025, 1, 1),
        );
        let json = serde_json::to_string(&txn).unwrap();
        assert!(!json.contains("is_projected"));
        assert!(json.contains("\"type\":\"expense\""));

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txn);
    }

    #[test]
    fn test_type_parse() {
        assert_eq!(TransactionType::parse("Income"), Some(TransactionType::Income));
        assert_eq!(TransactionType::parse("expense"), Some(TransactionType::Expense));
        assert_eq!(TransactionType::parse("transfer"), None);
    }
}
