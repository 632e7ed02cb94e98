//! Core data models for Ledgerline
//!
//! Transactions, recurring templates with their per-month ledger, month keys
//! and the money type shared by every component.

pub mod ids;
pub mod money;
pub mod month;
pub mod template;
pub mod transaction;

pub use ids::{OwnerId, TemplateId, TransactionId};
pub use money::{Money, MoneyParseError};
pub use month::MonthKey;
pub use template::{
    Frequency, MonthOverride, Occurrence, OverrideValues, RecurringTemplate,
    TemplateValidationError,
};
pub use transaction::{Transaction, TransactionType, TransactionValidationError};
