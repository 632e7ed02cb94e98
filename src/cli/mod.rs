//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod budget;
pub mod config;
pub mod month;
pub mod reconcile;
pub mod template;
pub mod transaction;

pub use budget::handle_budget_command;
pub use config::{handle_config_command, ConfigCommands};
pub use month::{handle_month_command, MonthCommands};
pub use reconcile::handle_reconcile_command;
pub use template::{handle_template_command, TemplateCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Frequency, Money, MonthKey, TransactionType};

/// Parse a YYYY-MM-DD date, defaulting to today
pub(crate) fn parse_date_or_today(date: Option<&str>) -> LedgerResult<NaiveDate> {
    match date {
        Some(date_str) => NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|_| {
            LedgerError::Validation(format!(
                "Invalid date format: '{}'. Use YYYY-MM-DD",
                date_str
            ))
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Parse a YYYY-MM month, defaulting to the current month
pub(crate) fn parse_month_or_current(month: Option<&str>) -> LedgerResult<MonthKey> {
    match month {
        Some(month) => MonthKey::parse(month),
        None => Ok(MonthKey::from_date(chrono::Local::now().date_naive())),
    }
}

pub(crate) fn parse_amount(amount: &str) -> LedgerResult<Money> {
    Money::parse(amount).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount format: '{}'. Use format like '100' or '12.50'. Error: {}",
            amount, e
        ))
    })
}

pub(crate) fn parse_kind(kind: &str) -> LedgerResult<TransactionType> {
    TransactionType::parse(kind).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid type: '{}'. Use 'income' or 'expense'",
            kind
        ))
    })
}

pub(crate) fn parse_frequency(frequency: &str) -> LedgerResult<Frequency> {
    Frequency::parse(frequency).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid frequency: '{}'. Use weekly, biweekly, monthly, quarterly or yearly",
            frequency
        ))
    })
}
