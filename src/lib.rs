//! Ledgerline - recurring obligation projection and reconciliation
//!
//! This library projects recurring templates (rent, salary, subscriptions)
//! into monthly views, keeps a per-month ledger of overrides and skips,
//! converts projected instances into durable transactions and reconciles a
//! month's obligations against what was actually recorded.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (templates, transactions, month keys, money)
//! - `storage`: Store traits, JSON file repositories and the `Storage` coordinator
//! - `services`: Business logic layer
//! - `audit`: Audit logging system
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `ledgerline` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerline::models::MonthKey;
//! use ledgerline::services::MonthViewService;
//! use ledgerline::storage::Storage;
//!
//! let storage = Storage::in_memory();
//! let month = MonthKey::parse("2025-03")?;
//! let items = MonthViewService::new(&storage).project_month(owner_id, month)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
