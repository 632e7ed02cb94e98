//! Audit logging for Ledgerline
//!
//! Every template, transaction and month-ledger mutation is recorded in an
//! append-only JSONL log with before/after values.
//!
//! - `AuditEntry`: timestamp, operation, entity and optional before/after
//!   snapshots.
//! - `AuditLogger`: appends entries to the log file and reads them back.
//! - `summarize_changes`: human-readable change summary for updates.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerline::audit::{AuditEntry, AuditLogger, EntityType};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::create(
//!     EntityType::Template,
//!     template.id.to_string(),
//!     Some(template.name.clone()),
//!     &template,
//! );
//! logger.log(&entry)?;
//! ```

mod diff;
mod entry;
mod logger;

pub use diff::summarize_changes;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
