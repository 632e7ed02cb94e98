//! Storage layer for Ledgerline
//!
//! The engine talks to two store traits. The JSON-file repositories in this
//! module are the reference implementations; embedders can hand `Storage`
//! any other implementation through [`Storage::with_stores`].

pub mod file_io;
pub mod templates;
pub mod transactions;

pub use file_io::{read_json, write_json_atomic};
pub use templates::TemplateRepository;
pub use transactions::TransactionRepository;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::audit::{summarize_changes, AuditEntry, AuditLogger, EntityType};
use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{MonthKey, OwnerId, RecurringTemplate, TemplateId, Transaction, TransactionId};

/// CRUD over recurring templates and their month ledgers
pub trait TemplateStore: Send + Sync {
    /// All templates of an owner, in insertion order
    fn list_for_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<RecurringTemplate>>;

    /// Active templates of an owner, in insertion order
    fn list_active(&self, owner_id: OwnerId) -> LedgerResult<Vec<RecurringTemplate>> {
        Ok(self
            .list_for_owner(owner_id)?
            .into_iter()
            .filter(|t| t.is_active)
            .collect())
    }

    fn get(&self, id: TemplateId) -> LedgerResult<Option<RecurringTemplate>>;

    /// Template created by promoting the given transaction, if any
    fn find_promoted_from(
        &self,
        transaction_id: TransactionId,
    ) -> LedgerResult<Option<RecurringTemplate>>;

    /// Fails with `Duplicate` if the id is taken
    fn create(&self, template: RecurringTemplate) -> LedgerResult<()>;

    /// Fails with `NotFound` if the template does not exist
    fn update(&self, template: RecurringTemplate) -> LedgerResult<()>;

    /// Returns whether a record was removed
    fn delete(&self, id: TemplateId) -> LedgerResult<bool>;
}

/// CRUD over durable transactions
///
/// Implementations must reject projected instances and enforce uniqueness of
/// the (template, month) tag on materialized records with `Duplicate`.
pub trait TransactionStore: Send + Sync {
    /// Transactions of an owner dated within `[start, end]`, ordered by date
    fn list_for_owner(
        &self,
        owner_id: OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Transaction>>;

    fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>>;

    /// The durable record materialized from (template, month), if any
    fn find_materialized(
        &self,
        template_id: TemplateId,
        month: MonthKey,
    ) -> LedgerResult<Option<Transaction>>;

    fn create(&self, transaction: Transaction) -> LedgerResult<()>;

    /// Returns whether a record was removed
    fn delete(&self, id: TransactionId) -> LedgerResult<bool>;
}

/// Main storage coordinator
///
/// Owns the stores, the optional audit logger and the per-template lock
/// table that serializes template mutations within the process.
pub struct Storage {
    paths: Option<LedgerPaths>,
    pub templates: Box<dyn TemplateStore>,
    pub transactions: Box<dyn TransactionStore>,
    audit: Option<AuditLogger>,
    template_locks: Mutex<HashMap<TemplateId, Arc<Mutex<()>>>>,
    audit_failures: AtomicUsize,
}

impl Storage {
    /// Open the JSON-file stores under `paths`, loading existing data
    pub fn open(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        let templates = TemplateRepository::new(paths.templates_file());
        templates.load()?;
        let transactions = TransactionRepository::new(paths.transactions_file());
        transactions.load()?;

        let mut storage = Self::with_stores(Box::new(templates), Box::new(transactions));
        storage.audit = Some(AuditLogger::new(paths.audit_log()));
        storage.paths = Some(paths);
        Ok(storage)
    }

    /// Purely in-memory storage without an audit log
    pub fn in_memory() -> Self {
        Self::with_stores(
            Box::new(TemplateRepository::in_memory()),
            Box::new(TransactionRepository::in_memory()),
        )
    }

    /// Storage over caller-provided stores, without an audit log
    pub fn with_stores(
        templates: Box<dyn TemplateStore>,
        transactions: Box<dyn TransactionStore>,
    ) -> Self {
        Self {
            paths: None,
            templates,
            transactions,
            audit: None,
            template_locks: Mutex::new(HashMap::new()),
            audit_failures: AtomicUsize::new(0),
        }
    }

    /// Attach an audit logger
    pub fn with_audit(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn paths(&self) -> Option<&LedgerPaths> {
        self.paths.as_ref()
    }

    pub fn audit_logger(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Run `f` while holding the mutation lock for one template
    ///
    /// A poisoned lock is recovered: the guarded data is `()`, and the stores
    /// roll back their own state on failure.
    pub fn with_template_lock<T>(
        &self,
        id: TemplateId,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let lock = {
            let mut locks = self
                .template_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(id).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Number of audit entries that could not be appended since opening
    pub fn audit_failures(&self) -> usize {
        self.audit_failures.load(Ordering::Relaxed)
    }

    /// Record a create in the audit log
    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        self.append(|| Ok(AuditEntry::create(entity_type, entity_id, entity_name, entity)));
    }

    /// Record an update in the audit log, with a summary of what changed
    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) {
        self.append(|| {
            let before_json = serde_json::to_value(before).map_err(|e| {
                LedgerError::Json(format!("Failed to serialize audit value: {}", e))
            })?;
            let after_json = serde_json::to_value(after).map_err(|e| {
                LedgerError::Json(format!("Failed to serialize audit value: {}", e))
            })?;
            let summary = summarize_changes(&before_json, &after_json);

            Ok(AuditEntry::update(
                entity_type,
                entity_id,
                entity_name,
                &before_json,
                &after_json,
                summary,
            ))
        });
    }

    /// Record a delete in the audit log
    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        self.append(|| Ok(AuditEntry::delete(entity_type, entity_id, entity_name, entity)));
    }

    /// Append an entry describing a store change that is already committed
    ///
    /// The change stands whether or not the entry is written, so a failed
    /// append is reported as a warning and counted, never returned.
    fn append(&self, build: impl FnOnce() -> LedgerResult<AuditEntry>) {
        let Some(logger) = &self.audit else {
            return;
        };

        if let Err(err) = build().and_then(|entry| logger.log(&entry)) {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "audit entry not written to {}: {}",
                logger.path().display(),
                err
            );
        }
    }

    /// Drop the lock entry of a template that no longer exists
    pub(crate) fn release_template_lock(&self, id: TemplateId) {
        let mut locks = self
            .template_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.template_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Operation;
    use crate::models::{Frequency, Money, TransactionType};
    use tempfile::TempDir;

    fn sample_template(owner: OwnerId) -> RecurringTemplate {
        RecurringTemplate::new(
            owner,
            "Rent",
            TransactionType::Expense,
            Money::from_dollars(1200),
            "Housing",
            Frequency::Monthly,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_open_creates_directories_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let owner = OwnerId::new();
        let template = sample_template(owner);

        {
            let storage = Storage::open(paths.clone()).unwrap();
            assert!(temp_dir.path().join("data").exists());
            storage.templates.create(template.clone()).unwrap();
        }

        let storage = Storage::open(paths).unwrap();
        let loaded = storage.templates.list_for_owner(owner).unwrap();
        assert_eq!(loaded, vec![template]);
    }

    #[test]
    fn test_list_active_filters_inactive() {
        let storage = Storage::in_memory();
        let owner = OwnerId::new();
        let active = sample_template(owner);
        let mut inactive = sample_template(owner);
        inactive.deactivate();

        storage.templates.create(active.clone()).unwrap();
        storage.templates.create(inactive).unwrap();

        let listed = storage.templates.list_active(owner).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
    }

    #[test]
    fn test_audit_log_records_update_summary() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();

        let before = sample_template(OwnerId::new());
        let mut after = before.clone();
        after.amount = Money::from_dollars(1300);

        storage
            .log_update(
                EntityType::Template,
                before.id.to_string(),
                Some(before.name.clone()),
                &before,
                &after,
            );

        let entries = storage.audit_logger().unwrap().read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Update);
        assert_eq!(
            entries[0].diff_summary.as_deref(),
            Some("amount: 120000 -> 130000")
        );
    }

    #[test]
    fn test_in_memory_logging_is_noop() {
        let storage = Storage::in_memory();
        assert!(storage.audit_logger().is_none());
        storage.log_create(EntityType::Template, "tpl-1", None, &sample_template(OwnerId::new()));
        assert_eq!(storage.audit_failures(), 0);
    }

    #[test]
    fn test_failed_audit_append_is_counted_not_returned() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let storage = Storage::in_memory()
            .with_audit(AuditLogger::new(temp_dir.path().to_path_buf()));

        storage.log_create(EntityType::Template, "tpl-1", None, &sample_template(OwnerId::new()));
        storage.log_delete(EntityType::Template, "tpl-1", None, &sample_template(OwnerId::new()));

        assert_eq!(storage.audit_failures(), 2);
    }

    #[test]
    fn test_template_locks_are_per_id() {
        let storage = Storage::in_memory();
        let a = TemplateId::new();
        let b = TemplateId::new();

        let result = storage
            .with_template_lock(a, || storage.with_template_lock(b, || Ok(7)))
            .unwrap();
        assert_eq!(result, 7);
        assert_eq!(storage.tracked_locks(), 2);

        storage.release_template_lock(a);
        assert_eq!(storage.tracked_locks(), 1);
    }

    #[test]
    fn test_lock_in_use_is_not_released() {
        let storage = Storage::in_memory();
        let id = TemplateId::new();

        storage
            .with_template_lock(id, || {
                storage.release_template_lock(id);
                Ok(())
            })
            .unwrap();
        assert_eq!(storage.tracked_locks(), 1);
    }
}
