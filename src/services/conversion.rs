//! Conversion service
//!
//! Materializes one projected instance into a durable transaction. The
//! operation spans two stores and runs in two phases:
//!
//! 1. create the durable record tagged with (template, month)
//! 2. write a skip marker for the month so it no longer projects
//!
//! The transaction store's uniqueness on the tag makes phase 1 idempotent. A
//! failed phase 2 deletes the phase 1 record again; if that delete fails too,
//! the error says so and the next call finds the record and finishes phase 2.
//! Audit entries are written after both phases and never fail the operation.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{MonthKey, OwnerId, RecurringTemplate, TemplateId, TransactionId};
use crate::storage::Storage;

use super::projection::projected_instance;

/// Service for materializing projected instances
pub struct ConversionService<'a> {
    storage: &'a Storage,
}

impl<'a> ConversionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Turn the instance `template_id` projects in `month` into a durable record
    ///
    /// Returns the id of the durable record; repeated calls return the same
    /// id. Fails with `NotFound` when the template does not belong to
    /// `owner_id` and with `InvalidState` when the month does not project.
    pub fn convert_projected_to_actual(
        &self,
        owner_id: OwnerId,
        template_id: TemplateId,
        month: MonthKey,
    ) -> LedgerResult<TransactionId> {
        self.storage.with_template_lock(template_id, || {
            let template = self
                .storage
                .templates
                .get(template_id)?
                .filter(|t| t.owner_id == owner_id)
                .ok_or_else(|| LedgerError::template_not_found(template_id.to_string()))?;

            if let Some(existing) = self.storage.transactions.find_materialized(template_id, month)? {
                self.ensure_skipped(template, month)?;
                return Ok(existing.id);
            }

            let mut txn = projected_instance(&template, month).ok_or_else(|| {
                LedgerError::InvalidState(format!(
                    "{} does not project in {}",
                    template.name, month
                ))
            })?;
            txn.is_projected = false;
            txn.validate()?;

            match self.storage.transactions.create(txn.clone()) {
                Ok(()) => {}
                Err(e) if e.is_duplicate() => {
                    // Another converter won the race; its record is the answer
                    let winner = self
                        .storage
                        .transactions
                        .find_materialized(template_id, month)?
                        .ok_or(e)?;
                    self.ensure_skipped(template, month)?;
                    return Ok(winner.id);
                }
                Err(e) => return Err(e),
            }

            if let Err(e) = self.ensure_skipped(template, month) {
                return Err(self.compensate(txn.id, month, e));
            }

            self.storage.log_create(
                EntityType::Transaction,
                txn.id.to_string(),
                Some(format!("{} {}", txn.description, month)),
                &txn,
            );

            Ok(txn.id)
        })
    }

    /// Undo phase 1 after phase 2 failed, returning the error to report
    ///
    /// When the record cannot be removed either, the phase 2 error stays the
    /// source and the context says the next conversion call finishes the job.
    fn compensate(&self, id: TransactionId, month: MonthKey, cause: LedgerError) -> LedgerError {
        match self.storage.transactions.delete(id) {
            Ok(_) => cause,
            Err(undo) => LedgerError::store(
                format!(
                    "{}; removing record {} also failed ({}), convert {} again to finish",
                    cause, id, undo, month
                ),
                cause,
            ),
        }
    }

    /// Write the skip marker for a materialized month, replacing any override
    fn ensure_skipped(&self, mut template: RecurringTemplate, month: MonthKey) -> LedgerResult<()> {
        let before = template.month_entry(month).cloned();
        if matches!(before, Some(ref entry) if entry.is_skip()) {
            return Ok(());
        }

        template.force_skip(month);
        self.storage.templates.update(template.clone())?;

        self.storage.log_update(
            EntityType::MonthOverride,
            format!("{}:{}", template.id, month),
            Some(format!("{} {}", template.name, month)),
            &before,
            &template.month_entry(month).cloned(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Frequency, Money, MonthOverride, OverrideValues, Transaction, TransactionType,
    };
    use crate::services::projection::MonthViewService;
    use crate::storage::{TemplateRepository, TemplateStore, TransactionRepository, TransactionStore};
    use crate::audit::AuditLogger;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;
    use std::sync::Arc;

    /// Template store whose updates can be made to fail
    struct FlakyTemplates {
        inner: TemplateRepository,
        fail_updates: Arc<AtomicBool>,
    }

    impl TemplateStore for FlakyTemplates {
        fn list_for_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<RecurringTemplate>> {
            self.inner.list_for_owner(owner_id)
        }
        fn get(&self, id: TemplateId) -> LedgerResult<Option<RecurringTemplate>> {
            self.inner.get(id)
        }
        fn find_promoted_from(
            &self,
            transaction_id: TransactionId,
        ) -> LedgerResult<Option<RecurringTemplate>> {
            self.inner.find_promoted_from(transaction_id)
        }
        fn create(&self, template: RecurringTemplate) -> LedgerResult<()> {
            self.inner.create(template)
        }
        fn update(&self, template: RecurringTemplate) -> LedgerResult<()> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(LedgerError::store("template store offline", "connection reset"));
            }
            self.inner.update(template)
        }
        fn delete(&self, id: TemplateId) -> LedgerResult<bool> {
            self.inner.delete(id)
        }
    }

    /// Transaction store that hides existing materializations from the
    /// first `hidden_lookups` lookups, as a concurrent converter would see
    struct RacingTransactions {
        inner: TransactionRepository,
        hidden_lookups: Arc<AtomicUsize>,
        fail_deletes: Arc<AtomicBool>,
    }

    impl TransactionStore for RacingTransactions {
        fn list_for_owner(
            &self,
            owner_id: OwnerId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> LedgerResult<Vec<Transaction>> {
            self.inner.list_for_owner(owner_id, start, end)
        }
        fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
            self.inner.get(id)
        }
        fn find_materialized(
            &self,
            template_id: TemplateId,
            month: MonthKey,
        ) -> LedgerResult<Option<Transaction>> {
            let hidden = self
                .hidden_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if hidden {
                return Ok(None);
            }
            self.inner.find_materialized(template_id, month)
        }
        fn create(&self, transaction: Transaction) -> LedgerResult<()> {
            self.inner.create(transaction)
        }
        fn delete(&self, id: TransactionId) -> LedgerResult<bool> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(LedgerError::store("transaction store offline", "broken pipe"));
            }
            self.inner.delete(id)
        }
    }

    struct Harness {
        storage: Storage,
        fail_updates: Arc<AtomicBool>,
        hidden_lookups: Arc<AtomicUsize>,
        fail_deletes: Arc<AtomicBool>,
    }

    fn harness() -> Harness {
        let fail_updates = Arc::new(AtomicBool::new(false));
        let hidden_lookups = Arc::new(AtomicUsize::new(0));
        let fail_deletes = Arc::new(AtomicBool::new(false));
        let storage = Storage::with_stores(
            Box::new(FlakyTemplates {
                inner: TemplateRepository::in_memory(),
                fail_updates: Arc::clone(&fail_updates),
            }),
            Box::new(RacingTransactions {
                inner: TransactionRepository::in_memory(),
                hidden_lookups: Arc::clone(&hidden_lookups),
                fail_deletes: Arc::clone(&fail_deletes),
            }),
        );
        Harness {
            storage,
            fail_updates,
            hidden_lookups,
            fail_deletes,
        }
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn create_rent(storage: &Storage, owner: OwnerId) -> RecurringTemplate {
        let template = RecurringTemplate::new(
            owner,
            "Rent",
            TransactionType::Expense,
            Money::from_dollars(1200),
            "Housing",
            Frequency::Monthly,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        storage.templates.create(template.clone()).unwrap();
        template
    }

    fn durable_count(storage: &Storage, owner: OwnerId) -> usize {
        storage
            .transactions
            .list_for_owner(
                owner,
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
            )
            .unwrap()
            .len()
    }

    #[test]
    fn test_convert_creates_record_and_skip() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);
        let service = ConversionService::new(&h.storage);

        let id = service
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        let txn = h.storage.transactions.get(id).unwrap().unwrap();
        assert!(!txn.is_projected);
        assert_eq!(txn.materialization_key(), Some((template.id, month(2025, 3))));
        assert_eq!(txn.amount, Money::from_dollars(1200));
        assert_eq!(txn.description, "Rent");

        let saved = h.storage.templates.get(template.id).unwrap().unwrap();
        assert_eq!(saved.month_entry(month(2025, 3)), Some(&MonthOverride::Skip));

        // The month view shows the durable record only
        let view = MonthViewService::new(&h.storage)
            .project_month(owner, month(2025, 3))
            .unwrap();
        assert_eq!(view.len(), 1);
        assert!(!view[0].is_projected);
    }

    #[test]
    fn test_convert_twice_is_idempotent() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);
        let service = ConversionService::new(&h.storage);

        let first = service
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();
        let second = service
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(durable_count(&h.storage, owner), 1);
    }

    #[test]
    fn test_convert_uses_override_values() {
        let h = harness();
        let owner = OwnerId::new();
        let mut template = create_rent(&h.storage, owner);
        template
            .set_override(
                month(2025, 4),
                OverrideValues {
                    amount: Money::from_dollars(1250),
                    category: "Housing".to_string(),
                    name: "Rent + parking".to_string(),
                },
            )
            .unwrap();
        h.storage.templates.update(template.clone()).unwrap();

        let id = ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 4))
            .unwrap();

        let txn = h.storage.transactions.get(id).unwrap().unwrap();
        assert_eq!(txn.amount, Money::from_dollars(1250));
        assert_eq!(txn.description, "Rent + parking");
        let saved = h.storage.templates.get(template.id).unwrap().unwrap();
        assert_eq!(saved.month_entry(month(2025, 4)), Some(&MonthOverride::Skip));
    }

    #[test]
    fn test_convert_non_projecting_month_rejected() {
        let h = harness();
        let owner = OwnerId::new();
        let mut template = create_rent(&h.storage, owner);
        template.set_skip(month(2025, 2)).unwrap();
        h.storage.templates.update(template.clone()).unwrap();
        let service = ConversionService::new(&h.storage);

        let skipped = service
            .convert_projected_to_actual(owner, template.id, month(2025, 2))
            .unwrap_err();
        assert!(skipped.is_invalid_state());

        let before_start = service
            .convert_projected_to_actual(owner, template.id, month(2024, 12))
            .unwrap_err();
        assert!(before_start.is_invalid_state());

        assert_eq!(durable_count(&h.storage, owner), 0);
    }

    #[test]
    fn test_convert_wrong_owner_is_not_found() {
        let h = harness();
        let template = create_rent(&h.storage, OwnerId::new());

        let err = ConversionService::new(&h.storage)
            .convert_projected_to_actual(OwnerId::new(), template.id, month(2025, 3))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_failed_skip_write_leaves_no_partial_state() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);
        h.fail_updates.store(true, Ordering::SeqCst);

        let err = ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Store { .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(durable_count(&h.storage, owner), 0);
        let saved = h.storage.templates.get(template.id).unwrap().unwrap();
        assert!(saved.month_entry(month(2025, 3)).is_none());

        // Once the store recovers the conversion goes through
        h.fail_updates.store(false, Ordering::SeqCst);
        ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();
        assert_eq!(durable_count(&h.storage, owner), 1);
    }

    #[test]
    fn test_failed_undo_is_reported_and_next_call_finishes() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);
        h.fail_updates.store(true, Ordering::SeqCst);
        h.fail_deletes.store(true, Ordering::SeqCst);

        let err = ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("template store offline"));
        assert!(message.contains("transaction store offline"));
        assert!(message.contains("convert 2025-03 again"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("template store offline"));
        assert_eq!(durable_count(&h.storage, owner), 1);

        h.fail_updates.store(false, Ordering::SeqCst);
        h.fail_deletes.store(false, Ordering::SeqCst);
        ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();
        assert_eq!(durable_count(&h.storage, owner), 1);
        let saved = h.storage.templates.get(template.id).unwrap().unwrap();
        assert_eq!(saved.month_entry(month(2025, 3)), Some(&MonthOverride::Skip));
    }

    #[test]
    fn test_unwritable_audit_log_keeps_conversion() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::in_memory()
            .with_audit(AuditLogger::new(temp_dir.path().to_path_buf()));
        let owner = OwnerId::new();
        let template = create_rent(&storage, owner);

        let id = ConversionService::new(&storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        assert!(storage.transactions.get(id).unwrap().is_some());
        let saved = storage.templates.get(template.id).unwrap().unwrap();
        assert_eq!(saved.month_entry(month(2025, 3)), Some(&MonthOverride::Skip));
        assert!(storage.audit_failures() > 0);

        let view = MonthViewService::new(&storage)
            .project_month(owner, month(2025, 3))
            .unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, id);

        // Converting again is still a no-op returning the same record
        let again = ConversionService::new(&storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn test_recovers_record_without_skip_marker() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);

        let mut orphan = Transaction::new(
            owner,
            TransactionType::Expense,
            Money::from_dollars(1200),
            "Housing",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        orphan.template_id = Some(template.id);
        orphan.month_key = Some(month(2025, 3));
        h.storage.transactions.create(orphan.clone()).unwrap();

        let id = ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        assert_eq!(id, orphan.id);
        let saved = h.storage.templates.get(template.id).unwrap().unwrap();
        assert_eq!(saved.month_entry(month(2025, 3)), Some(&MonthOverride::Skip));
    }

    #[test]
    fn test_lost_race_returns_winner_id() {
        let h = harness();
        let owner = OwnerId::new();
        let template = create_rent(&h.storage, owner);

        let mut winner = Transaction::new(
            owner,
            TransactionType::Expense,
            Money::from_dollars(1200),
            "Housing",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        winner.template_id = Some(template.id);
        winner.month_key = Some(month(2025, 3));
        h.storage.transactions.create(winner.clone()).unwrap();
        h.hidden_lookups.store(1, Ordering::SeqCst);

        let id = ConversionService::new(&h.storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        assert_eq!(id, winner.id);
        assert_eq!(durable_count(&h.storage, owner), 1);
    }
}
