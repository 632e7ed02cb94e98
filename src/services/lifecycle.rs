//! Template lifecycle service
//!
//! Ending recurrence, scoped deletion, purging, and promotion of a one-off
//! transaction into a template. None of these operations touch transactions
//! already materialized from a template.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Frequency, MonthKey, RecurringTemplate, TemplateId, TransactionId};
use crate::storage::Storage;

/// How much of a template a delete removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Skip only the month containing the reference date
    CurrentMonthOnly,
    /// Deactivate the template and drop ledger entries from the reference month on
    AllFuture,
}

/// Service for template lifecycle changes
pub struct LifecycleService<'a> {
    storage: &'a Storage,
}

impl<'a> LifecycleService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// End recurrence after the month containing `reference_date`
    ///
    /// Entries for months up to the new end date are kept; later ones are
    /// dropped since they can never project.
    pub fn stop_future_recurrence(
        &self,
        template_id: TemplateId,
        reference_date: NaiveDate,
    ) -> LedgerResult<RecurringTemplate> {
        self.mutate(template_id, |template| {
            template.end_at_month_of(reference_date)?;
            Ok(())
        })
    }

    /// Delete a template with the given scope
    pub fn delete_template(
        &self,
        template_id: TemplateId,
        scope: DeleteScope,
        reference_date: NaiveDate,
    ) -> LedgerResult<RecurringTemplate> {
        let month = MonthKey::from_date(reference_date);
        self.mutate(template_id, |template| {
            match scope {
                DeleteScope::CurrentMonthOnly => template.force_skip(month),
                DeleteScope::AllFuture => {
                    template.deactivate();
                    template.prune_from(month);
                }
            }
            Ok(())
        })
    }

    /// Remove a template record and its month ledger entirely
    pub fn purge_template(&self, template_id: TemplateId) -> LedgerResult<RecurringTemplate> {
        let purged = self.storage.with_template_lock(template_id, || {
            let template = self.load(template_id)?;
            if !self.storage.templates.delete(template_id)? {
                return Err(LedgerError::template_not_found(template_id.to_string()));
            }

            self.storage.log_delete(
                EntityType::Template,
                template.id.to_string(),
                Some(template.name.clone()),
                &template,
            );
            Ok(template)
        });
        self.storage.release_template_lock(template_id);
        purged
    }

    /// Turn a standalone transaction into a template anchored at its date
    ///
    /// Phase 1 creates the template, phase 2 removes the original record. A
    /// failure in phase 2 is returned with the template left in place;
    /// calling again finds the template and only retries the removal.
    pub fn promote_transaction_to_template(
        &self,
        transaction_id: TransactionId,
        frequency: Frequency,
    ) -> LedgerResult<RecurringTemplate> {
        if let Some(existing) = self.storage.templates.find_promoted_from(transaction_id)? {
            self.remove_promoted(transaction_id)?;
            return Ok(existing);
        }

        let txn = self
            .storage
            .transactions
            .get(transaction_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id.to_string()))?;

        if txn.is_materialized() {
            return Err(LedgerError::InvalidState(format!(
                "Transaction {} was materialized from a template and cannot be promoted",
                txn.id
            )));
        }

        let name = match txn.description.trim() {
            "" => txn.category.trim(),
            description => description,
        };
        let mut template = RecurringTemplate::new(
            txn.owner_id,
            name,
            txn.kind,
            txn.amount,
            txn.category.clone(),
            frequency,
            txn.date,
        );
        template.promoted_from = Some(txn.id);
        template.validate()?;

        self.storage.templates.create(template.clone())?;
        self.storage.log_create(
            EntityType::Template,
            template.id.to_string(),
            Some(template.name.clone()),
            &template,
        );

        self.remove_promoted(transaction_id)?;
        Ok(template)
    }

    fn remove_promoted(&self, transaction_id: TransactionId) -> LedgerResult<()> {
        let Some(txn) = self.storage.transactions.get(transaction_id)? else {
            return Ok(());
        };
        if self.storage.transactions.delete(transaction_id)? {
            self.storage.log_delete(
                EntityType::Transaction,
                txn.id.to_string(),
                Some(format!("{} {}", txn.date, txn.category)),
                &txn,
            );
        }
        Ok(())
    }

    fn mutate(
        &self,
        template_id: TemplateId,
        apply: impl FnOnce(&mut RecurringTemplate) -> LedgerResult<()>,
    ) -> LedgerResult<RecurringTemplate> {
        self.storage.with_template_lock(template_id, || {
            let mut template = self.load(template_id)?;
            let before = template.clone();

            apply(&mut template)?;
            self.storage.templates.update(template.clone())?;

            self.storage.log_update(
                EntityType::Template,
                template.id.to_string(),
                Some(template.name.clone()),
                &before,
                &template,
            );
            Ok(template)
        })
    }

    fn load(&self, template_id: TemplateId) -> LedgerResult<RecurringTemplate> {
        self.storage
            .templates
            .get(template_id)?
            .ok_or_else(|| LedgerError::template_not_found(template_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Money, MonthOverride, OverrideValues, OwnerId, Transaction, TransactionType,
    };
    use crate::services::conversion::ConversionService;
    use crate::services::projection::project_month;
    use crate::storage::{TemplateRepository, TransactionRepository, TransactionStore};
    use crate::audit::AuditLogger;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn create_gym(storage: &Storage, owner: OwnerId) -> RecurringTemplate {
        let template = RecurringTemplate::new(
            owner,
            "Gym",
            TransactionType::Expense,
            Money::from_dollars(40),
            "Health",
            Frequency::Monthly,
            date(2025, 1, 10),
        );
        storage.templates.create(template.clone()).unwrap();
        template
    }

    fn override_values(dollars: i64) -> OverrideValues {
        OverrideValues {
            amount: Money::from_dollars(dollars),
            category: "Health".to_string(),
            name: "Gym".to_string(),
        }
    }

    fn stored(storage: &Storage, id: TemplateId) -> RecurringTemplate {
        storage.templates.get(id).unwrap().unwrap()
    }

    #[test]
    fn test_stop_future_recurrence_boundary() {
        let storage = Storage::in_memory();
        let template = create_gym(&storage, OwnerId::new());

        let updated = LifecycleService::new(&storage)
            .stop_future_recurrence(template.id, date(2025, 4, 17))
            .unwrap();
        assert_eq!(updated.end_date, Some(date(2025, 4, 30)));

        let templates = vec![stored(&storage, template.id)];
        assert_eq!(project_month(&templates, month(2025, 4)).len(), 1);
        assert!(project_month(&templates, month(2025, 5)).is_empty());
        assert!(project_month(&templates, month(2026, 1)).is_empty());
    }

    #[test]
    fn test_stop_keeps_earlier_overrides_and_prunes_later() {
        let storage = Storage::in_memory();
        let mut template = create_gym(&storage, OwnerId::new());
        template.set_override(month(2025, 3), override_values(45)).unwrap();
        template.set_skip(month(2025, 6)).unwrap();
        storage.templates.update(template.clone()).unwrap();

        LifecycleService::new(&storage)
            .stop_future_recurrence(template.id, date(2025, 4, 1))
            .unwrap();

        let saved = stored(&storage, template.id);
        assert!(saved.month_entry(month(2025, 3)).is_some());
        assert!(saved.month_entry(month(2025, 6)).is_none());
    }

    #[test]
    fn test_stop_before_start_rejected() {
        let storage = Storage::in_memory();
        let template = create_gym(&storage, OwnerId::new());

        let err = LifecycleService::new(&storage)
            .stop_future_recurrence(template.id, date(2024, 11, 30))
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(stored(&storage, template.id).end_date.is_none());
    }

    #[test]
    fn test_delete_current_month_only() {
        let storage = Storage::in_memory();
        let mut template = create_gym(&storage, OwnerId::new());
        template.set_override(month(2025, 3), override_values(45)).unwrap();
        storage.templates.update(template.clone()).unwrap();

        let updated = LifecycleService::new(&storage)
            .delete_template(template.id, DeleteScope::CurrentMonthOnly, date(2025, 3, 2))
            .unwrap();

        assert!(updated.is_active);
        assert_eq!(updated.month_entry(month(2025, 3)), Some(&MonthOverride::Skip));
        let templates = vec![updated];
        assert!(project_month(&templates, month(2025, 3)).is_empty());
        assert_eq!(project_month(&templates, month(2025, 4)).len(), 1);
    }

    #[test]
    fn test_delete_all_future_keeps_materialized() {
        let storage = Storage::in_memory();
        let owner = OwnerId::new();
        let mut template = create_gym(&storage, owner);
        template.set_override(month(2025, 2), override_values(45)).unwrap();
        template.set_override(month(2025, 5), override_values(50)).unwrap();
        storage.templates.update(template.clone()).unwrap();

        let converted = ConversionService::new(&storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 3))
            .unwrap();

        let updated = LifecycleService::new(&storage)
            .delete_template(template.id, DeleteScope::AllFuture, date(2025, 3, 20))
            .unwrap();

        assert!(!updated.is_active);
        assert!(updated.month_entry(month(2025, 2)).is_some());
        assert!(updated.month_entry(month(2025, 3)).is_none());
        assert!(updated.month_entry(month(2025, 5)).is_none());
        assert!(project_month(&[updated], month(2025, 4)).is_empty());
        assert!(storage.transactions.get(converted).unwrap().is_some());
    }

    #[test]
    fn test_purge_template() {
        let storage = Storage::in_memory();
        let owner = OwnerId::new();
        let template = create_gym(&storage, owner);
        let converted = ConversionService::new(&storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 1))
            .unwrap();

        let service = LifecycleService::new(&storage);
        service.purge_template(template.id).unwrap();

        assert!(storage.templates.get(template.id).unwrap().is_none());
        assert!(storage.transactions.get(converted).unwrap().is_some());
        assert!(service.purge_template(template.id).unwrap_err().is_not_found());
        assert_eq!(storage.tracked_locks(), 0);
    }

    #[test]
    fn test_unwritable_audit_log_keeps_lifecycle_changes() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::in_memory()
            .with_audit(AuditLogger::new(temp_dir.path().to_path_buf()));
        let template = create_gym(&storage, OwnerId::new());
        let service = LifecycleService::new(&storage);

        let stopped = service
            .stop_future_recurrence(template.id, date(2025, 6, 15))
            .unwrap();
        assert_eq!(stopped.end_date, Some(date(2025, 6, 30)));
        assert_eq!(stored(&storage, template.id).end_date, Some(date(2025, 6, 30)));

        service.purge_template(template.id).unwrap();
        assert!(storage.templates.get(template.id).unwrap().is_none());
        assert_eq!(storage.audit_failures(), 2);
    }

    fn one_off(owner: OwnerId, description: &str) -> Transaction {
        Transaction::new(
            owner,
            TransactionType::Income,
            Money::from_dollars(2500),
            "Salary",
            date(2025, 2, 28),
        )
        .with_description(description)
    }

    #[test]
    fn test_promote_transaction() {
        let storage = Storage::in_memory();
        let owner = OwnerId::new();
        let txn = one_off(owner, "ACME payroll");
        storage.transactions.create(txn.clone()).unwrap();

        let template = LifecycleService::new(&storage)
            .promote_transaction_to_template(txn.id, Frequency::Monthly)
            .unwrap();

        assert_eq!(template.name, "ACME payroll");
        assert_eq!(template.kind, TransactionType::Income);
        assert_eq!(template.amount, Money::from_dollars(2500));
        assert_eq!(template.start_date, date(2025, 2, 28));
        assert_eq!(template.promoted_from, Some(txn.id));
        assert!(storage.transactions.get(txn.id).unwrap().is_none());

        // Anchored on the 28th going forward
        let march = project_month(&[template], month(2025, 3));
        assert_eq!(march[0].date, date(2025, 3, 28));
    }

    #[test]
    fn test_promote_name_falls_back_to_category() {
        let storage = Storage::in_memory();
        let txn = one_off(OwnerId::new(), "  ");
        storage.transactions.create(txn.clone()).unwrap();

        let template = LifecycleService::new(&storage)
            .promote_transaction_to_template(txn.id, Frequency::Biweekly)
            .unwrap();
        assert_eq!(template.name, "Salary");
    }

    #[test]
    fn test_promote_materialized_rejected() {
        let storage = Storage::in_memory();
        let owner = OwnerId::new();
        let template = create_gym(&storage, owner);
        let converted = ConversionService::new(&storage)
            .convert_projected_to_actual(owner, template.id, month(2025, 1))
            .unwrap();

        let err = LifecycleService::new(&storage)
            .promote_transaction_to_template(converted, Frequency::Monthly)
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_promote_missing_transaction() {
        let storage = Storage::in_memory();
        let err = LifecycleService::new(&storage)
            .promote_transaction_to_template(TransactionId::new(), Frequency::Monthly)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Transaction store whose deletes can be made to fail
    struct StickyTransactions {
        inner: TransactionRepository,
        fail_deletes: Arc<AtomicBool>,
    }

    impl TransactionStore for StickyTransactions {
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
            self.inner.find_materialized(template_id, month)
        }
        fn create(&self, transaction: Transaction) -> LedgerResult<()> {
            self.inner.create(transaction)
        }
        fn delete(&self, id: TransactionId) -> LedgerResult<bool> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(LedgerError::store("transaction store offline", "disk full"));
            }
            self.inner.delete(id)
        }
    }

    #[test]
    fn test_promote_retry_after_failed_removal() {
        let fail_deletes = Arc::new(AtomicBool::new(true));
        let storage = Storage::with_stores(
            Box::new(TemplateRepository::in_memory()),
            Box::new(StickyTransactions {
                inner: TransactionRepository::in_memory(),
                fail_deletes: Arc::clone(&fail_deletes),
            }),
        );
        let owner = OwnerId::new();
        let txn = one_off(owner, "ACME payroll");
        storage.transactions.create(txn.clone()).unwrap();
        let service = LifecycleService::new(&storage);

        let err = service
            .promote_transaction_to_template(txn.id, Frequency::Monthly)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store { .. }));
        assert!(storage.transactions.get(txn.id).unwrap().is_some());
        let created = storage.templates.find_promoted_from(txn.id).unwrap().unwrap();

        fail_deletes.store(false, Ordering::SeqCst);
        let retried = service
            .promote_transaction_to_template(txn.id, Frequency::Monthly)
            .unwrap();

        assert_eq!(retried.id, created.id);
        assert_eq!(storage.templates.list_for_owner(owner).unwrap().len(), 1);
        assert!(storage.transactions.get(txn.id).unwrap().is_none());
    }
}
