//! Projection engine and month view
//!
//! `project_month` derives the virtual instances a set of templates yields for
//! one month. It is a pure function of its inputs: no store access and no
//! clock. `MonthViewService` merges those instances with the durable records
//! of the month.

use crate::error::LedgerResult;
use crate::models::{MonthKey, OwnerId, RecurringTemplate, Transaction};
use crate::storage::Storage;

/// Derive projected instances for `month`
///
/// Every returned transaction has `is_projected` set and carries the
/// (template, month) tag. Output is ordered by date, then by the order of
/// `templates`.
pub fn project_month(templates: &[RecurringTemplate], month: MonthKey) -> Vec<Transaction> {
    let mut instances: Vec<Transaction> = templates
        .iter()
        .filter_map(|template| projected_instance(template, month))
        .collect();
    instances.sort_by_key(|t| t.date);
    instances
}

/// The virtual instance `template` yields in `month`, if any
pub fn projected_instance(template: &RecurringTemplate, month: MonthKey) -> Option<Transaction> {
    let occurrence = template.occurrence(month)?;

    let mut txn = Transaction::new(
        template.owner_id,
        template.kind,
        occurrence.amount,
        occurrence.category,
        occurrence.date,
    )
    .with_description(occurrence.name);
    txn.template_id = Some(template.id);
    txn.month_key = Some(month);
    txn.is_projected = true;
    Some(txn)
}

/// Expected and actual sets for one month
#[derive(Debug, Clone, Default)]
pub struct BudgetInputs {
    /// Obligations: projected instances plus records materialized from templates
    pub expected: Vec<Transaction>,
    /// Every durable record dated in the month
    pub actual: Vec<Transaction>,
}

/// Service for the merged month view
pub struct MonthViewService<'a> {
    storage: &'a Storage,
}

impl<'a> MonthViewService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Durable records plus still-virtual instances for the month, by date
    ///
    /// A projected instance whose (template, month) already has a durable
    /// record is dropped, so a conversion interrupted before its skip write
    /// never shows the obligation twice.
    pub fn project_month(&self, owner_id: OwnerId, month: MonthKey) -> LedgerResult<Vec<Transaction>> {
        let (actual, projected) = self.load(owner_id, month)?;

        let mut merged = actual;
        merged.extend(projected);
        merged.sort_by_key(|t| t.date);
        Ok(merged)
    }

    /// Inputs for reconciliation and budget comparison of a month
    pub fn budget_inputs(&self, owner_id: OwnerId, month: MonthKey) -> LedgerResult<BudgetInputs> {
        let (actual, projected) = self.load(owner_id, month)?;

        let mut expected: Vec<Transaction> = actual
            .iter()
            .filter(|t| t.is_materialized())
            .cloned()
            .collect();
        expected.extend(projected);
        expected.sort_by_key(|t| t.date);

        Ok(BudgetInputs { expected, actual })
    }

    fn load(
        &self,
        owner_id: OwnerId,
        month: MonthKey,
    ) -> LedgerResult<(Vec<Transaction>, Vec<Transaction>)> {
        let actual =
            self.storage
                .transactions
                .list_for_owner(owner_id, month.start_date(), month.end_date())?;
        let templates = self.storage.templates.list_active(owner_id)?;

        let projected = project_month(&templates, month)
            .into_iter()
            .filter(|p| {
                !actual
                    .iter()
                    .any(|a| a.materialization_key() == p.materialization_key())
            })
            .collect();

        Ok((actual, projected))
    }
}
