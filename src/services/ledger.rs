//! Override ledger service
//!
//! Per-(template, month) overrides and skip markers. Each mutation runs under
//! the template's lock, so two writers to the same template cannot lose each
//! other's entries.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, MonthKey, MonthOverride, OverrideValues, RecurringTemplate, TemplateId};
use crate::storage::Storage;

/// Service for month override and skip management
pub struct OverrideLedgerService<'a> {
    storage: &'a Storage,
}

/// Override input; unset fields fall back to the template defaults
#[derive(Debug, Clone, Default)]
pub struct OverrideInput {
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub name: Option<String>,
}

impl OverrideInput {
    fn resolve(self, template: &RecurringTemplate) -> OverrideValues {
        OverrideValues {
            amount: self.amount.unwrap_or_else(|| template.projected_amount()),
            category: self
                .category
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| template.category.clone()),
            name: self
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| template.name.clone()),
        }
    }
}

impl From<OverrideValues> for OverrideInput {
    fn from(values: OverrideValues) -> Self {
        Self {
            amount: Some(values.amount),
            category: Some(values.category),
            name: Some(values.name),
        }
    }
}

impl<'a> OverrideLedgerService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Upsert an override for a month
    ///
    /// Fails with `InvalidState` when the month is skipped or before the
    /// template's start month, and with `Validation` for a non-positive amount.
    pub fn set_month_override(
        &self,
        template_id: TemplateId,
        month: MonthKey,
        input: OverrideInput,
    ) -> LedgerResult<OverrideValues> {
        self.mutate(template_id, month, |template| {
            let values = input.resolve(template);
            template.set_override(month, values.clone())?;
            Ok(values)
        })
    }

    /// Upsert a skip marker for a month
    ///
    /// Fails with `InvalidState` when the month carries an override.
    pub fn set_month_skip(&self, template_id: TemplateId, month: MonthKey) -> LedgerResult<()> {
        self.mutate(template_id, month, |template| template.set_skip(month))
    }

    /// Remove whatever entry the month has; a no-op when there is none
    pub fn clear_month_override(
        &self,
        template_id: TemplateId,
        month: MonthKey,
    ) -> LedgerResult<Option<MonthOverride>> {
        self.storage.with_template_lock(template_id, || {
            let mut template = self.load(template_id)?;
            let before = template.month_entry(month).cloned();
            if before.is_none() {
                return Ok(None);
            }

            let removed = template.clear_month(month);
            self.storage.templates.update(template.clone())?;
            self.audit(&template, month, &before, &None);
            Ok(removed)
        })
    }

    fn mutate<T>(
        &self,
        template_id: TemplateId,
        month: MonthKey,
        apply: impl FnOnce(&mut RecurringTemplate) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        self.storage.with_template_lock(template_id, || {
            let mut template = self.load(template_id)?;
            let before = template.month_entry(month).cloned();

            let result = apply(&mut template)?;
            let after = template.month_entry(month).cloned();
            if before == after {
                return Ok(result);
            }

            self.storage.templates.update(template.clone())?;
            self.audit(&template, month, &before, &after);
            Ok(result)
        })
    }

    fn load(&self, template_id: TemplateId) -> LedgerResult<RecurringTemplate> {
        self.storage
            .templates
            .get(template_id)?
            .ok_or_else(|| LedgerError::template_not_found(template_id.to_string()))
    }

    fn audit(
        &self,
        template: &RecurringTemplate,
        month: MonthKey,
        before: &Option<MonthOverride>,
        after: &Option<MonthOverride>,
    ) {
        self.storage.log_update(
            EntityType::MonthOverride,
            format!("{}:{}", template.id, month),
            Some(format!("{} {}", template.name, month)),
            before,
            after,
        );
    }
}
