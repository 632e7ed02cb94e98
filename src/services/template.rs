//! Template service
//!
//! Validated creation and lookup of recurring templates, plus the monthly
//! commitment summary used by the template listing.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Frequency, Money, OwnerId, RecurringTemplate, TemplateId, TransactionType,
};
use crate::storage::Storage;

/// Service for template management
pub struct TemplateService<'a> {
    storage: &'a Storage,
}

/// Input for creating a new template
#[derive(Debug, Clone)]
pub struct CreateTemplateInput {
    pub name: String,
    pub kind: TransactionType,
    pub amount: Money,
    pub category: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Recurring obligations normalized to one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthlyCommitment {
    pub income: Money,
    pub expenses: Money,
}

impl MonthlyCommitment {
    pub fn net(&self) -> Money {
        self.income - self.expenses
    }
}

impl<'a> TemplateService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new template
    pub fn create(
        &self,
        owner_id: OwnerId,
        input: CreateTemplateInput,
    ) -> LedgerResult<RecurringTemplate> {
        let mut template = RecurringTemplate::new(
            owner_id,
            input.name.trim(),
            input.kind,
            input.amount,
            input.category.trim(),
            input.frequency,
            input.start_date,
        );
        template.end_date = input.end_date;
        template.validate()?;

        self.storage.templates.create(template.clone())?;

        self.storage.log_create(
            EntityType::Template,
            template.id.to_string(),
            Some(template.name.clone()),
            &template,
        );

        Ok(template)
    }

    /// Get a template belonging to `owner_id`
    pub fn get(&self, owner_id: OwnerId, id: TemplateId) -> LedgerResult<RecurringTemplate> {
        self.storage
            .templates
            .get(id)?
            .filter(|t| t.owner_id == owner_id)
            .ok_or_else(|| LedgerError::template_not_found(id.to_string()))
    }

    /// Find a template by id reference or case-insensitive name
    pub fn find(&self, owner_id: OwnerId, reference: &str) -> LedgerResult<RecurringTemplate> {
        let templates = self.storage.templates.list_for_owner(owner_id)?;

        if let Some(template) = templates.iter().find(|t| t.id.matches_ref(reference)) {
            return Ok(template.clone());
        }

        let mut by_name = templates
            .into_iter()
            .filter(|t| t.name.eq_ignore_ascii_case(reference.trim()));
        match (by_name.next(), by_name.next()) {
            (Some(template), None) => Ok(template),
            (Some(_), Some(_)) => Err(LedgerError::Validation(format!(
                "Several templates are named '{}'; use the id instead",
                reference
            ))),
            (None, _) => Err(LedgerError::template_not_found(reference)),
        }
    }

    /// List templates for an owner, in creation order
    pub fn list(
        &self,
        owner_id: OwnerId,
        include_inactive: bool,
    ) -> LedgerResult<Vec<RecurringTemplate>> {
        if include_inactive {
            self.storage.templates.list_for_owner(owner_id)
        } else {
            self.storage.templates.list_active(owner_id)
        }
    }

    /// Sum of monthly equivalents over active templates
    pub fn monthly_commitment(&self, owner_id: OwnerId) -> LedgerResult<MonthlyCommitment> {
        let templates = self.storage.templates.list_active(owner_id)?;
        Ok(monthly_commitment(&templates))
    }
}

/// Sum of monthly equivalents over the active templates in `templates`
pub fn monthly_commitment(templates: &[RecurringTemplate]) -> MonthlyCommitment {
    templates
        .iter()
        .filter(|t| t.is_active)
        .fold(MonthlyCommitment::default(), |mut acc, t| {
            match t.kind {
                TransactionType::Income => acc.income += t.monthly_equivalent(),
                TransactionType::Expense => acc.expenses += t.monthly_equivalent(),
            }
            acc
        })
}
