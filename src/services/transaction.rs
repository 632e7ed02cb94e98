//! Transaction service
//!
//! Recording and listing standalone durable transactions. Materialized
//! records are created by the conversion service, never here.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, MonthKey, OwnerId, Transaction, TransactionType};
use crate::storage::Storage;

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

/// Input for recording a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub kind: TransactionType,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl<'a> TransactionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a new standalone transaction
    pub fn create(
        &self,
        owner_id: OwnerId,
        input: CreateTransactionInput,
    ) -> LedgerResult<Transaction> {
        let mut txn = Transaction::new(
            owner_id,
            input.kind,
            input.amount,
            input.category.trim(),
            input.date,
        );
        if let Some(description) = input.description {
            txn.description = description.trim().to_string();
        }

        txn.validate()?;
        self.storage.transactions.create(txn.clone())?;

        self.storage.log_create(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(format!("{} {}", txn.date, txn.category)),
            &txn,
        );

        Ok(txn)
    }

    /// Transactions dated within a month, by date
    pub fn list_for_month(&self, owner_id: OwnerId, month: MonthKey) -> LedgerResult<Vec<Transaction>> {
        self.storage
            .transactions
            .list_for_owner(owner_id, month.start_date(), month.end_date())
    }

    /// Every transaction of an owner, by date
    pub fn list_all(&self, owner_id: OwnerId) -> LedgerResult<Vec<Transaction>> {
        self.storage
            .transactions
            .list_for_owner(owner_id, NaiveDate::MIN, NaiveDate::MAX)
    }

    /// Find a transaction by full or short id
    pub fn find(&self, owner_id: OwnerId, reference: &str) -> LedgerResult<Transaction> {
        self.list_all(owner_id)?
            .into_iter()
            .find(|t| t.id.matches_ref(reference))
            .ok_or_else(|| LedgerError::transaction_not_found(reference))
    }
}
