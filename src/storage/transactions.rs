//! Transaction repository for JSON storage
//!
//! Manages loading and saving durable transactions to transactions.json.
//! Materialized records are indexed by (template, month); that index is the
//! uniqueness constraint that keeps conversion idempotent under races.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{MonthKey, OwnerId, TemplateId, Transaction, TransactionId};

use super::file_io::{read_json, write_json_atomic};
use super::TransactionStore;

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

#[derive(Default)]
struct TransactionTable {
    data: HashMap<TransactionId, Transaction>,
    /// Index: owner_id -> transaction_ids
    by_owner: HashMap<OwnerId, Vec<TransactionId>>,
    /// Index: (template_id, month) -> materialized transaction_id
    by_materialization: HashMap<(TemplateId, MonthKey), TransactionId>,
}

impl TransactionTable {
    fn insert(&mut self, txn: Transaction) {
        self.by_owner.entry(txn.owner_id).or_default().push(txn.id);
        if let Some(key) = txn.materialization_key() {
            self.by_materialization.insert(key, txn.id);
        }
        self.data.insert(txn.id, txn);
    }

    fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        let txn = self.data.remove(&id)?;
        if let Some(ids) = self.by_owner.get_mut(&txn.owner_id) {
            ids.retain(|&tid| tid != id);
        }
        if let Some(key) = txn.materialization_key() {
            self.by_materialization.remove(&key);
        }
        Some(txn)
    }

    fn snapshot(&self) -> TransactionData {
        let mut transactions: Vec<_> = self.data.values().cloned().collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        TransactionData { transactions }
    }
}

/// Repository for transaction persistence with indexing
pub struct TransactionRepository {
    path: Option<PathBuf>,
    table: RwLock<TransactionTable>,
}

impl TransactionRepository {
    /// Create a repository backed by a JSON file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            table: RwLock::new(TransactionTable::default()),
        }
    }

    /// Create a repository that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: RwLock::new(TransactionTable::default()),
        }
    }

    /// Load transactions from disk and build indexes
    pub fn load(&self) -> LedgerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: TransactionData = read_json(path)?;

        let mut table = self.write_table()?;
        *table = TransactionTable::default();
        for txn in file_data.transactions {
            table.insert(txn);
        }
        Ok(())
    }

    /// Save transactions to disk
    pub fn save(&self) -> LedgerResult<()> {
        let table = self.read_table()?;
        self.persist(&table)
    }

    pub fn count(&self) -> LedgerResult<usize> {
        Ok(self.read_table()?.data.len())
    }

    fn persist(&self, table: &TransactionTable) -> LedgerResult<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, &table.snapshot()),
            None => Ok(()),
        }
    }

    fn read_table(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, TransactionTable>> {
        self.table
            .read()
            .map_err(|e| LedgerError::store("Failed to acquire read lock", e.to_string()))
    }

    fn write_table(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, TransactionTable>> {
        self.table
            .write()
            .map_err(|e| LedgerError::store("Failed to acquire write lock", e.to_string()))
    }
}

impl TransactionStore for TransactionRepository {
    fn list_for_owner(
        &self,
        owner_id: OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Transaction>> {
        let table = self.read_table()?;
        let ids = table
            .by_owner
            .get(&owner_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        let mut transactions: Vec<_> = ids
            .iter()
            .filter_map(|id| table.data.get(id))
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(transactions)
    }

    fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        Ok(self.read_table()?.data.get(&id).cloned())
    }

    fn find_materialized(
        &self,
        template_id: TemplateId,
        month: MonthKey,
    ) -> LedgerResult<Option<Transaction>> {
        let table = self.read_table()?;
        Ok(table
            .by_materialization
            .get(&(template_id, month))
            .and_then(|id| table.data.get(id))
            .cloned())
    }

    fn create(&self, txn: Transaction) -> LedgerResult<()> {
        if txn.is_projected {
            return Err(LedgerError::InvalidState(
                "Projected instances cannot be stored as transactions".into(),
            ));
        }

        let mut table = self.write_table()?;
        if table.data.contains_key(&txn.id) {
            return Err(LedgerError::Duplicate {
                entity_type: "Transaction",
                identifier: txn.id.to_string(),
            });
        }
        if let Some((template_id, month)) = txn.materialization_key() {
            if table.by_materialization.contains_key(&(template_id, month)) {
                return Err(LedgerError::Duplicate {
                    entity_type: "Materialized transaction",
                    identifier: format!("{} {}", template_id, month),
                });
            }
        }

        let id = txn.id;
        table.insert(txn);
        if let Err(e) = self.persist(&table) {
            table.remove(id);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, id: TransactionId) -> LedgerResult<bool> {
        let mut table = self.write_table()?;
        let Some(removed) = table.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&table) {
            table.insert(removed);
            return Err(e);
        }
        Ok(true)
    }
}
