//! Template repository for JSON storage
//!
//! Keeps templates in memory, in insertion order, and writes them to
//! templates.json after every mutation when backed by a file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{OwnerId, RecurringTemplate, TemplateId, TransactionId};

use super::file_io::{read_json, write_json_atomic};
use super::TemplateStore;

/// Serializable template data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TemplateData {
    templates: Vec<RecurringTemplate>,
}

#[derive(Default)]
struct TemplateTable {
    data: HashMap<TemplateId, RecurringTemplate>,
    /// Insertion order, used for stable projection output
    order: Vec<TemplateId>,
}

impl TemplateTable {
    fn ordered(&self) -> impl Iterator<Item = &RecurringTemplate> {
        self.order.iter().filter_map(|id| self.data.get(id))
    }

    fn snapshot(&self) -> TemplateData {
        TemplateData {
            templates: self.ordered().cloned().collect(),
        }
    }
}

/// Repository for template persistence
pub struct TemplateRepository {
    path: Option<PathBuf>,
    table: RwLock<TemplateTable>,
}

impl TemplateRepository {
    /// Create a repository backed by a JSON file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            table: RwLock::new(TemplateTable::default()),
        }
    }

    /// Create a repository that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: RwLock::new(TemplateTable::default()),
        }
    }

    /// Load templates from disk
    pub fn load(&self) -> LedgerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: TemplateData = read_json(path)?;

        let mut table = self.write_table()?;
        table.data.clear();
        table.order.clear();
        for template in file_data.templates {
            table.order.push(template.id);
            table.data.insert(template.id, template);
        }
        Ok(())
    }

    /// Save templates to disk
    pub fn save(&self) -> LedgerResult<()> {
        let table = self.read_table()?;
        self.persist(&table)
    }

    pub fn count(&self) -> LedgerResult<usize> {
        Ok(self.read_table()?.data.len())
    }

    fn persist(&self, table: &TemplateTable) -> LedgerResult<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, &table.snapshot()),
            None => Ok(()),
        }
    }

    fn read_table(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, TemplateTable>> {
        self.table
            .read()
            .map_err(|e| LedgerError::store("Failed to acquire read lock", e.to_string()))
    }

    fn write_table(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, TemplateTable>> {
        self.table
            .write()
            .map_err(|e| LedgerError::store("Failed to acquire write lock", e.to_string()))
    }
}

impl TemplateStore for TemplateRepository {
    fn list_for_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<RecurringTemplate>> {
        let table = self.read_table()?;
        Ok(table
            .ordered()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn get(&self, id: TemplateId) -> LedgerResult<Option<RecurringTemplate>> {
        Ok(self.read_table()?.data.get(&id).cloned())
    }

    fn find_promoted_from(
        &self,
        transaction_id: TransactionId,
    ) -> LedgerResult<Option<RecurringTemplate>> {
        let table = self.read_table()?;
        let found = table
            .ordered()
            .find(|t| t.promoted_from == Some(transaction_id))
            .cloned();
        Ok(found)
    }

    fn create(&self, template: RecurringTemplate) -> LedgerResult<()> {
        let mut table = self.write_table()?;
        if table.data.contains_key(&template.id) {
            return Err(LedgerError::Duplicate {
                entity_type: "Template",
                identifier: template.id.to_string(),
            });
        }

        let id = template.id;
        table.order.push(id);
        table.data.insert(id, template);

        if let Err(e) = self.persist(&table) {
            table.order.pop();
            table.data.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    fn update(&self, template: RecurringTemplate) -> LedgerResult<()> {
        let mut table = self.write_table()?;
        let id = template.id;
        let Some(previous) = table.data.insert(id, template) else {
            table.data.remove(&id);
            return Err(LedgerError::template_not_found(id.to_string()));
        };

        if let Err(e) = self.persist(&table) {
            table.data.insert(id, previous);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, id: TemplateId) -> LedgerResult<bool> {
        let mut table = self.write_table()?;
        let Some(removed) = table.data.remove(&id) else {
            return Ok(false);
        };
        let position = table.order.iter().position(|t| *t == id);
        if let Some(pos) = position {
            table.order.remove(pos);
        }

        if let Err(e) = self.persist(&table) {
            if let Some(pos) = position {
                table.order.insert(pos, id);
            }
            table.data.insert(id, removed);
            return Err(e);
        }
        Ok(true)
    }
}
