//! In-memory record store backed by DashMap.
//!
//! Production deployments talk to the hosted backend through its client SDK;
//! this provides the same API surface for development and testing.

use dashmap::DashMap;
use leadnectar_core::{NectarError, NectarResult};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{merge_patch, record_id, Filter, RecordStore, Table};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<(Table, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("Record store initialized (in-memory, development mode)");
        Self {
            records: DashMap::new(),
        }
    }

    pub fn len(&self, table: Table) -> usize {
        self.records.iter().filter(|r| r.key().0 == table).count()
    }

    pub fn get(&self, table: Table, id: &str) -> Option<Value> {
        self.records
            .get(&(table, id.to_string()))
            .map(|r| r.value().clone())
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, table: Table, record: Value) -> NectarResult<Value> {
        let id = record_id(&record)?;
        let key = (table, id.clone());
        if self.records.contains_key(&key) {
            return Err(NectarError::Conflict(format!(
                "{} record {} already exists",
                table, id
            )));
        }
        debug!(%table, id = %id, "Inserting record");
        self.records.insert(key, record.clone());
        Ok(record)
    }

    fn update(&self, table: Table, id: &str, patch: Value) -> NectarResult<Value> {
        let mut entry = self
            .records
            .get_mut(&(table, id.to_string()))
            .ok_or_else(|| NectarError::not_found(table.as_str(), id))?;
        merge_patch(entry.value_mut(), patch)?;
        debug!(%table, id = %id, "Updated record");
        Ok(entry.value().clone())
    }

    fn delete(&self, table: Table, id: &str) -> NectarResult<()> {
        self.records
            .remove(&(table, id.to_string()))
            .ok_or_else(|| NectarError::not_found(table.as_str(), id))?;
        debug!(%table, id = %id, "Deleted record");
        Ok(())
    }

    fn query(&self, table: Table, filter: &Filter) -> NectarResult<Vec<Value>> {
        let mut rows: Vec<(String, Value)> = self
            .records
            .iter()
            .filter(|r| r.key().0 == table && filter.matches(r.value()))
            .map(|r| (r.key().1.clone(), r.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows.into_iter().map(|(_, v)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_query() {
        let store = MemoryStore::new();
        store
            .insert(Table::Sequences, json!({"id": "b", "status": "draft"}))
            .unwrap();
        store
            .insert(Table::Sequences, json!({"id": "a", "status": "active"}))
            .unwrap();
        store
            .insert(Table::Campaigns, json!({"id": "c", "status": "active"}))
            .unwrap();

        let all = store.query(Table::Sequences, &Filter::all()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["id"], "a");

        let active = store
            .query(Table::Sequences, &Filter::eq("status", "active"))
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(store.len(Table::Campaigns), 1);
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        store.insert(Table::Templates, json!({"id": "t"})).unwrap();
        let err = store.insert(Table::Templates, json!({"id": "t"})).unwrap_err();
        assert!(matches!(err, NectarError::Conflict(_)));
    }

    #[test]
    fn test_insert_without_id_rejected() {
        let store = MemoryStore::new();
        let err = store.insert(Table::Templates, json!({"name": "t"})).unwrap_err();
        assert!(matches!(err, NectarError::Validation(_)));
    }

    #[test]
    fn test_update_is_last_writer_wins() {
        let store = MemoryStore::new();
        store
            .insert(Table::Sequences, json!({"id": "s", "name": "v0"}))
            .unwrap();
        store
            .update(Table::Sequences, "s", json!({"name": "v1"}))
            .unwrap();
        let row = store
            .update(Table::Sequences, "s", json!({"name": "v2"}))
            .unwrap();
        assert_eq!(row["name"], "v2");
        assert_eq!(store.get(Table::Sequences, "s").unwrap()["name"], "v2");
    }

    #[test]
    fn test_update_and_delete_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update(Table::Sequences, "x", json!({})).unwrap_err(),
            NectarError::NotFound { .. }
        ));
        assert!(matches!(
            store.delete(Table::Sequences, "x").unwrap_err(),
            NectarError::NotFound { .. }
        ));
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        store.insert(Table::Campaigns, json!({"id": "c"})).unwrap();
        store.delete(Table::Campaigns, "c").unwrap();
        assert!(store.get(Table::Campaigns, "c").is_none());
    }
}
