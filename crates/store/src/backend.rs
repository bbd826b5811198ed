use std::fmt;

use leadnectar_core::{NectarError, NectarResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tables the services write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Sequences,
    Campaigns,
    Templates,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Sequences => "sequences",
            Table::Campaigns => "campaigns",
            Table::Templates => "templates",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of `field == value` clauses over top-level record fields.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }
}

/// Record-level access to the backing store. Row-level authorization and
/// sessions are the backend's concern; callers see only these four calls.
///
/// `update` is a shallow merge of `patch` into the stored record with
/// last-writer-wins semantics.
pub trait RecordStore: Send + Sync {
    fn insert(&self, table: Table, record: Value) -> NectarResult<Value>;
    fn update(&self, table: Table, id: &str, patch: Value) -> NectarResult<Value>;
    fn delete(&self, table: Table, id: &str) -> NectarResult<()>;
    fn query(&self, table: Table, filter: &Filter) -> NectarResult<Vec<Value>>;
}

/// Extract the string `id` every record must carry.
pub fn record_id(record: &Value) -> NectarResult<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| NectarError::validation("record has no string `id` field"))
}

/// Shallow merge: top-level keys of `patch` overwrite those of `target`.
pub fn merge_patch(target: &mut Value, patch: Value) -> NectarResult<()> {
    match (target.as_object_mut(), patch) {
        (Some(obj), Value::Object(fields)) => {
            for (key, value) in fields {
                obj.insert(key, value);
            }
            Ok(())
        }
        _ => Err(NectarError::validation("records and patches must be JSON objects")),
    }
}
