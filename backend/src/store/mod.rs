//! Store adapter: the narrow contract the pipeline uses to reach the backing store.
//!
//! Three calls are enough for every stage: select rows by filter, upsert a
//! batch on a conflict key, and count. Implementations:
//!
//! - [`MemoryStore`] - in-process tables, used by tests and dry runs
//! - [`RestStore`] - PostgREST-style HTTP endpoint of the managed database
//!
//! The store handle is always passed explicitly; there is no global client.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreResult;

pub use memory::MemoryStore;
pub use rest::{RestConfig, RestStore};

/// A persisted or to-be-persisted row.
pub type Record = Map<String, Value>;

/// Comparison operator for a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// PostgREST operator token
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        }
    }
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Conjunction of conditions plus optional ordering and row cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub order_by: Option<String>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, column: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Neq, value)
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Lte, value)
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Does a row satisfy every condition?
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| {
            let actual = record.get(&c.column).unwrap_or(&Value::Null);
            let ord = compare_values(actual, &c.value);
            match c.op {
                FilterOp::Eq => values_equal(actual, &c.value),
                FilterOp::Neq => !values_equal(actual, &c.value),
                FilterOp::Gt => ord.is_some_and(|o| o.is_gt()),
                FilterOp::Gte => ord.is_some_and(|o| o.is_ge()),
                FilterOp::Lt => ord.is_some_and(|o| o.is_lt()),
                FilterOp::Lte => ord.is_some_and(|o| o.is_le()),
            }
        })
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Orders numbers numerically and strings lexically; anything else is incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Columns that identify a row for insert-or-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictKey(pub Vec<String>);

impl ConflictKey {
    pub fn single(column: &str) -> Self {
        Self(vec![column.to_string()])
    }

    pub fn composite(columns: &[&str]) -> Self {
        Self(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined, as PostgREST expects for `on_conflict`
    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    /// Key values of a record, rendered for diagnostics and indexing.
    /// `None` when a key column is missing or null.
    pub fn key_of(&self, record: &Record) -> Option<String> {
        key_of(&self.0, record)
    }
}

pub(crate) fn key_of(columns: &[String], record: &Record) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        match record.get(column) {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) => parts.push(s.clone()),
            Some(other) => parts.push(other.to_string()),
        }
    }
    Some(parts.join("|"))
}

/// Narrow read/upsert contract over the backing relational store.
///
/// Every call suspends the calling stage until the store answers. No call retries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the store is configured and reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Select `columns` (empty = all) from `table`, optionally filtered.
    async fn select_all(
        &self,
        table: &str,
        columns: &[&str],
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Record>>;

    /// Insert `records`; with a conflict key, rows whose key already exists are
    /// updated in place instead. Returns the rows as stored.
    async fn upsert(
        &self,
        table: &str,
        records: Vec<Record>,
        conflict_key: Option<&ConflictKey>,
    ) -> StoreResult<Vec<Record>>;

    /// Count rows in `table` matching the filter.
    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_numeric_comparisons() {
        let floor = record(json!({ "floor_number": 3, "name": "Level 3" }));

        assert!(Filter::new().gt("floor_number", 1).matches(&floor));
        assert!(!Filter::new().gt("floor_number", 3).matches(&floor));
        assert!(Filter::new().lte("floor_number", 3).matches(&floor));
        assert!(Filter::new().eq("floor_number", 3.0).matches(&floor));
    }

    #[test]
    fn test_filter_missing_column_never_compares() {
        let row = record(json!({ "code": "A" }));
        assert!(!Filter::new().gt("floor_number", 0).matches(&row));
        assert!(Filter::new().neq("floor_number", 0).matches(&row));
    }

    #[test]
    fn test_conflict_key_rendering() {
        let key = ConflictKey::composite(&["building_id", "floor_number"]);
        let row = record(json!({ "building_id": "b-1", "floor_number": 5 }));

        assert_eq!(key.joined(), "building_id,floor_number");
        assert_eq!(key.key_of(&row).as_deref(), Some("b-1|5"));
        assert_eq!(key.key_of(&record(json!({ "building_id": "b-1" }))), None);
    }
}
