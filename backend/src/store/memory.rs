//! In-process store with unique-key semantics close to the real database.
//!
//! Tables are created on first write. New rows get a UUID `id`. Upserts with
//! a conflict key merge non-key fields into the matching row; plain inserts
//! that collide with a declared unique constraint fail with
//! [`StoreError::Conflict`]. A batch is applied whole or not at all.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{compare_values, key_of, ConflictKey, Filter, Record, Store};
use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct Table {
    rows: Vec<Record>,
}

/// In-memory implementation of [`Store`]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    unique: HashMap<String, Vec<Vec<String>>>,
    available: bool,
}

impl MemoryStore {
    /// Empty store with no unique constraints
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            unique: HashMap::new(),
            available: true,
        }
    }

    /// Store with the unique constraints of the estate schema declared
    pub fn with_estate_constraints() -> Self {
        Self::new()
            .with_unique("categories", &["code"])
            .with_unique("properties", &["code"])
            .with_unique("zones", &["code"])
            .with_unique("buildings", &["code"])
            .with_unique("floors", &["building_id", "floor_number"])
            .with_unique("units", &["code"])
    }

    /// A store that fails every call as unconfigured
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Declare a unique constraint over `columns` of `table`
    pub fn with_unique(mut self, table: &str, columns: &[&str]) -> Self {
        self.unique
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Insert rows directly, bypassing constraints. Test fixture helper.
    pub async fn insert_raw(&self, table: &str, records: Vec<Record>) -> Vec<Record> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table.to_string()).or_default();
        let mut stored = Vec::with_capacity(records.len());
        for mut record in records {
            record
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            table.rows.push(record.clone());
            stored.push(record);
        }
        stored
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unconfigured("memory store marked unavailable".into()))
        }
    }

    fn violated_constraint(&self, table_name: &str, rows: &[Record], record: &Record) -> Option<String> {
        let constraints = self.unique.get(table_name)?;
        constraints.iter().find_map(|columns| {
            let key = key_of(columns, record)?;
            rows.iter()
                .any(|row| key_of(columns, row).as_deref() == Some(key.as_str()))
                .then_some(key)
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn project(record: &Record, columns: &[&str]) -> Record {
    if columns.is_empty() {
        return record.clone();
    }
    columns
        .iter()
        .map(|c| (c.to_string(), record.get(*c).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }

    async fn select_all(
        &self,
        table: &str,
        columns: &[&str],
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Record> = table
            .rows
            .iter()
            .filter(|row| filter.map_or(true, |f| f.matches(row)))
            .collect();

        if let Some(column) = filter.and_then(|f| f.order_by.as_deref()) {
            rows.sort_by(|a, b| {
                let (x, y) = (
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let limit = filter.and_then(|f| f.limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().take(limit).map(|r| project(r, columns)).collect())
    }

    async fn upsert(
        &self,
        table_name: &str,
        records: Vec<Record>,
        conflict_key: Option<&ConflictKey>,
    ) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        // Stage the batch on a copy so a failing record leaves the table untouched.
        let mut rows = tables
            .get(table_name)
            .map(|t| t.rows.clone())
            .unwrap_or_default();
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let existing = conflict_key.and_then(|key| {
                let wanted = key.key_of(&record)?;
                rows.iter()
                    .position(|row| key.key_of(row).as_deref() == Some(wanted.as_str()))
            });

            match existing {
                Some(index) => {
                    let row = &mut rows[index];
                    for (column, value) in record {
                        if column != "id" {
                            row.insert(column, value);
                        }
                    }
                    stored.push(row.clone());
                }
                None => {
                    if let Some(key) = self.violated_constraint(table_name, &rows, &record) {
                        return Err(StoreError::Conflict {
                            table: table_name.to_string(),
                            key,
                        });
                    }
                    let mut row = record;
                    row.entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                    rows.push(row.clone());
                    stored.push(row);
                }
            }
        }

        tables.entry(table_name.to_string()).or_default().rows = rows;
        Ok(stored)
    }

    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let count = tables.get(table).map_or(0, |t| {
            t.rows
                .iter()
                .filter(|row| filter.map_or(true, |f| f.matches(row)))
                .count()
        });
        Ok(count as u64)
    }
}
