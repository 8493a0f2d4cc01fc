//! Fixed-catalog stages: categories, properties, zones and buildings.
//!
//! Each upserts its catalog slice on the unique `code`, so running a stage
//! twice leaves the same rows behind. Zones and buildings resolve their
//! parent code to a store id first; records whose parent is not in the store
//! are left out of the batch.

use serde_json::Value;
use std::collections::HashMap;

use super::tables;
use crate::api::logs::log_info_indent;
use crate::catalog::{BuildingSeed, ZoneSeed};
use crate::error::{StageError, StageResult, StoreResult};
use crate::models::{record_id, to_record, Building, Category, Property, Zone};
use crate::store::{ConflictKey, Record, Store};

/// Map each stored row's `code` to its `id`.
pub(crate) fn code_to_id(rows: &[Record]) -> HashMap<String, String> {
    rows.iter()
        .filter_map(|row| {
            let code = row.get("code").and_then(Value::as_str)?;
            Some((code.to_string(), record_id(row)?))
        })
        .collect()
}

async fn upsert_by_code(store: &dyn Store, table: &str, records: Vec<Record>) -> StageResult<usize> {
    let stored = store
        .upsert(table, records, Some(&ConflictKey::single("code")))
        .await?;
    Ok(stored.len())
}

/// Upsert every catalog category.
pub async fn seed_categories(store: &dyn Store, categories: &[Category]) -> StageResult<usize> {
    let records = categories.iter().map(to_record).collect::<StoreResult<Vec<_>>>()?;
    upsert_by_code(store, tables::CATEGORIES, records).await
}

/// Upsert every catalog property.
pub async fn seed_properties(store: &dyn Store, properties: &[Property]) -> StageResult<usize> {
    let records = properties.iter().map(to_record).collect::<StoreResult<Vec<_>>>()?;
    upsert_by_code(store, tables::PROPERTIES, records).await
}

/// Upsert catalog zones under their persisted properties.
pub async fn seed_zones(store: &dyn Store, zones: &[ZoneSeed]) -> StageResult<usize> {
    let properties = store
        .select_all(tables::PROPERTIES, &["id", "code"], None)
        .await?;
    if properties.is_empty() {
        return Err(StageError::MissingParent {
            stage: tables::ZONES,
            parent: tables::PROPERTIES,
        });
    }

    let property_ids = code_to_id(&properties);
    let records = zones
        .iter()
        .filter_map(|seed| {
            let property_id = property_ids.get(&seed.property_code)?;
            Some(Zone {
                name: seed.name.clone(),
                code: seed.code.clone(),
                description: seed.description.clone(),
                status: seed.status,
                property_id: property_id.clone(),
            })
        })
        .map(|zone| to_record(&zone))
        .collect::<StoreResult<Vec<_>>>()?;

    let omitted = zones.len() - records.len();
    if omitted > 0 {
        log_info_indent(format!("{} zone(s) left out: parent property not seeded", omitted), 1);
    }

    upsert_by_code(store, tables::ZONES, records).await
}

/// Upsert catalog buildings under their persisted zones.
pub async fn seed_buildings(store: &dyn Store, buildings: &[BuildingSeed]) -> StageResult<usize> {
    let zones = store.select_all(tables::ZONES, &["id", "code"], None).await?;
    if zones.is_empty() {
        return Err(StageError::MissingParent {
            stage: tables::BUILDINGS,
            parent: tables::ZONES,
        });
    }

    let zone_ids = code_to_id(&zones);
    let records = buildings
        .iter()
        .filter_map(|seed| {
            let zone_id = zone_ids.get(&seed.zone_code)?;
            Some(Building {
                name: seed.name.clone(),
                code: seed.code.clone(),
                total_floors: seed.total_floors,
                status: seed.status,
                zone_id: zone_id.clone(),
            })
        })
        .map(|building| to_record(&building))
        .collect::<StoreResult<Vec<_>>>()?;

    let omitted = buildings.len() - records.len();
    if omitted > 0 {
        log_info_indent(format!("{} building(s) left out: parent zone not seeded", omitted), 1);
    }

    upsert_by_code(store, tables::BUILDINGS, records).await
}
