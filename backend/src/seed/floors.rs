//! Floor generation with high-rise sampling.
//!
//! Buildings up to the threshold get every floor. Taller buildings keep only
//! floor 1, the top floor and every `step`-th floor, which bounds the number
//! of floor rows per tower while keeping first/last coverage.

use serde_json::Value;

use super::{tables, FloorConflictPolicy, SeedOptions};
use crate::api::logs::log_info_indent;
use crate::error::{StageError, StageResult};
use crate::models::{record_id, to_record, Floor, RecordStatus};
use crate::store::{ConflictKey, Store};

/// Units planned on every floor except the ground floor
pub const UNITS_PER_LEVEL: u32 = 8;

/// One planned floor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFloor {
    pub number: u32,
    pub name: String,
    pub total_units: u32,
}

/// Floor numbers kept for a building of `total_floors` storeys.
pub fn sampled_floor_numbers(total_floors: u32, threshold: u32, step: u32) -> Vec<u32> {
    if total_floors <= threshold {
        return (1..=total_floors).collect();
    }
    (1..=total_floors)
        .filter(|&n| n == 1 || n == total_floors || (step > 0 && n % step == 0))
        .collect()
}

/// Planned floors for a building, labelled.
pub fn floor_plan(total_floors: u32, threshold: u32, step: u32) -> Vec<PlannedFloor> {
    sampled_floor_numbers(total_floors, threshold, step)
        .into_iter()
        .map(|number| {
            let (name, total_units) = if number == 1 {
                ("Ground floor".to_string(), 0)
            } else if number == total_floors {
                ("Top floor".to_string(), UNITS_PER_LEVEL)
            } else {
                (format!("Level {}", number), UNITS_PER_LEVEL)
            };
            PlannedFloor {
                number,
                name,
                total_units,
            }
        })
        .collect()
}

/// Generate floors for every persisted building.
pub async fn seed_floors(store: &dyn Store, options: &SeedOptions) -> StageResult<usize> {
    let buildings = store
        .select_all(tables::BUILDINGS, &["id", "code", "total_floors"], None)
        .await?;
    if buildings.is_empty() {
        return Err(StageError::MissingParent {
            stage: tables::FLOORS,
            parent: tables::BUILDINGS,
        });
    }

    let mut records = Vec::new();
    for building in &buildings {
        let Some(building_id) = record_id(building) else {
            continue;
        };
        let code = building.get("code").and_then(Value::as_str).unwrap_or_default();
        let total_floors = building
            .get("total_floors")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(options.default_total_floors);

        let plan = floor_plan(total_floors, options.high_rise_threshold, options.high_rise_step);
        if total_floors > options.high_rise_threshold {
            log_info_indent(
                format!("{}: high-rise, {} of {} floors sampled", code, plan.len(), total_floors),
                1,
            );
        }

        for planned in plan {
            let floor = Floor {
                building_id: building_id.clone(),
                description: format!("{} of building {}", planned.name, code),
                name: planned.name,
                floor_number: planned.number,
                total_units: planned.total_units,
                status: RecordStatus::Active,
            };
            records.push(to_record(&floor)?);
        }
    }

    let conflict_key = match options.floor_conflict {
        FloorConflictPolicy::Upsert => Some(ConflictKey::composite(&["building_id", "floor_number"])),
        FloorConflictPolicy::Insert => None,
    };
    let stored = store
        .upsert(tables::FLOORS, records, conflict_key.as_ref())
        .await?;
    Ok(stored.len())
}
