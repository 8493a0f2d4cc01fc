//! Unit synthesis.
//!
//! Units are placed on a bounded slice of non-ground floors. Per floor the
//! generator draws a unit count, then per unit a shape, an occupancy and,
//! for occupied units, a resident. Unit codes depend only on the building
//! code, floor number and unit index, so a re-run upserts the same logical
//! units; the drawn fields may change unless the run is seeded.
//!
//! Location fields are copied from the owning property at generation time.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;

use super::{tables, SeedOptions};
use crate::api::logs::log_info_indent;
use crate::error::{StageError, StageResult};
use crate::models::{record_id, to_record, ResidentRole, Unit, UnitStatus};
use crate::store::{ConflictKey, Filter, Record, Store};

/// Bedroom/bathroom/area triple a unit can take
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitShape {
    pub bedrooms: u8,
    pub bathrooms: u8,
    /// Square metres
    pub area: f64,
}

/// The four unit layouts drawn from.
pub const UNIT_SHAPES: [UnitShape; 4] = [
    UnitShape { bedrooms: 1, bathrooms: 1, area: 45.0 },
    UnitShape { bedrooms: 2, bathrooms: 1, area: 62.5 },
    UnitShape { bedrooms: 2, bathrooms: 2, area: 75.0 },
    UnitShape { bedrooms: 3, bathrooms: 2, area: 98.0 },
];

/// `{building}_{floor:02}{unit:02}`, e.g. `VGP_0302`.
pub fn unit_code(building_code: &str, floor_number: u32, unit_index: u32) -> String {
    format!("{}_{:02}{:02}", building_code, floor_number, unit_index)
}

#[derive(Debug, Clone, Default)]
struct Location {
    address: String,
    province: String,
    district: String,
    ward: String,
}

fn text(record: &Record, column: &str) -> String {
    record
        .get(column)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn index_by_id(rows: Vec<Record>) -> HashMap<String, Record> {
    rows.into_iter()
        .filter_map(|row| Some((record_id(&row)?, row)))
        .collect()
}

/// Resolve each building id to its code and the location of its property.
async fn building_locations(store: &dyn Store) -> StageResult<HashMap<String, (String, Location)>> {
    let buildings = store
        .select_all(tables::BUILDINGS, &["id", "code", "zone_id"], None)
        .await?;
    let zones = index_by_id(
        store
            .select_all(tables::ZONES, &["id", "property_id"], None)
            .await?,
    );
    let properties = index_by_id(
        store
            .select_all(
                tables::PROPERTIES,
                &["id", "address", "province", "district", "ward"],
                None,
            )
            .await?,
    );

    Ok(buildings
        .into_iter()
        .filter_map(|building| {
            let id = record_id(&building)?;
            let property = zones
                .get(&text(&building, "zone_id"))
                .and_then(|zone| properties.get(&text(zone, "property_id")));
            let location = property
                .map(|p| Location {
                    address: text(p, "address"),
                    province: text(p, "province"),
                    district: text(p, "district"),
                    ward: text(p, "ward"),
                })
                .unwrap_or_default();
            Some((id, (text(&building, "code"), location)))
        })
        .collect())
}

/// Generate units for up to `unit_floor_cap` non-ground floors.
pub async fn seed_units(store: &dyn Store, options: &SeedOptions, rng: &mut StdRng) -> StageResult<usize> {
    let filter = Filter::new()
        .gt("floor_number", 1)
        .order_by("id")
        .limit(options.unit_floor_cap);
    let floors = store
        .select_all(tables::FLOORS, &["id", "building_id", "floor_number"], Some(&filter))
        .await?;
    if floors.is_empty() {
        return Err(StageError::MissingParent {
            stage: tables::UNITS,
            parent: tables::FLOORS,
        });
    }

    let locations = building_locations(store).await?;
    let (min_units, max_units) = (
        options.min_units_per_floor,
        options.max_units_per_floor.max(options.min_units_per_floor),
    );
    let occupancy = options.occupancy_rate.clamp(0.0, 1.0);

    let mut records = Vec::new();
    let mut orphaned = 0;
    let mut unnumbered = 0;
    for floor in &floors {
        let (Some(floor_id), Some((building_code, location))) =
            (record_id(floor), locations.get(&text(floor, "building_id")))
        else {
            orphaned += 1;
            continue;
        };
        let Some(floor_number) = floor
            .get("floor_number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
        else {
            unnumbered += 1;
            continue;
        };

        let count = rng.gen_range(min_units..=max_units);
        for index in 1..=count {
            let shape = UNIT_SHAPES[rng.gen_range(0..UNIT_SHAPES.len())];
            let occupied = rng.gen_bool(occupancy);
            let (resident_id, resident_role) = if occupied {
                let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
                let role = if rng.gen_bool(0.5) {
                    ResidentRole::Owner
                } else {
                    ResidentRole::Tenant
                };
                (Some(id.to_string()), Some(role))
            } else {
                (None, None)
            };

            let code = unit_code(building_code, floor_number, index);
            let unit = Unit {
                floor_id: floor_id.clone(),
                name: format!("Apartment {}", &code[building_code.len() + 1..]),
                address: location.address.clone(),
                province: location.province.clone(),
                district: location.district.clone(),
                ward: location.ward.clone(),
                area: shape.area,
                bedrooms: shape.bedrooms,
                bathrooms: shape.bathrooms,
                resident_id,
                resident_role,
                status: if occupied {
                    UnitStatus::Occupied
                } else {
                    UnitStatus::Available
                },
                code,
            };
            records.push(to_record(&unit)?);
        }
    }

    if orphaned > 0 {
        log_info_indent(format!("{} floor(s) skipped: building not found", orphaned), 1);
    }
    if unnumbered > 0 {
        log_info_indent(format!("{} floor(s) skipped: floor number out of range", unnumbered), 1);
    }

    let stored = store
        .upsert(tables::UNITS, records, Some(&ConflictKey::single("code")))
        .await?;
    Ok(stored.len())
}
