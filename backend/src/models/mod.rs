//! Domain models for the estate hierarchy.
//!
//! Tiers, parent first:
//!
//! - [`Category`] - Reference categories (leaf tier, no parent)
//! - [`Property`] - Developments, with free-text location fields
//! - [`Zone`] - Sections of a property
//! - [`Building`] - Buildings within a zone
//! - [`Floor`] - Floors of a building
//! - [`Unit`] - Apartments on a floor, with location copied from the property
//!
//! Models serialize to the column names used by the store, so converting to a
//! [`Record`] is a plain serde conversion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::Record;

// =============================================================================
// Status enums
// =============================================================================

/// Lifecycle status of a reference record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

/// Occupancy of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Occupied,
    Available,
}

/// How the resident of an occupied unit holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentRole {
    Owner,
    Tenant,
}

// =============================================================================
// Tier records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    /// Square metres
    pub total_area: f64,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub property_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    pub code: String,
    /// Unset in older rows; generators fall back to a default height.
    pub total_floors: Option<u32>,
    #[serde(default)]
    pub status: RecordStatus,
    pub zone_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub building_id: String,
    pub name: String,
    pub floor_number: u32,
    pub description: String,
    pub total_units: u32,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub floor_id: String,
    pub name: String,
    pub code: String,
    pub address: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub area: f64,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub resident_id: Option<String>,
    pub resident_role: Option<ResidentRole>,
    pub status: UnitStatus,
}

// =============================================================================
// Record conversion
// =============================================================================

/// Serialize a model into a store record.
pub fn to_record<T: Serialize>(model: &T) -> StoreResult<Record> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidResponse(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// The `id` column of a stored record, as a string.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_record_uses_store_columns() {
        let unit = Unit {
            floor_id: "f-1".into(),
            name: "Apartment 0301".into(),
            code: "VGP_0301".into(),
            address: "Nguyen Xien".into(),
            province: "Ho Chi Minh".into(),
            district: "Thu Duc".into(),
            ward: "Long Thanh My".into(),
            area: 68.5,
            bedrooms: 2,
            bathrooms: 2,
            resident_id: None,
            resident_role: None,
            status: UnitStatus::Available,
        };

        let record = to_record(&unit).unwrap();
        assert_eq!(record["status"], "available");
        assert_eq!(record["resident_id"], Value::Null);
        assert_eq!(record["code"], "VGP_0301");
    }

    #[test]
    fn test_building_row_without_total_floors() {
        let record = json!({
            "name": "S1.01",
            "code": "VGP_S101",
            "total_floors": null,
            "zone_id": "z-1"
        });
        let building: Building = serde_json::from_value(record).unwrap();

        assert_eq!(building.total_floors, None);
        assert_eq!(building.status, RecordStatus::Active);
    }

    #[test]
    fn test_record_id_accepts_numeric_ids() {
        let record = json!({ "id": 42 }).as_object().cloned().unwrap();
        assert_eq!(record_id(&record).as_deref(), Some("42"));
    }
}
