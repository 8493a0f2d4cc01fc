//! Seed catalog: the curated records the fixed-catalog stages upsert.
//!
//! Catalogs are configuration, not code. They load from a JSON file that is
//! validated against `schemas/seed-catalog.json`, and [`default_catalog`]
//! ships the reference dataset used when no file is given. Zones and
//! buildings name their parent by code; the generators resolve those codes
//! to store ids at run time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Category, Property, RecordStatus};
use crate::validation::validate_catalog;

/// A zone whose owning property is referenced by code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSeed {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub property_code: String,
}

/// A building whose owning zone is referenced by code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSeed {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub total_floors: Option<u32>,
    #[serde(default)]
    pub status: RecordStatus,
    pub zone_code: String,
}

/// Curated reference data for one seed dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub categories: Vec<Category>,
    pub properties: Vec<Property>,
    pub zones: Vec<ZoneSeed>,
    #[serde(default)]
    pub buildings: Vec<BuildingSeed>,
}

impl SeedCatalog {
    /// Parse and validate a catalog from JSON text.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validate a JSON value against the catalog schema, then deserialize it.
    pub fn from_value(value: Value) -> CatalogResult<Self> {
        validate_catalog(&value).map_err(CatalogError::Invalid)?;
        let catalog: SeedCatalog = serde_json::from_value(value)?;
        catalog.check_unique_codes()?;
        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn check_unique_codes(&self) -> CatalogResult<()> {
        fn unique<'a>(
            tier: &'static str,
            codes: impl Iterator<Item = &'a String>,
        ) -> CatalogResult<()> {
            let mut seen = HashSet::new();
            for code in codes {
                if !seen.insert(code) {
                    return Err(CatalogError::DuplicateCode {
                        tier,
                        code: code.clone(),
                    });
                }
            }
            Ok(())
        }

        unique("category", self.categories.iter().map(|c| &c.code))?;
        unique("property", self.properties.iter().map(|p| &p.code))?;
        unique("zone", self.zones.iter().map(|z| &z.code))?;
        unique("building", self.buildings.iter().map(|b| &b.code))
    }
}

fn category(name: &str, code: &str, description: &str) -> Category {
    Category {
        name: name.to_string(),
        code: code.to_string(),
        description: description.to_string(),
        status: RecordStatus::Active,
    }
}

#[allow(clippy::too_many_arguments)]
fn property(
    name: &str,
    code: &str,
    description: &str,
    address: &str,
    province: &str,
    district: &str,
    ward: &str,
    total_area: f64,
) -> Property {
    Property {
        name: name.to_string(),
        code: code.to_string(),
        description: description.to_string(),
        address: address.to_string(),
        province: province.to_string(),
        district: district.to_string(),
        ward: ward.to_string(),
        total_area,
        status: RecordStatus::Active,
    }
}

fn zone(name: &str, code: &str, description: &str, property_code: &str) -> ZoneSeed {
    ZoneSeed {
        name: name.to_string(),
        code: code.to_string(),
        description: description.to_string(),
        status: RecordStatus::Active,
        property_code: property_code.to_string(),
    }
}

fn building(name: &str, code: &str, total_floors: Option<u32>, zone_code: &str) -> BuildingSeed {
    BuildingSeed {
        name: name.to_string(),
        code: code.to_string(),
        total_floors,
        status: RecordStatus::Active,
        zone_code: zone_code.to_string(),
    }
}

/// The reference dataset: three developments in Ha Noi and Ho Chi Minh City.
pub fn default_catalog() -> SeedCatalog {
    SeedCatalog {
        categories: vec![
            category("Apartment", "APARTMENT", "High-rise residential apartment"),
            category("Villa", "VILLA", "Detached or semi-detached villa"),
            category("Shophouse", "SHOPHOUSE", "Ground-floor retail with living space above"),
            category("Office", "OFFICE", "Commercial office space"),
            category("Penthouse", "PENTHOUSE", "Top-floor luxury apartment"),
        ],
        properties: vec![
            property(
                "Vinhomes Grand Park",
                "VGP",
                "Large-scale township in the east of Ho Chi Minh City",
                "Nguyen Xien, Long Thanh My",
                "Ho Chi Minh",
                "Thu Duc",
                "Long Thanh My",
                2_710_000.0,
            ),
            property(
                "Vinhomes Central Park",
                "VCP",
                "Riverside towers along the Saigon River",
                "208 Nguyen Huu Canh",
                "Ho Chi Minh",
                "Binh Thanh",
                "Ward 22",
                438_000.0,
            ),
            property(
                "Vinhomes Ocean Park",
                "VOP",
                "Lakeside township east of Ha Noi",
                "Da Ton, Gia Lam",
                "Ha Noi",
                "Gia Lam",
                "Da Ton",
                4_200_000.0,
            ),
        ],
        zones: vec![
            zone("The Rainbow", "VGP_RAINBOW", "Rainbow subdivision, towers S1-S5", "VGP"),
            zone("The Origami", "VGP_ORIGAMI", "Origami subdivision, towers S6-S10", "VGP"),
            zone("Landmark", "VCP_LANDMARK", "Landmark towers by the river", "VCP"),
            zone("Park", "VCP_PARK", "Park towers", "VCP"),
            zone("Sapphire", "VOP_SAPPHIRE", "Sapphire subdivision", "VOP"),
        ],
        buildings: vec![
            building("S1.01", "VGP_S101", Some(25), "VGP_RAINBOW"),
            building("S1.02", "VGP_S102", Some(18), "VGP_RAINBOW"),
            building("S6.01", "VGP_S601", Some(20), "VGP_ORIGAMI"),
            building("Landmark 81", "VCP_L81", Some(81), "VCP_LANDMARK"),
            building("Park 1", "VCP_P1", Some(21), "VCP_PARK"),
            building("Sapphire 1", "VOP_S1", None, "VOP_SAPPHIRE"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_passes_its_own_validation() {
        let catalog = default_catalog();
        let json = catalog.to_json().unwrap();

        let reloaded = SeedCatalog::from_json(&json).unwrap();
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn test_default_catalog_parents_resolve() {
        let catalog = default_catalog();
        let properties: HashSet<_> = catalog.properties.iter().map(|p| p.code.as_str()).collect();
        let zones: HashSet<_> = catalog.zones.iter().map(|z| z.code.as_str()).collect();

        assert!(catalog.zones.iter().all(|z| properties.contains(z.property_code.as_str())));
        assert!(catalog.buildings.iter().all(|b| zones.contains(b.zone_code.as_str())));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let json = r#"{
            "categories": [
                { "name": "Apartment", "code": "APT" },
                { "name": "Apartment again", "code": "APT" }
            ],
            "properties": [],
            "zones": []
        }"#;

        let err = SeedCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode { tier: "category", .. }));
    }

    #[test]
    fn test_schema_errors_reported() {
        let err = SeedCatalog::from_json(r#"{ "categories": [] }"#).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(ref errors) if !errors.is_empty()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "categories": [{ "name": "Office", "code": "OFFICE" }],
                "properties": [],
                "zones": []
            }"#,
        )
        .unwrap();

        let catalog = SeedCatalog::load(&path).unwrap();
        assert_eq!(catalog.categories[0].status, RecordStatus::Active);
        assert!(catalog.buildings.is_empty());
    }
}
