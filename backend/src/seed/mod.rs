//! Seed pipeline.
//!
//! Six stages run in a fixed dependency order, each reading its parent tier
//! back from the store before writing its own:
//!
//! ```text
//! category → property → zone → building → floor → unit
//!   (catalog)  (catalog)  (catalog)  (catalog)  (sampled)  (random)
//! ```
//!
//! - `stages`: fixed-catalog generators (category, property, zone, building)
//! - `floors`: floor plans with high-rise sampling
//! - `units`: unit synthesis with deterministic codes
//! - `orchestrator`: runs the stages and aggregates the report

pub mod floors;
pub mod orchestrator;
pub mod stages;
pub mod units;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub use floors::{floor_plan, seed_floors, PlannedFloor};
pub use orchestrator::{run_seed, RunState, SeedReport, StageReport};
pub use stages::{seed_buildings, seed_categories, seed_properties, seed_zones};
pub use units::{seed_units, unit_code, UnitShape, UNIT_SHAPES};

/// Store table names, one per tier
pub mod tables {
    pub const CATEGORIES: &str = "categories";
    pub const PROPERTIES: &str = "properties";
    pub const ZONES: &str = "zones";
    pub const BUILDINGS: &str = "buildings";
    pub const FLOORS: &str = "floors";
    pub const UNITS: &str = "units";
}

/// One stage of the pipeline, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Category,
    Property,
    Zone,
    Building,
    Floor,
    Unit,
}

impl StageKind {
    /// Every stage, in dependency order
    pub const ALL: [StageKind; 6] = [
        StageKind::Category,
        StageKind::Property,
        StageKind::Zone,
        StageKind::Building,
        StageKind::Floor,
        StageKind::Unit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Category => "category",
            StageKind::Property => "property",
            StageKind::Zone => "zone",
            StageKind::Building => "building",
            StageKind::Floor => "floor",
            StageKind::Unit => "unit",
        }
    }

    /// Table the stage writes to
    pub fn table(self) -> &'static str {
        match self {
            StageKind::Category => tables::CATEGORIES,
            StageKind::Property => tables::PROPERTIES,
            StageKind::Zone => tables::ZONES,
            StageKind::Building => tables::BUILDINGS,
            StageKind::Floor => tables::FLOORS,
            StageKind::Unit => tables::UNITS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name() == name || s.table() == name)
    }
}

/// How the floor stage writes its batch.
///
/// Floors have no natural code. `Upsert` keys them on
/// `(building_id, floor_number)` so a re-run updates in place. `Insert` sends a
/// plain insert and leaves duplicate handling to the store's own constraint:
/// a re-run then fails the floor stage if such a constraint exists, or
/// duplicates floors if it does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorConflictPolicy {
    #[default]
    Upsert,
    Insert,
}

/// Tunables for a seed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedOptions {
    /// Seed for the pseudo-random source; `None` derives one from the clock
    pub rng_seed: Option<u64>,

    /// Floor write mode
    pub floor_conflict: FloorConflictPolicy,

    /// Height used for buildings with no `total_floors`
    pub default_total_floors: u32,

    /// Buildings taller than this get sampled floors
    pub high_rise_threshold: u32,

    /// Floor cadence kept for sampled buildings
    pub high_rise_step: u32,

    /// Maximum floors considered by the unit stage
    pub unit_floor_cap: usize,

    /// Inclusive range of units drawn per floor
    pub min_units_per_floor: u32,
    pub max_units_per_floor: u32,

    /// Probability that a generated unit is occupied
    pub occupancy_rate: f64,

    /// Run only these stages (still in dependency order); `None` or an empty list runs all
    pub stages: Option<Vec<StageKind>>,

    /// Abort between stages once this many seconds have elapsed
    pub timeout_secs: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            rng_seed: None,
            floor_conflict: FloorConflictPolicy::Upsert,
            default_total_floors: 10,
            high_rise_threshold: 20,
            high_rise_step: 5,
            unit_floor_cap: 30,
            min_units_per_floor: 2,
            max_units_per_floor: 4,
            occupancy_rate: 0.7,
            stages: None,
            timeout_secs: None,
        }
    }
}

impl SeedOptions {
    /// Seed actually used for this run
    pub fn effective_seed(&self) -> u64 {
        self.rng_seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        })
    }

    /// Is `stage` part of this run?
    pub fn includes(&self, stage: StageKind) -> bool {
        self.stages
            .as_ref()
            .filter(|selected| !selected.is_empty())
            .map_or(true, |selected| selected.contains(&stage))
    }
}

/// Seedable random source for a run
pub fn rng_from_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
