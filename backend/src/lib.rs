//! # Estate Seed - seed and reconcile the estate admin store
//!
//! Populates an empty (or partially populated) store with a consistent
//! hierarchy of estate records, and checks external reference files against
//! the codes already persisted before anything gets imported.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│ Orchestrator│────▶│   Stages    │────▶│    Store    │
//! │ (JSON/dflt) │     │  (ordered)  │     │ cat → unit  │     │ (REST/mem)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │ codes
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐            │
//! │  Reference  │────▶│   Parser    │────▶│  Reconcile  │◀───────────┘
//! │  CSV (any)  │     │  (auto-enc) │     │  (report)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use estate_seed::{default_catalog, run_seed, MemoryStore, SeedOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::with_estate_constraints();
//!     let report = run_seed(&store, &default_catalog(), &SeedOptions::default(), &CancellationToken::new())
//!         .await
//!         .unwrap();
//!     println!("{}", report.summary);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Tier records (Category, Property, Zone, Building, Floor, Unit)
//! - [`parser`] - Delimited text parsing with encoding detection
//! - [`store`] - Store adapter trait, in-memory and REST backends
//! - [`catalog`] - Curated seed data
//! - [`validation`] - Catalog schema validation
//! - [`seed`] - Stage generators and the seed orchestrator
//! - [`reconcile`] - Reference file reconciliation
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Persistence
pub mod store;

// Seed data
pub mod catalog;
pub mod validation;

// Pipelines
pub mod reconcile;
pub mod seed;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CatalogError,
    ParseError,
    ReconcileError,
    SeedError,
    ServerError,
    StageError,
    StoreError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Building,
    Category,
    Floor,
    Property,
    RecordStatus,
    ResidentRole,
    Unit,
    UnitStatus,
    Zone,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_encoding,
    parse,
    parse_bytes_auto,
    parse_file_auto,
    ParsedFile,
    ReferenceRow,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{
    ConflictKey,
    Filter,
    FilterOp,
    MemoryStore,
    Record,
    RestConfig,
    RestStore,
    Store,
};

// =============================================================================
// Re-exports - Catalog & Validation
// =============================================================================

pub use catalog::{default_catalog, BuildingSeed, SeedCatalog, ZoneSeed};
pub use validation::validate_catalog;

// =============================================================================
// Re-exports - Seed
// =============================================================================

pub use seed::{
    floor_plan,
    run_seed,
    unit_code,
    FloorConflictPolicy,
    RunState,
    SeedOptions,
    SeedReport,
    StageKind,
    StageReport,
};

// =============================================================================
// Re-exports - Reconcile
// =============================================================================

pub use reconcile::{reconcile, reconcile_with_store, ReconcileOptions, ReconciliationReport};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ReconcileResponse, SeedRequest, SeedResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
