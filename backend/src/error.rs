//! Error types for the estate seed pipeline.
//!
//! One error enum per layer:
//!
//! - [`ParseError`] - Byte decoding errors (the tabular parser itself never fails)
//! - [`StoreError`] - Store adapter errors
//! - [`CatalogError`] - Seed catalog loading and validation errors
//! - [`StageError`] - Failures local to a single seed stage
//! - [`SeedError`] - Fatal errors that stop a run before any stage starts
//! - [`ReconcileError`] - Reconciliation check errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors while turning raw bytes into text for the parser.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes could not be decoded.
    #[error("Failed to decode content: {0}")]
    Encoding(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store connection settings are missing.
    #[error("Store is not configured: {0}")]
    Unconfigured(String),

    /// Transport-level failure.
    #[error("Store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("Store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A plain insert collided with a unique constraint.
    #[error("Unique constraint violated on '{table}' for key {key}")]
    Conflict { table: String, key: String },

    /// The response body was not what the adapter expected.
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),

    /// JSON serialization error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Errors while loading a seed catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog is not valid JSON or does not match the model.
    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog failed schema validation.
    #[error("Catalog failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// The same code appears twice within one tier.
    #[error("Duplicate {tier} code in catalog: {code}")]
    DuplicateCode { tier: &'static str, code: String },
}

// =============================================================================
// Stage Errors
// =============================================================================

/// A failure confined to one stage. Recorded in the report, never fatal to the run.
#[derive(Debug, Error)]
pub enum StageError {
    /// The parent tier has no persisted rows.
    #[error("No {parent} found; seed {parent} before {stage}")]
    MissingParent {
        stage: &'static str,
        parent: &'static str,
    },

    /// Store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run was cancelled or hit its deadline before this stage started.
    #[error("cancelled before start")]
    Cancelled,
}

// =============================================================================
// Seed Errors (top-level)
// =============================================================================

/// Fatal seed-run errors. When one of these is returned no stage was attempted.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The store is unavailable or unconfigured.
    #[error("Store precondition failed: {0}")]
    Precondition(StoreError),

    /// The catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

// =============================================================================
// Reconciliation Errors
// =============================================================================

/// Errors from the reconciliation check.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading canonical codes failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] ParseError),

    /// Input contained no rows at all.
    #[error("Reference file is empty")]
    EmptyInput,

    /// The requested column is not present in the header row.
    #[error("Column {column} out of range (header has {width} columns)")]
    ColumnOutOfRange { column: usize, width: usize },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Seed run could not start.
    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    /// Reconciliation failed.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for a single stage.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
