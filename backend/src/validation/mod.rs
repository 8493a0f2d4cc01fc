//! JSON Schema validation for seed catalogs.
//!
//! Catalog files are checked against an embedded Draft 7 schema
//! (`schemas/seed-catalog.json`) before they are deserialized, so a bad file
//! is reported with every offending path at once instead of the first serde
//! error.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use estate_seed::validation::validate_catalog;
//!
//! let catalog = json!({ "categories": [], "properties": [], "zones": [] });
//! assert!(validate_catalog(&catalog).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static CATALOG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/seed-catalog.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate against the embedded seed-catalog schema.
pub fn validate_catalog(data: &Value) -> Result<(), Vec<String>> {
    validate(&CATALOG_SCHEMA, data)
}
