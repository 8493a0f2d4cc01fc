//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::reconcile::ReconciliationReport;
use crate::seed::{SeedOptions, SeedReport};

/// Body of `POST /api/seed`. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedRequest {
    /// Run tunables
    pub options: SeedOptions,
    /// Inline catalog (validated like a catalog file); built-in dataset when absent
    pub catalog: Option<Value>,
}

/// Response of `POST /api/seed`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub job_id: String,
    /// "completed" or "partial"
    pub status: String,
    #[serde(flatten)]
    pub report: SeedReport,
}

impl From<SeedReport> for SeedResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: if report.overall_success { "completed" } else { "partial" }.to_string(),
            report,
        }
    }
}

/// Response of `POST /api/reconcile`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub job_id: String,
    /// "matched" or "mismatched"
    pub status: String,
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub report: ReconciliationReport,
}

impl ReconcileResponse {
    pub fn new(report: ReconciliationReport, file_name: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: if report.is_fully_matched() { "matched" } else { "mismatched" }.to_string(),
            file_name,
            report,
        }
    }
}

/// Error body shared by every endpoint
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::parser::parse;

    #[test]
    fn test_seed_request_defaults() {
        let request: SeedRequest = serde_json::from_str("{}").unwrap();
        assert!(request.catalog.is_none());
        assert_eq!(request.options, SeedOptions::default());

        let request: SeedRequest =
            serde_json::from_str(r#"{ "options": { "rngSeed": 3 } }"#).unwrap();
        assert_eq!(request.options.rng_seed, Some(3));
    }

    #[test]
    fn test_reconcile_response_flattens_report() {
        let report = reconcile(&parse("code,p\n1,11\n"), 1, ["11"], 1);
        let json = serde_json::to_value(ReconcileResponse::new(report, Some("wards.csv".into()))).unwrap();

        assert_eq!(json["status"], "matched");
        assert_eq!(json["fileName"], "wards.csv");
        assert_eq!(json["matchingCodes"][0], "11");
        assert_eq!(json["totalDataRows"], 1);
    }

    #[test]
    fn test_error_response_shape() {
        let json = error_response("boom");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
    }
}
