//! Seed orchestrator.
//!
//! Runs the selected stages strictly in dependency order. A failing stage is
//! recorded and the run moves on; later stages that depend on it fail on
//! their own missing-parent check. The only hard stop is the store
//! precondition, checked once before the first stage.
//!
//! Cancellation and the optional timeout are honoured between stages only,
//! never in the middle of a stage's batch write.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{
    floors::seed_floors, rng_from_seed, stages, units::seed_units, SeedOptions, StageKind,
};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::catalog::SeedCatalog;
use crate::error::{SeedError, StageError, StageResult};
use crate::store::Store;

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    fn succeeded(stage: StageKind, record_count: usize) -> Self {
        Self {
            name: stage.name().to_string(),
            success: true,
            record_count: Some(record_count),
            error: None,
        }
    }

    fn failed(stage: StageKind, error: &StageError) -> Self {
        Self {
            name: stage.name().to_string(),
            success: false,
            record_count: None,
            error: Some(error.to_string()),
        }
    }
}

/// Terminal state of a run. There is no aborted state: every stage is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    CompletedFully,
    CompletedPartially,
}

/// Aggregated result of a seed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub overall_success: bool,
    /// "Seeded X/Y tables with Z total records"
    pub summary: String,
    pub stages: Vec<StageReport>,
    pub state: RunState,
    pub success_count: usize,
    pub stage_count: usize,
    pub total_records: usize,
    /// Seed of the pseudo-random source, for reproducing the run
    pub rng_seed: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SeedReport {
    /// Aggregate stage outcomes.
    pub fn from_stages(stages: Vec<StageReport>, rng_seed: u64, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        let stage_count = stages.len();
        let success_count = stages.iter().filter(|s| s.success).count();
        let total_records = stages
            .iter()
            .filter(|s| s.success)
            .filter_map(|s| s.record_count)
            .sum();
        let overall_success = success_count == stage_count;

        Self {
            overall_success,
            summary: format!(
                "Seeded {}/{} tables with {} total records",
                success_count, stage_count, total_records
            ),
            stages,
            state: if overall_success {
                RunState::CompletedFully
            } else {
                RunState::CompletedPartially
            },
            success_count,
            stage_count,
            total_records,
            rng_seed,
            started_at,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

async fn run_stage(
    stage: StageKind,
    store: &dyn Store,
    catalog: &SeedCatalog,
    options: &SeedOptions,
    rng: &mut StdRng,
) -> StageResult<usize> {
    match stage {
        StageKind::Category => stages::seed_categories(store, &catalog.categories).await,
        StageKind::Property => stages::seed_properties(store, &catalog.properties).await,
        StageKind::Zone => stages::seed_zones(store, &catalog.zones).await,
        StageKind::Building => stages::seed_buildings(store, &catalog.buildings).await,
        StageKind::Floor => seed_floors(store, options).await,
        StageKind::Unit => seed_units(store, options, rng).await,
    }
}

/// Run the seed pipeline.
///
/// Returns `Err` only when the store precondition fails, in which case no
/// stage ran. Otherwise the report lists every selected stage.
pub async fn run_seed(
    store: &dyn Store,
    catalog: &SeedCatalog,
    options: &SeedOptions,
    cancel: &CancellationToken,
) -> Result<SeedReport, SeedError> {
    log_info("🔌 Checking store connection...");
    if let Err(e) = store.ping().await {
        log_error(format!("Store unavailable: {}", e));
        return Err(SeedError::Precondition(e));
    }

    let started_at = Utc::now();
    let clock = Instant::now();
    // An unrepresentable deadline means no deadline.
    let deadline = options
        .timeout_secs
        .and_then(|s| clock.checked_add(Duration::from_secs(s)));
    let rng_seed = options.effective_seed();
    let mut rng = rng_from_seed(rng_seed);
    log_info(format!("🎲 Random seed: {}", rng_seed));

    let mut reports = Vec::new();
    for stage in StageKind::ALL.into_iter().filter(|s| options.includes(*s)) {
        let expired = deadline.is_some_and(|d| Instant::now() >= d);
        if cancel.is_cancelled() || expired {
            log_warning(format!("{}: cancelled before start", stage.name()));
            reports.push(StageReport::failed(stage, &StageError::Cancelled));
            continue;
        }

        log_info(format!("▶ Seeding {}...", stage.table()));
        match run_stage(stage, store, catalog, options, &mut rng).await {
            Ok(count) => {
                log_success(format!("{}: {} records", stage.table(), count));
                reports.push(StageReport::succeeded(stage, count));
            }
            Err(e) => {
                log_error(format!("{}: {}", stage.table(), e));
                reports.push(StageReport::failed(stage, &e));
            }
        }
    }

    let report = SeedReport::from_stages(reports, rng_seed, started_at, clock.elapsed());
    if report.overall_success {
        log_success(&report.summary);
    } else {
        log_warning(&report.summary);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::seed::tables;
    use crate::store::MemoryStore;

    fn seeded(seed: u64) -> SeedOptions {
        SeedOptions {
            rng_seed: Some(seed),
            ..SeedOptions::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_completes() {
        let store = MemoryStore::with_estate_constraints();
        let catalog = default_catalog();

        let report = run_seed(&store, &catalog, &seeded(1), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.overall_success);
        assert_eq!(report.state, RunState::CompletedFully);
        assert_eq!(report.stage_count, 6);
        assert_eq!(report.stages[0].name, "category");
        assert_eq!(report.stages[0].record_count, Some(catalog.categories.len()));

        let floors = store.count(tables::FLOORS, None).await.unwrap() as usize;
        assert_eq!(report.stages[4].record_count, Some(floors));
        let expected_total: usize = report.stages.iter().filter_map(|s| s.record_count).sum();
        assert_eq!(report.total_records, expected_total);
        assert_eq!(
            report.summary,
            format!("Seeded 6/6 tables with {} total records", expected_total)
        );
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate() {
        let store = MemoryStore::with_estate_constraints();
        let catalog = default_catalog();
        let cancel = CancellationToken::new();

        let first = run_seed(&store, &catalog, &seeded(5), &cancel).await.unwrap();
        let second = run_seed(&store, &catalog, &seeded(5), &cancel).await.unwrap();

        assert!(second.overall_success);
        assert_eq!(first.total_records, second.total_records);
        assert_eq!(
            store.count(tables::UNITS, None).await.unwrap() as usize,
            first.stages[5].record_count.unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_property_tier_degrades_later_stages() {
        let store = MemoryStore::new();
        let catalog = SeedCatalog {
            properties: vec![],
            ..default_catalog()
        };

        let report = run_seed(&store, &catalog, &seeded(2), &CancellationToken::new())
            .await
            .unwrap();

        let outcome: Vec<(&str, bool)> = report
            .stages
            .iter()
            .map(|s| (s.name.as_str(), s.success))
            .collect();
        assert_eq!(
            outcome,
            vec![
                ("category", true),
                ("property", true),
                ("zone", false),
                ("building", false),
                ("floor", false),
                ("unit", false),
            ]
        );
        assert!(!report.overall_success);
        assert_eq!(report.state, RunState::CompletedPartially);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.stages[2].record_count, None);
        assert!(report.stages[2].error.as_deref().unwrap().contains("properties"));
    }

    #[tokio::test]
    async fn test_zone_alone_on_empty_store() {
        let store = MemoryStore::new();
        let options = SeedOptions {
            stages: Some(vec![StageKind::Category, StageKind::Zone]),
            ..seeded(3)
        };

        let report = run_seed(&store, &default_catalog(), &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.stage_count, 2);
        assert_eq!(report.success_count, 1);
        assert!(report.stages[0].success);
        assert!(!report.stages[1].success);
        assert_eq!(report.summary, "Seeded 1/2 tables with 5 total records");
    }

    #[tokio::test]
    async fn test_empty_stage_selection_runs_all_stages() {
        let store = MemoryStore::with_estate_constraints();
        let options = SeedOptions {
            stages: Some(vec![]),
            ..seeded(10)
        };

        let report = run_seed(&store, &default_catalog(), &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.stage_count, 6);
        assert!(report.overall_success);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = MemoryStore::unavailable();
        let err = run_seed(&store, &default_catalog(), &seeded(4), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_cancelled_run_attempts_nothing() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run_seed(&store, &default_catalog(), &seeded(6), &cancel)
            .await
            .unwrap();

        assert_eq!(report.success_count, 0);
        assert!(report
            .stages
            .iter()
            .all(|s| s.error.as_deref() == Some("cancelled before start")));
        assert_eq!(store.count(tables::CATEGORIES, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_huge_timeout_behaves_like_no_timeout() {
        let store = MemoryStore::with_estate_constraints();
        let options: SeedOptions =
            serde_json::from_str(r#"{ "rngSeed": 8, "timeoutSecs": 18446744073709551615 }"#).unwrap();
        assert_eq!(options.timeout_secs, Some(u64::MAX));

        let report = run_seed(&store, &default_catalog(), &options, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.overall_success);
        assert_eq!(report.success_count, 6);
    }

    #[tokio::test]
    async fn test_zero_timeout_cancels_every_stage() {
        let store = MemoryStore::new();
        let options = SeedOptions {
            timeout_secs: Some(0),
            ..seeded(9)
        };

        let report = run_seed(&store, &default_catalog(), &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.success_count, 0);
        assert_eq!(report.state, RunState::CompletedPartially);
    }

    #[test]
    fn test_report_serializes_in_camel_case() {
        let report = SeedReport::from_stages(
            vec![
                StageReport::succeeded(StageKind::Category, 5),
                StageReport::failed(StageKind::Zone, &StageError::Cancelled),
            ],
            9,
            Utc::now(),
            Duration::from_millis(12),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overallSuccess"], false);
        assert_eq!(json["state"], "completed-partially");
        assert_eq!(json["stages"][0]["recordCount"], 5);
        assert!(json["stages"][1].get("recordCount").is_none());
        assert_eq!(json["stages"][1]["error"], "cancelled before start");
    }
}
