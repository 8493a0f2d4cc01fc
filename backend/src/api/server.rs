//! HTTP server for the seed pipeline.
//!
//! # API Endpoints
//!
//! | Method | Path             | Description                                   |
//! |--------|------------------|-----------------------------------------------|
//! | GET    | `/health`        | Health check                                  |
//! | POST   | `/api/seed`      | Run the seed pipeline (JSON options/catalog)  |
//! | POST   | `/api/reconcile` | Upload a reference CSV and reconcile it       |
//! | GET    | `/api/logs`      | SSE stream of pipeline logs                   |
//!
//! The store handle lives in router state and is handed to every run.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, ReconcileResponse, SeedRequest, SeedResponse};
use crate::catalog::{default_catalog, SeedCatalog};
use crate::error::{ReconcileError, SeedError, ServerError, ServerResult};
use crate::reconcile::{reconcile_with_store, ReconcileOptions};
use crate::seed::run_seed;
use crate::store::Store;

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Seed(SeedError::Precondition(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Seed(SeedError::Catalog(_)) => StatusCode::BAD_REQUEST,
            ServerError::Reconcile(ReconcileError::Store(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Reconcile(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router around a store
pub fn router(store: Arc<dyn Store>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/seed", post(seed))
        .route("/api/reconcile", post(reconcile_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState { store })
}

/// Start the HTTP server
pub async fn start_server(port: u16, store: Arc<dyn Store>) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Estate seed server running on http://localhost:{}", port);
    println!("   POST /api/seed      - Run seed pipeline");
    println!("   POST /api/reconcile - Reconcile a reference CSV");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "estate-seed",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "seed": "POST /api/seed",
            "reconcile": "POST /api/reconcile",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// Replays recent history, then follows live entries.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    let history = tokio_stream::iter(LOG_BROADCASTER.recent());
    let live = BroadcastStream::new(rx).filter_map(|result| result.ok());

    let stream = history.chain(live).filter_map(|entry| {
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn seed(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> ServerResult<Json<SeedResponse>> {
    let catalog = match request.catalog {
        Some(value) => SeedCatalog::from_value(value).map_err(SeedError::from)?,
        None => default_catalog(),
    };

    println!("\n{}", "=".repeat(70));
    println!("🌱 SEED RUN");
    println!("{}\n", "=".repeat(70));

    let report = run_seed(
        state.store.as_ref(),
        &catalog,
        &request.options,
        &CancellationToken::new(),
    )
    .await?;

    Ok(Json(SeedResponse::from(report)))
}

async fn reconcile_upload(
    State(state): State<AppState>,
    Query(options): Query<ReconcileOptions>,
    mut multipart: Multipart,
) -> ServerResult<Json<ReconcileResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 RECONCILE: {} ({} bytes) against {}.{}",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        options.canonical_table,
        options.canonical_column
    );
    println!("{}\n", "=".repeat(70));

    let report = reconcile_with_store(state.store.as_ref(), &bytes, &options).await?;
    Ok(Json(ReconcileResponse::new(report, file_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_error_status_mapping() {
        let precondition = ServerError::Seed(SeedError::Precondition(
            crate::error::StoreError::Unconfigured("x".into()),
        ));
        assert_eq!(precondition.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let bad = ServerError::Reconcile(ReconcileError::EmptyInput);
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_seed_handler_runs_against_state_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::with_estate_constraints());
        let state = AppState { store: store.clone() };
        let request: SeedRequest = serde_json::from_str(r#"{ "options": { "rngSeed": 11 } }"#).unwrap();

        let Json(response) = seed(State(state), Json(request)).await.unwrap();

        assert_eq!(response.status, "completed");
        assert_eq!(response.report.stage_count, 6);
        assert!(store.count("units", None).await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_seed_handler_rejects_invalid_catalog() {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
        };
        let request: SeedRequest =
            serde_json::from_str(r#"{ "catalog": { "categories": "nope" } }"#).unwrap();

        let err = seed(State(state), Json(request)).await.unwrap_err();
        assert!(matches!(err, ServerError::Seed(SeedError::Catalog(_))));
    }
}
