// Quote Sync - Web Server
// REST API with Axum over the shared quote store

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use quote_sync::{
    export_json, import_json, lock_store, logging, open_store, shared, CategoryIndex, Config,
    HttpRemoteSource, Quote, ReconciliationReport, SyncScheduler, TickOutcome, ValidationError,
    ALL_CATEGORIES, EXPORT_FILE_NAME,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    scheduler: SyncScheduler,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

fn validation_error(e: ValidationError) -> Response {
    api_error(StatusCode::BAD_REQUEST, e.to_string())
}

#[derive(Deserialize)]
struct NewQuoteRequest {
    text: String,
    category: String,
}

#[derive(Deserialize)]
struct CategoryQuery {
    category: Option<String>,
}

#[derive(Serialize)]
struct SyncResponse {
    #[serde(flatten)]
    report: ReconciliationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

impl From<ReconciliationReport> for SyncResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            notice: report.notice(),
            report,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// GET /api/quotes - All quotes in insertion order
async fn get_quotes(State(state): State<AppState>) -> impl IntoResponse {
    let quotes = lock_store(state.scheduler.store()).list().to_vec();
    ApiResponse::ok(quotes)
}

/// GET /api/quotes/random?category= - One random quote from the filter
async fn get_random_quote(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> impl IntoResponse {
    let category = query.category.unwrap_or_else(|| ALL_CATEGORIES.to_string());
    let mut store = lock_store(state.scheduler.store());

    let picked = CategoryIndex::random(&store, &category, &mut rand::thread_rng()).cloned();
    match picked {
        Some(quote) => {
            store.remember_last_viewed(&quote);
            ApiResponse::ok(quote)
        }
        None => api_error(
            StatusCode::NOT_FOUND,
            "No quotes available in this category!",
        ),
    }
}

/// GET /api/categories - "all" plus distinct categories
async fn get_categories(State(state): State<AppState>) -> impl IntoResponse {
    let categories = CategoryIndex::categories(&lock_store(state.scheduler.store()));
    ApiResponse::ok(categories)
}

/// GET /api/filters/:category - Quotes in one category
///
/// `Path` has already percent-decoded the segment.
async fn filter_quotes(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    ApiResponse::ok(quotes_in_category(&state, &category))
}

fn quotes_in_category(state: &AppState, category: &str) -> Vec<Quote> {
    let store = lock_store(state.scheduler.store());
    CategoryIndex::filter(&store, category)
        .into_iter()
        .cloned()
        .collect()
}

/// POST /api/quotes - Add a quote and push it to the remote
async fn add_quote(
    State(state): State<AppState>,
    Json(request): Json<NewQuoteRequest>,
) -> impl IntoResponse {
    match state.scheduler.add_quote(&request.text, &request.category) {
        Ok(quote) => ApiResponse::ok(quote),
        Err(e) => validation_error(e),
    }
}

/// POST /api/import - Import a JSON array of quotes
async fn import_quotes(State(state): State<AppState>, body: String) -> impl IntoResponse {
    match import_json(&mut lock_store(state.scheduler.store()), &body) {
        Ok(added) => ApiResponse::ok(added),
        Err(e) => validation_error(e),
    }
}

/// GET /api/export - Download quotes.json
async fn export_quotes(State(state): State<AppState>) -> impl IntoResponse {
    let payload = export_json(&lock_store(state.scheduler.store()));

    match payload {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Error exporting quotes: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Export failed")
        }
    }
}

/// POST /api/sync - Run one reconciliation now
async fn sync_now(State(state): State<AppState>) -> impl IntoResponse {
    match state.scheduler.tick().await {
        TickOutcome::Completed(report) => ApiResponse::ok(SyncResponse::from(report)),
        TickOutcome::Skipped => api_error(StatusCode::CONFLICT, "Sync already in progress"),
        TickOutcome::Failed(e) => api_error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// GET /api/sync - Result of the most recent sync
async fn last_sync(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(state.scheduler.last_report().map(SyncResponse::from))
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/quotes", get(get_quotes).post(add_quote))
        .route("/quotes/random", get(get_random_quote))
        .route("/categories", get(get_categories))
        .route("/filters/:category", get(filter_quotes))
        .route("/import", post(import_quotes))
        .route("/export", get(export_quotes))
        .route("/sync", get(last_sync).post(sync_now))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    logging::init_tracing(config.log_format, &config.log_level);

    info!("Quote Sync - Web Server");
    let store = shared(open_store(&config));
    info!("Store opened: {} ({} quotes)", config.db_path, lock_store(&store).len());

    let remote = HttpRemoteSource::from_config(&config)?;
    info!(
        "Syncing with {} every {}s",
        remote.url(),
        config.sync_interval.as_secs()
    );
    let scheduler = SyncScheduler::new(store, Arc::new(remote), config.sync_interval);

    // Periodic reconciliation with the remote source
    scheduler.clone().spawn();

    let app = router(AppState { scheduler });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Server running on http://{}", config.listen_addr);
    info!("   API: http://{}/api/quotes", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
