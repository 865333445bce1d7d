//! HTTP API server.
//!
//! Exposes the catalog read surface, the resolver request surface, the
//! rebuild trigger surface, and the document map navigation helpers as a
//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/catalog/{programme}` | Read a programme's catalog snapshot |
//! | `GET`  | `/api/envelopes` | List all envelope records |
//! | `GET`  | `/api/resolve` | Resolve a publication to a concrete envelope |
//! | `POST` | `/api/rebuild` | Manual rebuild trigger |
//! | `POST` | `/api/events/publication-updated` | Store-event rebuild trigger (payload ignored) |
//! | `GET`  | `/api/map/locate` | Locate a topic within a map |
//! | `GET`  | `/api/map/assemble` | Composite reading view for a topic |
//! | `GET`  | `/api/map/menu` | Two-tier navigation menu for a map |
//! | `GET`  | `/api/document` | Raw document pass-through |
//! | `POST` | `/api/search` | Full-text search pass-through |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no envelope matched" } }
//! ```
//!
//! Error codes: `missing_parameter` (400), `not_found` (404),
//! `source_unavailable` (502), `malformed_content` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the reading UI is
//! served from a different origin.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ditamap;
use crate::models::{Envelope, Programme, Topic};
use crate::navigator;
use crate::rebuild::{RebuildScheduler, TriggerOutcome};
use crate::resolve::{ResolveRequest, Resolver};
use crate::snapshot::SnapshotStore;
use crate::source::{EnvelopeSource, RawDocument};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    source: Arc<dyn EnvelopeSource>,
    snapshots: Arc<dyn SnapshotStore>,
    resolver: Arc<Resolver>,
    scheduler: Arc<RebuildScheduler>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until
/// the process is terminated.
pub async fn run_server(
    config: &Config,
    source: Arc<dyn EnvelopeSource>,
    snapshots: Arc<dyn SnapshotStore>,
) -> anyhow::Result<()> {
    let resolver = Arc::new(Resolver::new(source.clone(), snapshots.clone()));
    let scheduler = Arc::new(RebuildScheduler::new(source.clone(), snapshots.clone()));

    let state = AppState {
        source,
        snapshots,
        resolver,
        scheduler,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/catalog/{programme}", get(handle_catalog))
        .route("/api/envelopes", get(handle_envelopes))
        .route("/api/resolve", get(handle_resolve))
        .route("/api/rebuild", post(handle_rebuild))
        .route("/api/events/publication-updated", post(handle_rebuild))
        .route("/api/map/locate", get(handle_map_locate))
        .route("/api/map/assemble", get(handle_map_assemble))
        .route("/api/map/menu", get(handle_map_menu))
        .route("/api/document", get(handle_document))
        .route("/api/search", post(handle_search))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    println!("pubcat API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn missing_parameter(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "missing_parameter".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn source_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "source_unavailable".to_string(),
        message: message.into(),
    }
}

fn malformed_content(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "malformed_content".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps engine errors to the most appropriate HTTP status. The engine
/// itself never retries; negative lookups arrive as `Ok(None)` and are
/// handled per-route.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = format!("{err:#}");

    if msg.contains("missing parameter") {
        missing_parameter(msg)
    } else if msg.contains("unreachable") {
        source_unavailable(msg)
    } else if msg.contains("malformed") {
        malformed_content(msg)
    } else {
        internal(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/catalog/{programme} ============

/// Returns the current snapshot for a programme, addressed by its
/// lowercase code (`/api/catalog/pyp`). 404 only if the builder has
/// never run.
async fn handle_catalog(
    State(state): State<AppState>,
    Path(programme): Path<String>,
) -> Result<Response, AppError> {
    let programme = Programme::from_code(&programme)
        .ok_or_else(|| not_found(format!("unknown programme: {programme}")))?;

    let catalog = state
        .snapshots
        .read(programme)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("no catalog built yet for {}", programme.code())))?;

    Ok(Json(&*catalog).into_response())
}

// ============ GET /api/envelopes ============

async fn handle_envelopes(State(state): State<AppState>) -> Result<Json<Vec<Envelope>>, AppError> {
    let envelopes = state
        .source
        .list_envelopes(None)
        .await
        .map_err(classify_error)?;
    Ok(Json(envelopes))
}

// ============ GET /api/resolve ============

#[derive(Deserialize)]
struct ResolveQuery {
    #[serde(default)]
    programme: String,
    #[serde(default)]
    publication: String,
    #[serde(default)]
    language: String,
    /// Previously-learned translation group.
    group: Option<String>,
}

async fn handle_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<crate::resolve::Resolution>, AppError> {
    let request = ResolveRequest {
        programme: query.programme,
        publication: query.publication,
        language: query.language,
        group_hint: query.group,
    };

    let resolution = state
        .resolver
        .resolve(&request)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| {
            not_found(format!(
                "no envelope matched publication '{}' in programme '{}'",
                request.publication, request.programme
            ))
        })?;

    Ok(Json(resolution))
}

// ============ POST /api/rebuild, /api/events/publication-updated ============

#[derive(Serialize)]
#[serde(untagged)]
enum RebuildResponse {
    Completed {
        status: &'static str,
        summary: crate::rebuild::RebuildSummary,
    },
    Coalesced {
        status: &'static str,
    },
}

/// Both the manual trigger and the store's event notification invoke a
/// full rebuild; the event payload is not interpreted.
async fn handle_rebuild(State(state): State<AppState>) -> Result<Json<RebuildResponse>, AppError> {
    match state.scheduler.trigger().await.map_err(classify_error)? {
        TriggerOutcome::Completed(summary) => Ok(Json(RebuildResponse::Completed {
            status: "rebuilt",
            summary,
        })),
        TriggerOutcome::Coalesced => Ok(Json(RebuildResponse::Coalesced {
            status: "coalesced",
        })),
    }
}

// ============ Map navigation ============

#[derive(Deserialize)]
struct MapQuery {
    /// Locator of the map document.
    map: String,
    /// Target topic URI (required by locate/assemble).
    topic: Option<String>,
}

/// Load and parse a map's topic tree from the store.
async fn load_topics(state: &AppState, map_uri: &str) -> Result<Vec<Topic>, AppError> {
    if map_uri.trim().is_empty() {
        return Err(missing_parameter("missing parameter: map"));
    }

    let doc = state
        .source
        .read_document(map_uri)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("no document at {map_uri}")))?;

    match doc {
        RawDocument::Xml(xml) => ditamap::parse_map(&xml).map_err(classify_error),
        RawDocument::Json(value) => match value.pointer("/ditaMap/files") {
            Some(files) => serde_json::from_value(files.clone())
                .map_err(|e| malformed_content(format!("malformed topic list at {map_uri}: {e}"))),
            None => Err(malformed_content(format!(
                "document at {map_uri} is not a map"
            ))),
        },
        RawDocument::Binary { .. } => Err(malformed_content(format!(
            "document at {map_uri} is binary, not a map"
        ))),
    }
}

fn require_topic(query: &MapQuery) -> Result<&str, AppError> {
    match query.topic.as_deref() {
        Some(topic) if !topic.trim().is_empty() => Ok(topic),
        _ => Err(missing_parameter("missing parameter: topic")),
    }
}

async fn handle_map_locate(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> Result<Json<navigator::Located>, AppError> {
    let topics = load_topics(&state, &query.map).await?;
    let target = require_topic(&query)?;

    let located = navigator::locate(&topics, target)
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("topic {target} not in map {}", query.map)))?;

    Ok(Json(located))
}

async fn handle_map_assemble(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> Result<Json<Vec<navigator::AssembledTopic>>, AppError> {
    let topics = load_topics(&state, &query.map).await?;
    let target = require_topic(&query)?;

    let view = navigator::assemble(&topics, target)
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("topic {target} not in map {}", query.map)))?;

    Ok(Json(view))
}

async fn handle_map_menu(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> Result<Json<Vec<navigator::MenuEntry>>, AppError> {
    let topics = load_topics(&state, &query.map).await?;
    Ok(Json(navigator::menu(&topics)))
}

// ============ GET /api/document ============

#[derive(Deserialize)]
struct DocumentQuery {
    uri: String,
}

/// Raw document pass-through: JSON stays JSON, XML is served as XML
/// text, binaries keep their stored content type.
async fn handle_document(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, AppError> {
    if query.uri.trim().is_empty() {
        return Err(missing_parameter("missing parameter: uri"));
    }

    let doc = state
        .source
        .read_document(&query.uri)
        .await
        .map_err(classify_error)?
        .ok_or_else(|| not_found(format!("no document at {}", query.uri)))?;

    Ok(match doc {
        RawDocument::Json(value) => Json(value).into_response(),
        RawDocument::Xml(text) => (
            [(header::CONTENT_TYPE, "application/xml".to_string())],
            text,
        )
            .into_response(),
        RawDocument::Binary {
            content_type,
            bytes,
        } => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
    })
}

// ============ POST /api/search ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    #[serde(default)]
    query_text: String,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_length")]
    page_length: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_length() -> u32 {
    10
}

/// Pass-through to the store's search endpoint; no local ranking.
async fn handle_search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.query_text.trim().is_empty() {
        return Err(missing_parameter("missing parameter: queryText"));
    }

    let response = state
        .source
        .search(&body.query_text, body.page, body.page_length)
        .await
        .map_err(classify_error)?;

    Ok(Json(response))
}
