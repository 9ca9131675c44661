use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app::ports::FeatureServicePort;
use crate::areas::{AreaDirectory, MunicipalityCache};
use crate::calendar::{debug_flag, CalendarEngine, CalendarRequest};
use crate::error::CalendarError;
use crate::geo::GeoLocator;

/// Shared per-process state: the engine and collaborators over one upstream.
#[derive(Clone)]
pub struct AppState {
    pub calendar: Arc<CalendarEngine>,
    pub areas: Arc<AreaDirectory>,
    pub geo: Arc<GeoLocator>,
}

impl AppState {
    pub fn new(service: Arc<dyn FeatureServicePort>, cache: Arc<MunicipalityCache>) -> Self {
        Self {
            calendar: Arc::new(CalendarEngine::new(service.clone())),
            areas: Arc::new(AreaDirectory::new(service.clone(), cache)),
            geo: Arc::new(GeoLocator::new(service)),
        }
    }
}

impl IntoResponse for CalendarError {
    fn into_response(self) -> Response {
        let status = match &self {
            CalendarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CalendarError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CalendarParams {
    area: Option<String>,
    month: Option<String>,
    year: Option<String>,
    debug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    municipio: Option<String>,
    bairro: Option<String>,
    q: Option<String>,
    debug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointParams {
    lat: Option<String>,
    lon: Option<String>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "supply-calendar",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Validation happens before any upstream call.
async fn calendar(
    State(state): State<AppState>,
    Query(p): Query<CalendarParams>,
) -> Result<Response, CalendarError> {
    let request = CalendarRequest::parse(
        p.area.as_deref(),
        p.month.as_deref(),
        p.year.as_deref(),
        p.debug.as_deref(),
    )?;
    Ok(Json(state.calendar.run(&request).await).into_response())
}

async fn municipalities(
    State(state): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Response, CalendarError> {
    Ok(Json(state.areas.municipalities(p.q.as_deref()).await?).into_response())
}

async fn neighborhoods(
    State(state): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Response, CalendarError> {
    let result = state.areas.neighborhoods(p.municipio.as_deref(), p.q.as_deref()).await?;
    Ok(Json(result).into_response())
}

async fn supply_areas(
    State(state): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Response, CalendarError> {
    let result = state
        .areas
        .supply_areas(p.municipio.as_deref(), p.bairro.as_deref(), p.q.as_deref())
        .await?;
    Ok(Json(result).into_response())
}

async fn area_at_point(
    State(state): State<AppState>,
    Query(p): Query<PointParams>,
) -> Result<Response, CalendarError> {
    Ok(Json(state.geo.area_at(p.lat.as_deref(), p.lon.as_deref()).await?).into_response())
}

async fn search(
    State(state): State<AppState>,
    Query(p): Query<FilterParams>,
) -> Result<Response, CalendarError> {
    let result = state.geo.search(p.q.as_deref(), debug_flag(p.debug.as_deref())).await?;
    Ok(Json(result).into_response())
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/calendar", get(calendar))
        .route("/areas/municipios", get(municipalities))
        .route("/areas/bairros", get(neighborhoods))
        .route("/areas/abastecimentos", get(supply_areas))
        .route("/geo/area", get(area_at_point))
        .route("/geo/search", get(search))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> Result<(), hyper::Error> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Calendar: http://localhost:{port}/calendar?area=<id>&month=<m>&year=<y>");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
