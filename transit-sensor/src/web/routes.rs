//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::source::SourceError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sensors", get(list_sensors))
        .route("/api/sensors/:unique_id", get(get_sensor))
        .route("/api/stations", get(list_directory))
        .route("/api/stations/search", get(search_stations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Current readings of every sensor.
async fn list_sensors(State(state): State<AppState>) -> Json<SensorListResponse> {
    let now = Utc::now();
    let sensors = state
        .sensors
        .iter()
        .map(|sensor| SensorView::from_reading(sensor, sensor.reading(now)))
        .collect();

    Json(SensorListResponse { sensors })
}

/// Current reading of one sensor.
async fn get_sensor(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<SensorView>, AppError> {
    let sensor = state.sensor(&unique_id).ok_or_else(|| AppError::NotFound {
        message: format!("Unknown sensor: {unique_id}"),
    })?;

    Ok(Json(SensorView::from_reading(
        sensor,
        sensor.reading(Utc::now()),
    )))
}

/// Search stops by name through Motis geocoding.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Result<Json<StationSearchResponse>, AppError> {
    let geocoder = state.geocoder.as_ref().ok_or_else(|| AppError::BadRequest {
        message: "Stop search needs the motis backend".to_string(),
    })?;

    let text = req.q.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest {
            message: "Search text must not be empty".to_string(),
        });
    }

    let limit = req.limit.unwrap_or(10).min(50);
    let matches = geocoder.search_stops(text).await?;

    let stations = matches
        .into_iter()
        .filter(|m| m.is_stop())
        .take(limit)
        .map(StationSearchResult::from)
        .collect();

    Ok(Json(StationSearchResponse { stations }))
}

/// Stations of the static directory, sorted by name.
async fn list_directory(State(state): State<AppState>) -> Result<Json<DirectoryResponse>, AppError> {
    let directory = state.directory.as_ref().ok_or_else(|| AppError::NotFound {
        message: "No station directory configured".to_string(),
    })?;

    let stations = directory
        .display_names()
        .into_iter()
        .map(|(id, label)| DirectoryEntry {
            global_id: directory.global_id(&id).map(str::to_string),
            location: directory.location(&id),
            id,
            label,
        })
        .collect();

    Ok(Json(DirectoryResponse { stations }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Upstream { message: String },
}

impl From<SourceError> for AppError {
    fn from(e: SourceError) -> Self {
        AppError::Upstream {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
