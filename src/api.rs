// 🌐 HTTP surface - axum router over a shared TollBooth

use crate::db::{DeductionEntry, VehicleRecord};
use crate::error::TollError;
use crate::normalizer::canonicalize;
use crate::outcome::TollResponse;
use crate::pipeline::TollBooth;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub booth: Arc<TollBooth>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// POST /decode body
#[derive(Deserialize)]
pub struct DecodeRequest {
    pub image: String,
}

impl IntoResponse for TollError {
    fn into_response(self) -> Response {
        let status = match &self {
            TollError::MalformedInput(_) | TollError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            TollError::RecognitionUnavailable(_) | TollError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            TollError::InvalidAmount(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

fn join_error(e: tokio::task::JoinError) -> Response {
    error!("Worker task failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal error".to_string(),
            kind: "internal",
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /decode - recognize a frame and charge the toll
async fn decode(
    State(state): State<AppState>,
    request: Result<Json<DecodeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            return TollError::MalformedInput(rejection.body_text()).into_response();
        }
    };
    let booth = state.booth.clone();

    // Recognition and SQLite both block
    let result = tokio::task::spawn_blocking(move || booth.process_frame(&request.image)).await;

    match result {
        Ok(Ok(response)) => (StatusCode::OK, Json::<TollResponse>(response)).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => join_error(e),
    }
}

/// GET /api/vehicles/:plate - current ledger record
async fn get_vehicle(State(state): State<AppState>, Path(plate): Path<String>) -> Response {
    let booth = state.booth.clone();
    let plate = decode_plate(&plate);

    let result =
        tokio::task::spawn_blocking(move || booth.engine().ledger().get(&plate).map(|r| (plate, r)))
            .await;

    match result {
        Ok(Ok((_, Some(record)))) => {
            (StatusCode::OK, Json(ApiResponse::<VehicleRecord>::ok(record))).into_response()
        }
        Ok(Ok((plate, None))) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("plate {} not found", plate),
                kind: "not_found",
            }),
        )
            .into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => join_error(e),
    }
}

/// GET /api/history/:plate - deduction history in creation order
async fn get_history(State(state): State<AppState>, Path(plate): Path<String>) -> Response {
    let booth = state.booth.clone();
    let plate = decode_plate(&plate);

    let result = tokio::task::spawn_blocking(move || booth.engine().ledger().history(&plate)).await;

    match result {
        Ok(Ok(entries)) => {
            (StatusCode::OK, Json(ApiResponse::<Vec<DeductionEntry>>::ok(entries))).into_response()
        }
        Ok(Err(e)) => e.into_response(),
        Err(e) => join_error(e),
    }
}

/// URL-decoded, canonical plate id
fn decode_plate(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    canonicalize(&decoded)
}

pub fn router(state: AppState, max_payload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/vehicles/:plate", get(get_vehicle))
        .route("/history/:plate", get(get_history));

    Router::new()
        .route("/decode", post(decode))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
