use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::replay::{build_replay, ReplayRequest};
use crate::session::{SessionLoader, SessionType};
use crate::types::ReplayPayload;

const API_NAME: &str = "F1 Race Replay API";

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn SessionLoader>,
    pub seasons: Arc<Vec<i32>>,
}

// ---------- Request/Response types ----------

#[derive(Deserialize, Debug)]
pub struct RaceQuery {
    #[serde(default)]
    session_type: SessionType,
    #[serde(default)]
    refresh: bool,
}

/// Uniform failure body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail,
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

// ---------- Handlers ----------

async fn root() -> Json<Value> {
    Json(json!({ "message": API_NAME, "version": env!("CARGO_PKG_VERSION") }))
}

async fn seasons(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "seasons": state.seasons.as_slice() }))
}

async fn race(
    State(state): State<AppState>,
    path: Result<Path<(i32, u32)>, PathRejection>,
    query: Result<Query<RaceQuery>, QueryRejection>,
) -> Result<Json<ReplayPayload>, ApiError> {
    let Path((year, round)) = path?;
    let Query(query) = query?;
    let req = ReplayRequest {
        year,
        round,
        session_type: query.session_type,
        refresh: query.refresh,
    };

    // The loader is synchronous and may hit the disk.
    let loader = Arc::clone(&state.loader);
    let outcome = tokio::task::spawn_blocking(move || build_replay(loader.as_ref(), &req)).await;

    match outcome {
        Ok(Ok(payload)) => {
            tracing::info!(
                year,
                round,
                session_type = %req.session_type,
                frames = payload.frames.len(),
                drivers = payload.drivers.len(),
                "served race data"
            );
            Ok(Json(payload))
        }
        Ok(Err(err)) => {
            tracing::error!(
                year,
                round,
                session_type = %req.session_type,
                kind = ?err.kind(),
                error = ?err,
                "error loading race data: {}",
                err
            );
            Err(ApiError::internal(format!("Error loading race data: {}", err)))
        }
        Err(join_err) => {
            tracing::error!(year, round, "replay task failed: {}", join_err);
            Err(ApiError::internal(format!("Error loading race data: {}", join_err)))
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/seasons", get(seasons))
        .route("/api/race/:year/:round_number", get(race))
        .with_state(state)
}

/// CORS for the browser client; credentials rule out wildcards, so methods
/// and headers mirror the preflight request.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|e| anyhow::anyhow!("bad origin {:?}: {}", o, e)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
