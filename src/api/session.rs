//! Session API endpoints.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::SessionAction;
use crate::types::{
    IndicatorKind, IndicatorSettings, PatternConfig, PatternFilter, PredictionSettings,
    SessionView,
};
use crate::AppState;

/// Body of a pair change.
#[derive(Debug, Deserialize)]
pub struct PairRequest {
    pub pair: String,
}

/// Create the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/pair", post(set_pair))
        .route("/prediction", put(set_prediction))
        .route("/indicators/:kind", put(set_indicator))
        .route("/patterns/config", put(set_pattern_config))
        .route("/patterns/filter", put(set_pattern_filter))
        .route("/alert", delete(dismiss_alert))
}

/// Current session view.
async fn get_session(State(state): State<AppState>) -> Json<ApiResponse<SessionView>> {
    Json(ApiResponse::new(state.session.view()))
}

async fn apply(state: &AppState, action: SessionAction) -> Result<Json<ApiResponse<SessionView>>> {
    let view = state.session.apply(action).await?;
    Ok(Json(ApiResponse::new(view)))
}

/// Switch instrument. Resets the session when the pair changes.
async fn set_pair(
    State(state): State<AppState>,
    Json(body): Json<PairRequest>,
) -> Result<Json<ApiResponse<SessionView>>> {
    apply(&state, SessionAction::SetPair(body.pair)).await
}

/// Update temperature and history length. Values are clamped.
async fn set_prediction(
    State(state): State<AppState>,
    Json(settings): Json<PredictionSettings>,
) -> Result<Json<ApiResponse<SessionView>>> {
    apply(&state, SessionAction::SetPredictionSettings(settings)).await
}

async fn set_indicator(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(settings): Json<IndicatorSettings>,
) -> Result<Json<ApiResponse<SessionView>>> {
    let kind = IndicatorKind::from_str(&kind)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown indicator: {}", kind)))?;
    apply(&state, SessionAction::SetIndicator(kind, settings)).await
}

async fn set_pattern_config(
    State(state): State<AppState>,
    Json(config): Json<PatternConfig>,
) -> Result<Json<ApiResponse<SessionView>>> {
    apply(&state, SessionAction::SetPatternConfig(config)).await
}

async fn set_pattern_filter(
    State(state): State<AppState>,
    Json(filter): Json<PatternFilter>,
) -> Result<Json<ApiResponse<SessionView>>> {
    apply(&state, SessionAction::SetPatternFilter(filter)).await
}

async fn dismiss_alert(State(state): State<AppState>) -> Result<Json<ApiResponse<SessionView>>> {
    apply(&state, SessionAction::DismissAlert).await
}
