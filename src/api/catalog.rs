//! Static catalogues: supported pairs and recognised patterns.

use axum::{routing::get, Json, Router};

use super::ApiResponse;
use crate::types::{CurrencyPair, PatternInfo, ALL_PATTERNS, CURRENCY_PAIRS};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pairs", get(list_pairs))
        .route("/api/patterns", get(list_patterns))
}

async fn list_pairs() -> Json<ApiResponse<Vec<CurrencyPair>>> {
    Json(ApiResponse::new(CURRENCY_PAIRS.to_vec()))
}

async fn list_patterns() -> Json<ApiResponse<Vec<PatternInfo>>> {
    Json(ApiResponse::new(
        ALL_PATTERNS.iter().copied().map(PatternInfo::from).collect(),
    ))
}
