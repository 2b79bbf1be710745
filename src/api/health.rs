use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    pair: String,
    generation: u64,
    bars: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let view = state.session.view();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pair: view.session.pair,
        generation: view.session.generation,
        bars: view.bars.len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}
