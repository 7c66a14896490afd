use crate::{ApiResponse, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Liveness/readiness probe: checks the database connection.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service healthy")),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(state.db.as_ref()).await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };
    let status = if database == "ok" { "ok" } else { "degraded" };
    Json(ApiResponse::success(HealthStatus { status, database }))
}
