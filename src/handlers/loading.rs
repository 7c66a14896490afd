use crate::errors::ServiceError;
use crate::services::loading::SizeGroupLoad;
use crate::{ApiResponse, AppState};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoadBatchRequest {
    pub loads: Vec<SizeGroupLoad>,
}

pub fn loading_router() -> Router<AppState> {
    Router::new()
        .route("/check-duplicates", post(check_duplicates))
        .route("/commit", post(commit_loads))
}

/// Run the duplicate/overrun guard without committing anything.
#[utoipa::path(
    post,
    path = "/api/v1/loads/check-duplicates",
    request_body = LoadBatchRequest,
    responses(
        (status = 200, description = "Per-load duplicate check results")
    ),
    tag = "loading"
)]
pub async fn check_duplicates(
    State(state): State<AppState>,
    Json(request): Json<LoadBatchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let results = state
        .services
        .loading
        .check_duplicates(&request.loads)
        .await?;
    Ok(Json(ApiResponse::success(results)))
}

/// Commit a batch of size-group loads into cold-room inventory.
///
/// The response always distinguishes committed, skipped-duplicate, and
/// failed loads; duplicates never fail the batch.
#[utoipa::path(
    post,
    path = "/api/v1/loads/commit",
    request_body = LoadBatchRequest,
    responses(
        (status = 200, description = "Batch result with per-load outcomes")
    ),
    tag = "loading"
)]
pub async fn commit_loads(
    State(state): State<AppState>,
    Json(request): Json<LoadBatchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.loading.commit_loads(&request.loads).await?;
    Ok(Json(ApiResponse::success(result)))
}
