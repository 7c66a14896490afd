use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetBalanceRequest {
    pub unique_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearBalanceResponse {
    pub entries_removed: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RebuildBalanceResponse {
    pub entries_written: usize,
}

pub fn balance_router() -> Router<AppState> {
    Router::new()
        .route("/reset", post(reset_balance))
        .route("/clear", post(clear_balance))
        .route("/rebuild", post(rebuild_balance))
        .route("/:unique_key", get(get_balance))
}

/// Fetch the persisted ledger entry for one size-group key.
#[utoipa::path(
    get,
    path = "/api/v1/balance/{unique_key}",
    params(("unique_key" = String, Path, description = "Size-group unique key")),
    responses(
        (status = 200, description = "Ledger entry"),
        (status = 404, description = "No balance recorded", body = crate::errors::ErrorResponse)
    ),
    tag = "balance"
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(unique_key): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let entry = state
        .services
        .balance
        .get(&unique_key)
        .await
        .ok_or_else(|| {
            ServiceError::NotFound(format!("no balance recorded for {}", unique_key))
        })?;
    Ok(Json(ApiResponse::success(entry)))
}

/// Administrative override: zero the loaded quantity for one key.
#[utoipa::path(
    post,
    path = "/api/v1/balance/reset",
    request_body = ResetBalanceRequest,
    responses((status = 200, description = "Balance reset")),
    tag = "balance"
)]
pub async fn reset_balance(
    State(state): State<AppState>,
    Json(request): Json<ResetBalanceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.balance.reset(&request.unique_key).await?;
    Ok(Json(ApiResponse::<()>::message("balance reset")))
}

/// Explicit "start over": wipe the whole balance store.
#[utoipa::path(
    post,
    path = "/api/v1/balance/clear",
    responses((status = 200, description = "Store wiped")),
    tag = "balance"
)]
pub async fn clear_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries_removed = state.services.balance.clear_all().await?;
    Ok(Json(ApiResponse::success(ClearBalanceResponse {
        entries_removed,
    })))
}

/// Maintenance repair path: recompute the ledger from cold-room inventory.
#[utoipa::path(
    post,
    path = "/api/v1/balance/rebuild",
    responses((status = 200, description = "Store rebuilt from inventory")),
    tag = "balance"
)]
pub async fn rebuild_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries_written = state.services.balance.rebuild_from_inventory().await?;
    Ok(Json(ApiResponse::success(RebuildBalanceResponse {
        entries_written,
    })))
}
