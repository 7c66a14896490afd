use crate::errors::ServiceError;
use crate::services::pallets::ConsolidatePalletRequest;
use crate::{ApiResponse, AppState, ListQuery};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

pub fn pallets_router() -> Router<AppState> {
    Router::new()
        .route("/", post(consolidate_pallet).get(list_pallets))
        .route("/:id", get(get_pallet).delete(dissolve_pallet))
}

/// Consolidate selected box batches into a new pallet.
#[utoipa::path(
    post,
    path = "/api/v1/pallets",
    request_body = ConsolidatePalletRequest,
    responses(
        (status = 200, description = "Pallet created, with complete-pallet count and remainder"),
        (status = 400, description = "Invalid selection", body = crate::errors::ErrorResponse),
        (status = 422, description = "Quantity bookkeeping failure", body = crate::errors::ErrorResponse)
    ),
    tag = "pallets"
)]
pub async fn consolidate_pallet(
    State(state): State<AppState>,
    Json(request): Json<ConsolidatePalletRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.pallets.consolidate(request).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Dissolve a pallet, returning its boxes to the available pool.
#[utoipa::path(
    delete,
    path = "/api/v1/pallets/{id}",
    params(("id" = Uuid, Path, description = "Pallet id")),
    responses(
        (status = 200, description = "Pallet dissolved; reports boxes returned"),
        (status = 404, description = "Pallet not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Returned quantity mismatch", body = crate::errors::ErrorResponse)
    ),
    tag = "pallets"
)]
pub async fn dissolve_pallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.pallets.dissolve(id).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pallets/{id}",
    params(("id" = Uuid, Path, description = "Pallet id")),
    responses(
        (status = 200, description = "Pallet summary"),
        (status = 404, description = "Pallet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "pallets"
)]
pub async fn get_pallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.pallets.get(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pallets",
    responses((status = 200, description = "Pallets page")),
    tag = "pallets"
)]
pub async fn list_pallets(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (pallets, total) = state.services.pallets.list(page.page, page.limit).await?;
    Ok(Json(ApiResponse::paginated(pallets, total)))
}
