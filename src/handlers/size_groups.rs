use crate::errors::ServiceError;
use crate::{AppState, ApiResponse, ListQuery};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeriveSizeGroupsRequest {
    pub counting_record_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct RecordFilters {
    /// Only records that still offer loadable boxes
    pub only_with_remaining: Option<bool>,
}

pub fn size_groups_router() -> Router<AppState> {
    Router::new().route("/derive", post(derive_size_groups))
}

pub fn counting_records_router() -> Router<AppState> {
    Router::new().route("/", get(list_counting_records))
}

/// Derive the current size-groups for a set of counting records.
#[utoipa::path(
    post,
    path = "/api/v1/size-groups/derive",
    request_body = DeriveSizeGroupsRequest,
    responses(
        (status = 200, description = "Derived size-groups, sorted by remaining quantity"),
        (status = 404, description = "Unknown counting record", body = crate::errors::ErrorResponse)
    ),
    tag = "size-groups"
)]
pub async fn derive_size_groups(
    State(state): State<AppState>,
    Json(request): Json<DeriveSizeGroupsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let groups = state
        .services
        .size_groups
        .derive(&request.counting_record_ids)
        .await?;
    Ok(Json(ApiResponse::success(groups)))
}

/// List counting records, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/counting-records",
    params(RecordFilters),
    responses(
        (status = 200, description = "Counting records page")
    ),
    tag = "size-groups"
)]
pub async fn list_counting_records(
    State(state): State<AppState>,
    Query(page): Query<ListQuery>,
    Query(filters): Query<RecordFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let (records, total) = state
        .services
        .size_groups
        .list_records(
            page.page,
            page.limit,
            filters.only_with_remaining.unwrap_or(false),
        )
        .await?;
    Ok(Json(ApiResponse::paginated(records, total)))
}
