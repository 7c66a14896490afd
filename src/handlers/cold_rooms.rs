use crate::entities::cold_room::{self, Entity as ColdRoom};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateColdRoomRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct BoxFilters {
    /// Only boxes not yet claimed by a pallet
    pub only_available: Option<bool>,
}

pub fn cold_rooms_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cold_rooms).post(create_cold_room))
        .route("/:id/boxes", get(list_boxes))
}

#[utoipa::path(
    get,
    path = "/api/v1/cold-rooms",
    responses((status = 200, description = "Known cold rooms")),
    tag = "cold-rooms"
)]
pub async fn list_cold_rooms(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let rooms = ColdRoom::find()
        .order_by_asc(cold_room::Column::Name)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(rooms)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cold-rooms",
    request_body = CreateColdRoomRequest,
    responses(
        (status = 200, description = "Cold room created"),
        (status = 400, description = "Invalid name", body = crate::errors::ErrorResponse)
    ),
    tag = "cold-rooms"
)]
pub async fn create_cold_room(
    State(state): State<AppState>,
    Json(request): Json<CreateColdRoomRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;
    let room = cold_room::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(request.name.trim().to_string()),
        created_at: Set(Utc::now()),
    };
    let created = room.insert(state.db.as_ref()).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// List box batches sitting in a cold room.
#[utoipa::path(
    get,
    path = "/api/v1/cold-rooms/{id}/boxes",
    params(
        ("id" = Uuid, Path, description = "Cold room id"),
        BoxFilters
    ),
    responses((status = 200, description = "Box batches in the room")),
    tag = "cold-rooms"
)]
pub async fn list_boxes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filters): Query<BoxFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let boxes = state
        .services
        .pallets
        .list_boxes(id, filters.only_available.unwrap_or(false))
        .await?;
    Ok(Json(ApiResponse::success(boxes)))
}
