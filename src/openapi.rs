use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Packhouse API",
        version = "0.2.0",
        description = "Size-group balance reconciliation and pallet consolidation for packed produce cold storage."
    ),
    paths(
        crate::handlers::size_groups::derive_size_groups,
        crate::handlers::size_groups::list_counting_records,
        crate::handlers::loading::check_duplicates,
        crate::handlers::loading::commit_loads,
        crate::handlers::pallets::consolidate_pallet,
        crate::handlers::pallets::dissolve_pallet,
        crate::handlers::pallets::get_pallet,
        crate::handlers::pallets::list_pallets,
        crate::handlers::cold_rooms::list_cold_rooms,
        crate::handlers::cold_rooms::create_cold_room,
        crate::handlers::cold_rooms::list_boxes,
        crate::handlers::balance::get_balance,
        crate::handlers::balance::reset_balance,
        crate::handlers::balance::clear_balance,
        crate::handlers::balance::rebuild_balance,
        crate::handlers::health::health,
    ),
    tags(
        (name = "size-groups", description = "Derivation of loadable size-groups"),
        (name = "loading", description = "Duplicate guard and load commitment"),
        (name = "pallets", description = "Pallet consolidation and dissolution"),
        (name = "cold-rooms", description = "Cold rooms and box inventory"),
        (name = "balance", description = "Balance ledger administration"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
