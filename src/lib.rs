//! Packhouse API Library
//!
//! Size-group balance reconciliation and pallet consolidation for packed
//! produce moving from counting into cold storage.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;

use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            total: None,
        }
    }

    pub fn paginated(data: T, total: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            total: Some(total),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            total: None,
        }
    }
}

/// Assembles the application router with the standard middleware stack.
pub fn app_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let api = Router::new()
        .nest("/size-groups", handlers::size_groups::size_groups_router())
        .nest(
            "/counting-records",
            handlers::size_groups::counting_records_router(),
        )
        .nest("/loads", handlers::loading::loading_router())
        .nest("/pallets", handlers::pallets::pallets_router())
        .nest("/cold-rooms", handlers::cold_rooms::cold_rooms_router())
        .nest("/balance", handlers::balance::balance_router());

    Router::new()
        .merge(handlers::health::health_router())
        .nest("/api/v1", api)
        .route(
            "/api-docs/openapi.json",
            axum::routing::get(openapi::serve_openapi),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}
