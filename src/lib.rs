//! Supplyline API Library
//!
//! Request fulfillment backbone for the dealer supply network: sourcing
//! recommendations, stock reservation, AI-assisted inspection, procurement
//! remedies and the logistics handoff.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "up" })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": err.to_string() })),
        ),
    }
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}

/// Operational endpoints outside the versioned API.
pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
}

pub fn api_v1_routes() -> Router<AppState> {
    let requests = Router::new()
        .route(
            "/requests",
            post(handlers::requests::create_request).get(handlers::requests::list_requests),
        )
        .route("/requests/:id", get(handlers::requests::get_request))
        .route(
            "/requests/:id/recommendation",
            get(handlers::requests::get_recommendation),
        )
        .route(
            "/requests/:id/confirm",
            post(handlers::requests::confirm_request),
        )
        .route(
            "/requests/:id/start-picking",
            post(handlers::requests::start_picking),
        )
        .route(
            "/requests/:id/cancel",
            post(handlers::requests::cancel_request),
        )
        .route(
            "/requests/:id/reservations",
            get(handlers::reservations::list_for_request),
        );

    let reservations = Router::new()
        .route("/reservations/:id/pick", post(handlers::reservations::pick))
        .route(
            "/reservations/:id/supplier-confirm",
            post(handlers::reservations::supplier_confirm),
        )
        .route(
            "/reservations/:id/mark-ready",
            post(handlers::reservations::mark_ready),
        );

    let inspections = Router::new()
        .route(
            "/inspections",
            post(handlers::inspections::submit_inspection),
        )
        .route(
            "/inspections/request/:id",
            get(handlers::inspections::list_for_request),
        )
        .route(
            "/inspections/:id/override",
            post(handlers::inspections::override_result),
        );

    let procurement = Router::new()
        .route("/procurement/pending", get(handlers::procurement::pending))
        .route(
            "/procurement/replacement-options/:id",
            get(handlers::procurement::replacement_options),
        )
        .route(
            "/procurement/resolve/:id",
            post(handlers::procurement::resolve),
        )
        .route(
            "/procurement/ready-for-allocation/:id",
            post(handlers::reservations::mark_ready),
        );

    let logistics = Router::new()
        .route(
            "/logistics/ready-for-allocation",
            get(handlers::logistics::ready_for_allocation),
        )
        .route(
            "/logistics/allocate/:id",
            post(handlers::logistics::allocate),
        )
        .route(
            "/shipments/request/:id",
            get(handlers::logistics::shipments_for_request),
        )
        .route(
            "/shipments/:id/dispatch",
            post(handlers::logistics::dispatch),
        )
        .route(
            "/shipments/:id/status",
            post(handlers::logistics::update_status),
        );

    let catalog = Router::new()
        .route("/warehouses", get(handlers::warehouses::list_warehouses))
        .route(
            "/warehouses/:id/stock",
            get(handlers::warehouses::warehouse_stock).post(handlers::warehouses::receive_stock),
        )
        .route("/suppliers", get(handlers::suppliers::list_suppliers))
        .route(
            "/suppliers/:id/lines",
            get(handlers::suppliers::supplier_lines),
        )
        .route("/reports/stale", get(handlers::requests::stale_report));

    Router::new()
        .merge(requests)
        .merge(reservations)
        .merge(inspections)
        .merge(procurement)
        .merge(logistics)
        .merge(catalog)
}
