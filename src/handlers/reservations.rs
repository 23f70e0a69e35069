use crate::{
    auth::{Actor, Role},
    entities::reservation,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationSummary {
    pub id: Uuid,
    pub request_id: Uuid,
    /// WAREHOUSE | SUPPLIER.
    pub source_type: String,
    pub source_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub is_picked: bool,
    pub picked_at: Option<DateTime<Utc>>,
    /// active | superseded | retired.
    pub lifecycle: String,
    pub is_replacement: bool,
    pub original_reservation_id: Option<Uuid>,
    pub replaced_by_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<reservation::Model> for ReservationSummary {
    fn from(model: reservation::Model) -> Self {
        Self {
            id: model.id,
            request_id: model.request_id,
            source_type: model.source_type,
            source_id: model.source_id,
            quantity: model.quantity,
            status: model.status,
            is_blocked: model.is_blocked,
            block_reason: model.block_reason,
            is_picked: model.is_picked,
            picked_at: model.picked_at,
            lifecycle: model.lifecycle,
            is_replacement: model.is_replacement,
            original_reservation_id: model.original_reservation_id,
            replaced_by_id: model.replaced_by_id,
            resolution_notes: model.resolution_notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct MarkReadyBody {
    pub note: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/:id/reservations",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Reservations listed, superseded and retired included", body = ApiResponse<Vec<ReservationSummary>>)
    ),
    tag = "reservations"
)]
pub async fn list_for_request(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ReservationSummary>> {
    let reservations = state.services.reservations.list_for_request(id).await?;
    Ok(Json(ApiResponse::success(
        reservations
            .into_iter()
            .map(ReservationSummary::from)
            .collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/:id/pick",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation picked", body = ApiResponse<ReservationSummary>),
        (status = 409, description = "Reservation is not pickable", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn pick(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationSummary> {
    actor.require(Role::Warehouse)?;
    let updated = state.services.reservations.pick(id, actor.user_id).await?;
    Ok(Json(ApiResponse::success(ReservationSummary::from(
        updated,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/:id/supplier-confirm",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Supplier confirmed availability", body = ApiResponse<ReservationSummary>),
        (status = 409, description = "Reservation is not SUPPLIER_PENDING", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn supplier_confirm(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationSummary> {
    actor.require_any(&[Role::Supplier, Role::Procurement])?;
    let updated = state.services.reservations.confirm_supplier(id).await?;
    Ok(Json(ApiResponse::success(ReservationSummary::from(
        updated,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/:id/mark-ready",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = MarkReadyBody,
    responses(
        (status = 200, description = "Reservation forced to READY", body = ApiResponse<ReservationSummary>),
        (status = 409, description = "Reservation cannot be marked ready", body = crate::errors::ErrorResponse)
    ),
    tag = "reservations"
)]
pub async fn mark_ready(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkReadyBody>,
) -> ApiResult<ReservationSummary> {
    actor.require(Role::Procurement)?;
    let updated = state
        .services
        .reservations
        .mark_ready(id, actor.user_id, payload.note)
        .await?;
    Ok(Json(ApiResponse::success(ReservationSummary::from(
        updated,
    ))))
}
