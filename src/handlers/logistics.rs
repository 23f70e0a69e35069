use crate::{
    auth::{Actor, Role},
    entities::shipment::{self, ShipmentStatus},
    errors::ServiceError,
    handlers::requests::RequestSummary,
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
pub struct ShipmentSummary {
    pub id: Uuid,
    pub request_id: Uuid,
    pub reservation_id: Uuid,
    pub source_type: String,
    pub source_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub carrier: Option<String>,
    /// Human-facing identifier, `SHP-...`.
    pub tracking_number: String,
    pub dispatch_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<shipment::Model> for ShipmentSummary {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            request_id: model.request_id,
            reservation_id: model.reservation_id,
            source_type: model.source_type,
            source_id: model.source_id,
            quantity: model.quantity,
            status: model.status,
            carrier: model.carrier,
            tracking_number: model.tracking_number,
            dispatch_date: model.dispatch_date,
            delivery_date: model.delivery_date,
            delivery_address: model.delivery_address,
            delivery_city: model.delivery_city,
            delivery_state: model.delivery_state,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct AllocateBody {
    pub carrier: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShipmentStatusBody {
    /// DISPATCHED, IN_TRANSIT, DELIVERED or RECEIVED.
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/logistics/ready-for-allocation",
    responses(
        (status = 200, description = "Requests awaiting a shipment plan", body = ApiResponse<Vec<RequestSummary>>)
    ),
    tag = "logistics"
)]
pub async fn ready_for_allocation(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Vec<RequestSummary>> {
    actor.require(Role::Logistics)?;
    let requests = state.services.logistics.ready_requests().await?;
    Ok(Json(ApiResponse::success(
        requests.into_iter().map(RequestSummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/logistics/allocate/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = AllocateBody,
    responses(
        (status = 200, description = "One shipment created per active reservation", body = ApiResponse<Vec<ShipmentSummary>>),
        (status = 409, description = "Request is not READY_FOR_ALLOCATION", body = crate::errors::ErrorResponse)
    ),
    tag = "logistics"
)]
pub async fn allocate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AllocateBody>,
) -> ApiResult<Vec<ShipmentSummary>> {
    actor.require(Role::Logistics)?;
    let shipments = state.services.logistics.allocate(id, payload.carrier).await?;
    Ok(Json(ApiResponse::success(
        shipments.into_iter().map(ShipmentSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/request/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Shipments for the request", body = ApiResponse<Vec<ShipmentSummary>>)
    ),
    tag = "logistics"
)]
pub async fn shipments_for_request(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ShipmentSummary>> {
    let shipments = state.services.logistics.shipments_for_request(id).await?;
    Ok(Json(ApiResponse::success(
        shipments.into_iter().map(ShipmentSummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/dispatch",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment dispatched", body = ApiResponse<ShipmentSummary>),
        (status = 409, description = "Shipment is not CONFIRMED", body = crate::errors::ErrorResponse)
    ),
    tag = "logistics"
)]
pub async fn dispatch(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentSummary> {
    actor.require(Role::Logistics)?;
    let updated = state.services.logistics.dispatch(id).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/status",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ShipmentStatusBody,
    responses(
        (status = 200, description = "Status applied; receipt of the last shipment completes the request", body = ApiResponse<ShipmentSummary>),
        (status = 409, description = "Backward transition rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "logistics"
)]
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentStatusBody>,
) -> ApiResult<ShipmentSummary> {
    actor.require(Role::Logistics)?;
    let status = ShipmentStatus::from_str(payload.status.trim()).ok_or_else(|| {
        ServiceError::ValidationError(format!("unknown shipment status '{}'", payload.status))
    })?;
    let updated = state.services.logistics.advance(id, status).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(updated))))
}
