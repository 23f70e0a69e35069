use crate::{
    auth::{Actor, Role},
    entities::product_request::{self, RequestStatus},
    errors::ServiceError,
    services::requests::{ConfirmAction, CreateRequestInput, StaleEntry},
    services::sourcing::SourcingRecommendation,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestListQuery {
    /// Filter by status, e.g. `PARTIALLY_BLOCKED`.
    pub status: Option<String>,
    /// Filter by dealer; ignored for dealer callers, who always see their own.
    pub dealer_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "request_number": "REQ-20250614-4F7A2C",
    "status": "PARTIALLY_BLOCKED",
    "quantity": 120,
    "planned_quantity": 120,
    "delivery_location": "Av. Paulista 1000, Sao Paulo"
}))]
pub struct RequestSummary {
    pub id: Uuid,
    /// Human-facing identifier, `REQ-YYYYMMDD-XXXXXX`.
    pub request_number: String,
    pub dealer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub planned_quantity: Option<i32>,
    pub status: String,
    pub delivery_location: String,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub recommended_source: Option<String>,
    pub recommendation_explanation: Option<String>,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub dealer_notes: Option<String>,
    pub procurement_notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product_request::Model> for RequestSummary {
    fn from(model: product_request::Model) -> Self {
        Self {
            id: model.id,
            request_number: model.request_number,
            dealer_id: model.dealer_id,
            product_id: model.product_id,
            quantity: model.quantity,
            planned_quantity: model.planned_quantity,
            status: model.status,
            delivery_location: model.delivery_location,
            delivery_city: model.delivery_city,
            delivery_state: model.delivery_state,
            recommended_source: model.recommended_source,
            recommendation_explanation: model.recommendation_explanation,
            requested_delivery_date: model.requested_delivery_date,
            estimated_delivery_date: model.estimated_delivery_date,
            dealer_notes: model.dealer_notes,
            procurement_notes: model.procurement_notes,
            confirmed_at: model.confirmed_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "660e8400-e29b-41d4-a716-446655440000",
    "quantity": 120,
    "delivery_location": "Av. Paulista 1000, Sao Paulo",
    "delivery_city": "Sao Paulo",
    "delivery_state": "SP"
}))]
pub struct CreateRequestBody {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1))]
    pub delivery_location: String,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub dealer_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmBody {
    /// `confirm`, `send_to_procurement` or `cancel`.
    pub action: ConfirmAction,
}

fn require_dealer_visibility(
    actor: &Actor,
    request: &product_request::Model,
) -> Result<(), ServiceError> {
    if actor.role == Role::Dealer && request.dealer_id != actor.user_id {
        return Err(ServiceError::Forbidden(
            "dealers may only access their own requests".into(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = CreateRequestBody,
    responses(
        (status = 200, description = "Request created", body = ApiResponse<RequestSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateRequestBody>,
) -> ApiResult<RequestSummary> {
    actor.require(Role::Dealer)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = CreateRequestInput {
        product_id: payload.product_id,
        quantity: payload.quantity,
        delivery_location: payload.delivery_location,
        delivery_city: payload.delivery_city,
        delivery_state: payload.delivery_state,
        requested_delivery_date: payload.requested_delivery_date,
        dealer_notes: payload.dealer_notes,
    };
    let created = state.services.requests.create(actor.user_id, input).await?;
    Ok(Json(ApiResponse::success(RequestSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "Requests listed", body = ApiResponse<Vec<RequestSummary>>)
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<Vec<RequestSummary>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(RequestStatus::from_str(s).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown status filter '{}'", s))
        })?),
        None => None,
    };
    let dealer_id = if actor.role == Role::Dealer {
        Some(actor.user_id)
    } else {
        query.dealer_id
    };

    let requests = state.services.requests.list(dealer_id, status).await?;
    Ok(Json(ApiResponse::success(
        requests.into_iter().map(RequestSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request fetched", body = ApiResponse<RequestSummary>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestSummary> {
    let request = state.services.requests.get(id).await?;
    require_dealer_visibility(&actor, &request)?;
    Ok(Json(ApiResponse::success(RequestSummary::from(request))))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/:id/recommendation",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Sourcing plan computed", body = ApiResponse<SourcingRecommendation>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn get_recommendation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<SourcingRecommendation> {
    actor.require_any(&[Role::Dealer, Role::Procurement])?;
    let request = state.services.requests.get(id).await?;
    require_dealer_visibility(&actor, &request)?;

    let plan = state.services.requests.recommendation(id).await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/confirm",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ConfirmBody,
    responses(
        (status = 200, description = "Decision applied", body = ApiResponse<RequestSummary>),
        (status = 409, description = "Not awaiting a decision", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn confirm_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmBody>,
) -> ApiResult<RequestSummary> {
    actor.require(Role::Dealer)?;
    let request = state.services.requests.get(id).await?;
    require_dealer_visibility(&actor, &request)?;

    let updated = state.services.requests.confirm(id, payload.action).await?;
    Ok(Json(ApiResponse::success(RequestSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/start-picking",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Picking started", body = ApiResponse<RequestSummary>),
        (status = 409, description = "Request is not RESERVED", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn start_picking(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestSummary> {
    actor.require(Role::Warehouse)?;
    let updated = state.services.requests.start_picking(id).await?;
    Ok(Json(ApiResponse::success(RequestSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/:id/cancel",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request cancelled, holds released", body = ApiResponse<RequestSummary>),
        (status = 409, description = "Cancellation not allowed from current status", body = crate::errors::ErrorResponse)
    ),
    tag = "requests"
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<RequestSummary> {
    actor.require_any(&[Role::Dealer, Role::Procurement])?;
    let request = state.services.requests.get(id).await?;
    require_dealer_visibility(&actor, &request)?;

    let updated = state.services.requests.cancel_with_release(id).await?;
    Ok(Json(ApiResponse::success(RequestSummary::from(updated))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/stale",
    responses(
        (status = 200, description = "Requests stalled beyond the configured windows", body = ApiResponse<Vec<StaleEntry>>)
    ),
    tag = "reports"
)]
pub async fn stale_report(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Vec<StaleEntry>> {
    actor.require_any(&[Role::Procurement, Role::Logistics])?;
    let entries = state.services.requests.stale_report().await?;
    Ok(Json(ApiResponse::success(entries)))
}
