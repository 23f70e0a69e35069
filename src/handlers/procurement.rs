use crate::{
    auth::{Actor, Role},
    handlers::requests::RequestSummary,
    services::procurement::{ResolveAction, ResolveInput},
    services::sourcing::SourcingRecommendation,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "action": "replace",
    "reservation_id": "770e8400-e29b-41d4-a716-446655440000",
    "source_id": "880e8400-e29b-41d4-a716-446655440000",
    "quantity": 40,
    "notes": "water damage on outer pallet"
}))]
pub struct ResolveBody {
    /// approve | replace | import | accept | reject | request_reupload.
    pub action: ResolveAction,
    /// Blocked reservation the remedy targets; optional when exactly one
    /// reservation is blocked.
    pub reservation_id: Option<Uuid>,
    /// Replacement warehouse (`replace`) or supplier (`import`).
    pub source_id: Option<Uuid>,
    /// Remedy quantity; defaults to the full blocked quantity.
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/procurement/pending",
    responses(
        (status = 200, description = "Requests needing a procurement decision", body = ApiResponse<Vec<RequestSummary>>)
    ),
    tag = "procurement"
)]
pub async fn pending(State(state): State<AppState>, actor: Actor) -> ApiResult<Vec<RequestSummary>> {
    actor.require(Role::Procurement)?;
    let requests = state.services.procurement.pending().await?;
    Ok(Json(ApiResponse::success(
        requests.into_iter().map(RequestSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/procurement/replacement-options/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Planner re-run scoped to the blocked quantity", body = ApiResponse<SourcingRecommendation>),
        (status = 400, description = "Nothing is blocked on this request", body = crate::errors::ErrorResponse)
    ),
    tag = "procurement"
)]
pub async fn replacement_options(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<SourcingRecommendation> {
    actor.require(Role::Procurement)?;
    let plan = state.services.procurement.replacement_options(id).await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[utoipa::path(
    post,
    path = "/api/v1/procurement/resolve/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = ResolveBody,
    responses(
        (status = 200, description = "Remedy applied", body = ApiResponse<RequestSummary>),
        (status = 409, description = "Request is not in a resolvable state", body = crate::errors::ErrorResponse)
    ),
    tag = "procurement"
)]
pub async fn resolve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveBody>,
) -> ApiResult<RequestSummary> {
    actor.require(Role::Procurement)?;
    let input = ResolveInput {
        action: payload.action,
        reservation_id: payload.reservation_id,
        source_id: payload.source_id,
        quantity: payload.quantity,
        notes: payload.notes,
    };
    let updated = state.services.procurement.resolve(id, input).await?;
    Ok(Json(ApiResponse::success(RequestSummary::from(updated))))
}
