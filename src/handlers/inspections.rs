use crate::{
    auth::{Actor, Role},
    entities::inspection_image,
    errors::ServiceError,
    services::inspection::{ClassifierVerdict, SubmitInspectionInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct InspectionImageSummary {
    pub id: Uuid,
    pub request_id: Uuid,
    pub reservation_id: Uuid,
    pub uploaded_by: Uuid,
    pub filename: String,
    pub image_type: String,
    /// Raw classifier verdict; never mutated by overrides.
    pub result: String,
    /// Verdict after any manual override.
    pub effective_result: String,
    pub confidence_score: Option<Decimal>,
    pub damage_detected: bool,
    pub damage_type: Option<String>,
    pub damage_severity: Option<String>,
    pub expiry_detected: bool,
    pub is_expired: bool,
    pub seal_intact: Option<bool>,
    pub spoilage_detected: bool,
    pub overridden: bool,
    pub override_result: Option<String>,
    pub override_reason: Option<String>,
    pub overridden_by: Option<Uuid>,
    pub overridden_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<inspection_image::Model> for InspectionImageSummary {
    fn from(model: inspection_image::Model) -> Self {
        let effective_result = model.effective_result().to_string();
        Self {
            id: model.id,
            request_id: model.request_id,
            reservation_id: model.reservation_id,
            uploaded_by: model.uploaded_by,
            filename: model.filename,
            image_type: model.image_type,
            result: model.result,
            effective_result,
            confidence_score: model.confidence_score,
            damage_detected: model.damage_detected,
            damage_type: model.damage_type,
            damage_severity: model.damage_severity,
            expiry_detected: model.expiry_detected,
            is_expired: model.is_expired,
            seal_intact: model.seal_intact,
            spoilage_detected: model.spoilage_detected,
            overridden: model.overridden,
            override_result: model.override_result,
            override_reason: model.override_reason,
            overridden_by: model.overridden_by,
            overridden_at: model.overridden_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "reservation_id": "770e8400-e29b-41d4-a716-446655440000",
    "filename": "pallet-03.jpg",
    "image_type": "pallet",
    "verdict": {
        "result": "OK",
        "confidence_score": "92.5",
        "damage_detected": false
    }
}))]
pub struct SubmitInspectionBody {
    pub reservation_id: Uuid,
    #[validate(length(min = 1))]
    pub filename: String,
    #[validate(length(min = 1))]
    pub image_type: String,
    pub verdict: ClassifierVerdict,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OverrideBody {
    /// OK, DAMAGED or EXPIRED.
    #[validate(length(min = 1))]
    pub result: String,
    /// Mandatory audit justification.
    #[validate(length(min = 1))]
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/inspections",
    request_body = SubmitInspectionBody,
    responses(
        (status = 200, description = "Inspection recorded and verdict applied", body = ApiResponse<InspectionImageSummary>),
        (status = 502, description = "Classifier failed; image recorded, source left in AI_PROCESSING", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn submit_inspection(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<SubmitInspectionBody>,
) -> ApiResult<InspectionImageSummary> {
    actor.require(Role::Warehouse)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = SubmitInspectionInput {
        reservation_id: payload.reservation_id,
        filename: payload.filename,
        image_type: payload.image_type,
        verdict: payload.verdict,
    };
    let image = state.services.inspections.submit(actor.user_id, input).await?;
    Ok(Json(ApiResponse::success(InspectionImageSummary::from(
        image,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspections/request/:id",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Inspection history for the request", body = ApiResponse<Vec<InspectionImageSummary>>)
    ),
    tag = "inspections"
)]
pub async fn list_for_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<InspectionImageSummary>> {
    actor.require_any(&[Role::Warehouse, Role::Procurement, Role::Dealer])?;
    let images = state.services.inspections.list_for_request(id).await?;
    Ok(Json(ApiResponse::success(
        images
            .into_iter()
            .map(InspectionImageSummary::from)
            .collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/inspections/:id/override",
    params(("id" = Uuid, Path, description = "Inspection image ID")),
    request_body = OverrideBody,
    responses(
        (status = 200, description = "Verdict overridden", body = ApiResponse<InspectionImageSummary>),
        (status = 400, description = "Conflicting or invalid override", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn override_result(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<OverrideBody>,
) -> ApiResult<InspectionImageSummary> {
    actor.require(Role::Procurement)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let image = state
        .services
        .inspections
        .override_result(id, actor.user_id, &payload.result, &payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(InspectionImageSummary::from(
        image,
    ))))
}
