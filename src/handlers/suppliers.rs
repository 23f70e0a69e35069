use crate::{
    auth::{Actor, Role},
    entities::supplier::{self, Entity as SupplierEntity},
    entities::supplier_stock::{self, Entity as SupplierStockEntity},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub country: String,
    pub city: Option<String>,
    pub lead_time_days: i32,
    /// 0-100; higher sorts first in the planner.
    pub reliability_score: Decimal,
    pub is_active: bool,
}

impl From<supplier::Model> for SupplierSummary {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            country: model.country,
            city: model.city,
            lead_time_days: model.lead_time_days,
            reliability_score: model.reliability_score,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierLineSummary {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub available_quantity: i32,
    pub min_order_quantity: i32,
    pub unit_price: Decimal,
    pub currency: String,
    /// Line override if set, otherwise the supplier default.
    pub lead_time_days: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses(
        (status = 200, description = "Active suppliers", body = ApiResponse<Vec<SupplierSummary>>)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Vec<SupplierSummary>> {
    actor.require_any(&[Role::Procurement, Role::Logistics, Role::Supplier])?;
    let suppliers = SupplierEntity::find()
        .filter(supplier::Column::IsActive.eq(true))
        .order_by_asc(supplier::Column::Code)
        .all(&*state.db)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success(
        suppliers.into_iter().map(SupplierSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/:id/lines",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Catalog lines with effective lead times", body = ApiResponse<Vec<SupplierLineSummary>>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn supplier_lines(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<SupplierLineSummary>> {
    actor.require_any(&[Role::Procurement, Role::Supplier])?;
    let supplier = SupplierEntity::find_by_id(id)
        .one(&*state.db)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ServiceError::NotFound(format!("supplier {} not found", id)))?;

    let lines = SupplierStockEntity::find()
        .filter(supplier_stock::Column::SupplierId.eq(id))
        .order_by_asc(supplier_stock::Column::ProductId)
        .all(&*state.db)
        .await
        .map_err(ServiceError::from)?;

    let summaries = lines
        .into_iter()
        .map(|line| {
            let lead_time_days = line.effective_lead_time_days(supplier.lead_time_days);
            SupplierLineSummary {
                id: line.id,
                supplier_id: line.supplier_id,
                product_id: line.product_id,
                available_quantity: line.available_quantity,
                min_order_quantity: line.min_order_quantity,
                unit_price: line.unit_price,
                currency: line.currency,
                lead_time_days,
            }
        })
        .collect();
    Ok(Json(ApiResponse::success(summaries)))
}
