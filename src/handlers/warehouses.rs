use crate::{
    auth::{Actor, Role},
    entities::warehouse::{self, Entity as WarehouseEntity},
    entities::warehouse_stock,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub address: Option<String>,
    pub is_active: bool,
}

impl From<warehouse::Model> for WarehouseSummary {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            city: model.city,
            state: model.state,
            country: model.country,
            address: model.address,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLineSummary {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    /// Physical on-hand quantity.
    pub quantity: i32,
    /// Quantity held by active reservations.
    pub reserved_quantity: i32,
    /// quantity - reserved_quantity.
    pub available: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub location_code: Option<String>,
}

impl From<warehouse_stock::Model> for StockLineSummary {
    fn from(model: warehouse_stock::Model) -> Self {
        let available = model.available();
        Self {
            id: model.id,
            warehouse_id: model.warehouse_id,
            product_id: model.product_id,
            quantity: model.quantity,
            reserved_quantity: model.reserved_quantity,
            available,
            batch_number: model.batch_number,
            expiry_date: model.expiry_date,
            location_code: model.location_code,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveStockBody {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub location_code: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    responses(
        (status = 200, description = "Active warehouses", body = ApiResponse<Vec<WarehouseSummary>>)
    ),
    tag = "warehouses"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<Vec<WarehouseSummary>> {
    let warehouses = WarehouseEntity::find()
        .filter(warehouse::Column::IsActive.eq(true))
        .order_by_asc(warehouse::Column::Code)
        .all(&*state.db)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ApiResponse::success(
        warehouses.into_iter().map(WarehouseSummary::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouses/:id/stock",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Stock lines with availability", body = ApiResponse<Vec<StockLineSummary>>)
    ),
    tag = "warehouses"
)]
pub async fn warehouse_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<StockLineSummary>> {
    actor.require_any(&[Role::Warehouse, Role::Procurement, Role::Logistics])?;
    let lines = state.services.inventory.stock_for_warehouse(id).await?;
    Ok(Json(ApiResponse::success(
        lines.into_iter().map(StockLineSummary::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouses/:id/stock",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = ReceiveStockBody,
    responses(
        (status = 200, description = "Stock received", body = ApiResponse<StockLineSummary>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouses"
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveStockBody>,
) -> ApiResult<StockLineSummary> {
    actor.require(Role::Warehouse)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let line = state
        .services
        .inventory
        .receive_stock(
            id,
            payload.product_id,
            payload.quantity,
            payload.batch_number,
            payload.expiry_date,
            payload.location_code,
        )
        .await?;
    Ok(Json(ApiResponse::success(StockLineSummary::from(line))))
}
