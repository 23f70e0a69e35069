//! Warehouse stock ledger.
//!
//! Every quantity change goes through a single conditional UPDATE so two
//! callers can never both pass an availability check and overdraw a stock
//! line. There is deliberately no read-then-write path here.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::warehouse_stock::{self, Entity as StockLineEntity};
use crate::errors::ServiceError;
use crate::metrics;

/// Places a hold of `qty` units on the (warehouse, product) stock line.
///
/// Succeeds only if `quantity - reserved_quantity >= qty` at the moment the
/// database applies the update; otherwise nothing is deducted and
/// `InsufficientStock` is returned.
pub async fn reserve_stock_line<C: ConnectionTrait>(
    db: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: i32,
) -> Result<(), ServiceError> {
    if qty <= 0 {
        return Err(ServiceError::ValidationError(
            "reservation quantity must be positive".into(),
        ));
    }

    let result = StockLineEntity::update_many()
        .col_expr(
            warehouse_stock::Column::ReservedQuantity,
            Expr::col(warehouse_stock::Column::ReservedQuantity).add(qty),
        )
        .col_expr(
            warehouse_stock::Column::UpdatedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(
            Expr::col(warehouse_stock::Column::Quantity)
                .sub(Expr::col(warehouse_stock::Column::ReservedQuantity))
                .gte(qty),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        metrics::RESERVATION_FAILURES
            .with_label_values(&["insufficient_stock"])
            .inc();
        return Err(ServiceError::InsufficientStock(format!(
            "cannot reserve {} units of product {} at warehouse {}",
            qty, product_id, warehouse_id
        )));
    }

    Ok(())
}

/// Releases a previously placed hold. The hold must exist: releasing more
/// than is reserved means the ledger and the reservations disagree, which is
/// a consistency violation, not a user error.
pub async fn release_stock_line<C: ConnectionTrait>(
    db: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: i32,
) -> Result<(), ServiceError> {
    if qty <= 0 {
        return Err(ServiceError::ValidationError(
            "release quantity must be positive".into(),
        ));
    }

    let result = StockLineEntity::update_many()
        .col_expr(
            warehouse_stock::Column::ReservedQuantity,
            Expr::col(warehouse_stock::Column::ReservedQuantity).sub(qty),
        )
        .col_expr(
            warehouse_stock::Column::UpdatedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::ReservedQuantity.gte(qty))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConsistencyViolation(format!(
            "attempted to release {} units of product {} at warehouse {} but the hold does not exist",
            qty, product_id, warehouse_id
        )));
    }

    Ok(())
}

/// Converts a hold into a permanent deduction when goods ship: both on-hand
/// and reserved quantities drop by `qty`, conditional on both sufficing.
pub async fn commit_stock_line<C: ConnectionTrait>(
    db: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    qty: i32,
) -> Result<(), ServiceError> {
    if qty <= 0 {
        return Err(ServiceError::ValidationError(
            "commit quantity must be positive".into(),
        ));
    }

    let result = StockLineEntity::update_many()
        .col_expr(
            warehouse_stock::Column::Quantity,
            Expr::col(warehouse_stock::Column::Quantity).sub(qty),
        )
        .col_expr(
            warehouse_stock::Column::ReservedQuantity,
            Expr::col(warehouse_stock::Column::ReservedQuantity).sub(qty),
        )
        .col_expr(
            warehouse_stock::Column::UpdatedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::Quantity.gte(qty))
        .filter(warehouse_stock::Column::ReservedQuantity.gte(qty))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConsistencyViolation(format!(
            "attempted to commit {} units of product {} at warehouse {} without a matching hold",
            qty, product_id, warehouse_id
        )));
    }

    metrics::STOCK_COMMITTED_UNITS.inc_by(qty as u64);

    Ok(())
}

/// Catalog-side stock management: listing warehouse stock and receiving new
/// stock into a line. Reservation arithmetic lives in the free functions
/// above so it can run inside any transaction.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn stock_for_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<warehouse_stock::Model>, ServiceError> {
        let lines = StockLineEntity::find()
            .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(warehouse_stock::Column::ProductId)
            .all(&*self.db)
            .await?;
        Ok(lines)
    }

    /// Receives stock into a warehouse, creating the line if it does not
    /// exist yet.
    #[instrument(skip(self))]
    pub async fn receive_stock(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        qty: i32,
        batch_number: Option<String>,
        expiry_date: Option<NaiveDate>,
        location_code: Option<String>,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        if qty <= 0 {
            return Err(ServiceError::ValidationError(
                "received quantity must be positive".into(),
            ));
        }

        let existing = StockLineEntity::find()
            .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_stock::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        let line = match existing {
            Some(line) => {
                let line_id = line.id;
                let result = StockLineEntity::update_many()
                    .col_expr(
                        warehouse_stock::Column::Quantity,
                        Expr::col(warehouse_stock::Column::Quantity).add(qty),
                    )
                    .col_expr(
                        warehouse_stock::Column::UpdatedAt,
                        Expr::value(Some(Utc::now())),
                    )
                    .filter(warehouse_stock::Column::Id.eq(line_id))
                    .exec(&*self.db)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(ServiceError::NotFound(format!(
                        "stock line {} disappeared during receive",
                        line_id
                    )));
                }
                StockLineEntity::find_by_id(line_id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("stock line {} not found", line_id))
                    })?
            }
            None => {
                let model = warehouse_stock::ActiveModel {
                    warehouse_id: Set(warehouse_id),
                    product_id: Set(product_id),
                    quantity: Set(qty),
                    reserved_quantity: Set(0),
                    batch_number: Set(batch_number),
                    expiry_date: Set(expiry_date),
                    location_code: Set(location_code),
                    ..Default::default()
                };
                model.insert(&*self.db).await?
            }
        };

        info!(%warehouse_id, %product_id, qty, "stock received");
        Ok(line)
    }
}
