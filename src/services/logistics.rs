//! Logistics handoff: shipment allocation, dispatch and receipt.
//!
//! Receipt of the last shipment completes the request and converts each
//! remaining warehouse hold into a permanent stock deduction, exactly once.

use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::product_request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::reservation::{self, Entity as ReservationEntity, Lifecycle, SourceRef};
use crate::entities::shipment::{self, Entity as ShipmentEntity, ShipmentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::inventory::commit_stock_line;
use crate::services::requests::{apply_status, emit, is_valid_transition};

fn generate_tracking_number() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("SHP-{}", suffix)
}

#[derive(Clone)]
pub struct LogisticsService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl LogisticsService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Requests whose sources have all settled and await a shipment plan.
    pub async fn ready_requests(&self) -> Result<Vec<product_request::Model>, ServiceError> {
        let requests = RequestEntity::find()
            .filter(
                product_request::Column::Status.eq(RequestStatus::ReadyForAllocation.as_str()),
            )
            .order_by_asc(product_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(requests)
    }

    pub async fn shipments_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<shipment::Model>, ServiceError> {
        let shipments = ShipmentEntity::find()
            .filter(shipment::Column::RequestId.eq(request_id))
            .order_by_asc(shipment::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(shipments)
    }

    async fn get_shipment(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {} not found", shipment_id)))
    }

    /// Creates one shipment per active reservation and moves the request to
    /// ALLOCATED. Only valid from READY_FOR_ALLOCATION.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        request_id: Uuid,
        carrier: Option<String>,
    ) -> Result<Vec<shipment::Model>, ServiceError> {
        let request = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {} not found", request_id)))?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if status != RequestStatus::ReadyForAllocation {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "allocate",
            ));
        }

        let txn = self.db.begin().await?;

        let reservations = ReservationEntity::find()
            .filter(reservation::Column::RequestId.eq(request_id))
            .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
            .all(&txn)
            .await?;
        if reservations.is_empty() {
            return Err(ServiceError::ConsistencyViolation(format!(
                "request {} is ready for allocation but has no active reservations",
                request_id
            )));
        }

        let mut shipments = Vec::with_capacity(reservations.len());
        for res in &reservations {
            let model = shipment::ActiveModel {
                request_id: Set(request_id),
                reservation_id: Set(res.id),
                source_type: Set(res.source_type.clone()),
                source_id: Set(res.source_id),
                quantity: Set(res.quantity),
                status: Set(ShipmentStatus::Confirmed.as_str().to_string()),
                carrier: Set(carrier.clone()),
                tracking_number: Set(generate_tracking_number()),
                delivery_address: Set(Some(request.delivery_location.clone())),
                delivery_city: Set(request.delivery_city.clone()),
                delivery_state: Set(request.delivery_state.clone()),
                ..Default::default()
            };
            shipments.push(model.insert(&txn).await?);
        }

        apply_status(&txn, &request, RequestStatus::Allocated).await?;

        txn.commit().await?;

        info!(%request_id, count = shipments.len(), "shipments allocated");
        for s in &shipments {
            emit(
                &self.event_sender,
                Event::ShipmentAllocated {
                    request_id,
                    shipment_id: s.id,
                },
            )
            .await;
        }

        Ok(shipments)
    }

    /// CONFIRMED → DISPATCHED. When every shipment of the request has left,
    /// the request moves to IN_TRANSIT.
    #[instrument(skip(self))]
    pub async fn dispatch(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        self.advance(shipment_id, ShipmentStatus::Dispatched).await
    }

    /// Applies a carrier status update, validating the forward-only
    /// progression. Receipt of the last shipment completes the request.
    #[instrument(skip(self))]
    pub async fn advance(
        &self,
        shipment_id: Uuid,
        new_status: ShipmentStatus,
    ) -> Result<shipment::Model, ServiceError> {
        let shp = self.get_shipment(shipment_id).await?;
        let current = shp.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "shipment {} carries unknown status '{}'",
                shipment_id, shp.status
            ))
        })?;
        if !current.is_valid_transition(new_status) {
            return Err(ServiceError::invalid_transition(
                "shipment",
                current.as_str(),
                new_status.as_str(),
            ));
        }

        let now = Utc::now();
        let mut active: shipment::ActiveModel = shp.clone().into();
        active.status = Set(new_status.as_str().to_string());
        match new_status {
            ShipmentStatus::Dispatched => active.dispatch_date = Set(Some(now)),
            ShipmentStatus::Delivered | ShipmentStatus::Received => {
                if shp.delivery_date.is_none() {
                    active.delivery_date = Set(Some(now));
                }
            }
            _ => {}
        }
        let updated = active.update(&*self.db).await?;

        match new_status {
            ShipmentStatus::Dispatched => {
                metrics::SHIPMENTS_DISPATCHED.inc();
                emit(&self.event_sender, Event::ShipmentDispatched { shipment_id }).await;
                self.maybe_mark_in_transit(shp.request_id).await?;
            }
            ShipmentStatus::Received => {
                emit(&self.event_sender, Event::ShipmentReceived { shipment_id }).await;
                self.maybe_complete_request(shp.request_id).await?;
            }
            _ => {}
        }

        Ok(updated)
    }

    async fn maybe_mark_in_transit(&self, request_id: Uuid) -> Result<(), ServiceError> {
        let shipments = self.shipments_for_request(request_id).await?;
        let all_moving = shipments.iter().all(|s| {
            !matches!(s.status(), Some(ShipmentStatus::Confirmed))
        });
        if !all_moving {
            return Ok(());
        }

        let request = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {} not found", request_id)))?;
        if request.status() == Some(RequestStatus::Allocated)
            && is_valid_transition(RequestStatus::Allocated, RequestStatus::InTransit)
        {
            apply_status(&*self.db, &request, RequestStatus::InTransit).await?;
            info!(%request_id, "all shipments dispatched, request in transit");
        }
        Ok(())
    }

    /// When the last shipment is received: COMPLETED, and every remaining
    /// active warehouse hold is committed (on-hand and reserved both drop).
    /// Retiring the reservations in the same transaction guarantees the
    /// commit can never run twice.
    async fn maybe_complete_request(&self, request_id: Uuid) -> Result<(), ServiceError> {
        let shipments = self.shipments_for_request(request_id).await?;
        let all_received = shipments
            .iter()
            .all(|s| s.status() == Some(ShipmentStatus::Received));
        if !all_received {
            return Ok(());
        }

        let request = RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {} not found", request_id)))?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if status == RequestStatus::Completed {
            return Ok(());
        }
        if status != RequestStatus::InTransit {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "complete",
            ));
        }

        let txn = self.db.begin().await?;

        let reservations = ReservationEntity::find()
            .filter(reservation::Column::RequestId.eq(request_id))
            .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
            .all(&txn)
            .await?;

        for res in &reservations {
            if let Some(SourceRef::Warehouse(warehouse_id)) = res.source() {
                commit_stock_line(&txn, warehouse_id, request.product_id, res.quantity).await?;
                emit(
                    &self.event_sender,
                    Event::StockCommitted {
                        warehouse_id,
                        product_id: request.product_id,
                        quantity: res.quantity,
                    },
                )
                .await;
            }
            let result = ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Lifecycle,
                    Expr::value(Lifecycle::Retired.as_str()),
                )
                .col_expr(
                    reservation::Column::Version,
                    Expr::col(reservation::Column::Version).add(1),
                )
                .col_expr(
                    reservation::Column::UpdatedAt,
                    Expr::value(Some(Utc::now())),
                )
                .filter(reservation::Column::Id.eq(res.id))
                .filter(reservation::Column::Version.eq(res.version))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(res.id));
            }
        }

        let now = Utc::now();
        let result = RequestEntity::update_many()
            .col_expr(
                product_request::Column::Status,
                Expr::value(RequestStatus::Completed.as_str()),
            )
            .col_expr(product_request::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(
                product_request::Column::Version,
                Expr::col(product_request::Column::Version).add(1),
            )
            .col_expr(product_request::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(product_request::Column::Id.eq(request_id))
            .filter(product_request::Column::Version.eq(request.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(request_id));
        }

        txn.commit().await?;

        info!(%request_id, "all shipments received, request completed");
        emit(&self.event_sender, Event::RequestCompleted(request_id)).await;

        Ok(())
    }
}
