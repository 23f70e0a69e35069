//! Reservation lifecycle: plan materialization and the per-source
//! sub-state machine (pick, supplier confirmation, manual ready override).
//!
//! Reservations are never deleted. Remedies supersede them; cancellation
//! retires them; both keep the audit trail intact.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::product_request;
use crate::entities::reservation::{
    self, Entity as ReservationEntity, ReservationStatus, SourceRef,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::inventory::reserve_stock_line;
use crate::services::requests::{emit, recompute_request_status};
use crate::services::sourcing::SourcingRecommendation;

/// Turns an accepted plan into reservations inside the caller's transaction.
/// Warehouse allocations place their stock hold atomically here; supplier
/// allocations start as SUPPLIER_PENDING and are confirmed asynchronously.
pub async fn materialize_plan<C: ConnectionTrait>(
    db: &C,
    request: &product_request::Model,
    plan: &SourcingRecommendation,
) -> Result<Vec<reservation::Model>, ServiceError> {
    let mut created = Vec::with_capacity(plan.allocations.len());

    for allocation in &plan.allocations {
        let (status, source) = match allocation.source {
            SourceRef::Warehouse(warehouse_id) => {
                reserve_stock_line(db, warehouse_id, request.product_id, allocation.quantity)
                    .await?;
                (ReservationStatus::Pending, allocation.source)
            }
            SourceRef::Supplier(_) => (ReservationStatus::SupplierPending, allocation.source),
        };

        let model = reservation::ActiveModel {
            request_id: Set(request.id),
            source_type: Set(source.type_str().to_string()),
            source_id: Set(source.id()),
            quantity: Set(allocation.quantity),
            status: Set(status.as_str().to_string()),
            is_blocked: Set(false),
            is_picked: Set(false),
            is_replacement: Set(false),
            ..Default::default()
        };
        let inserted = model.insert(db).await?;
        metrics::RESERVATIONS_CREATED.inc();
        created.push(inserted);
    }

    Ok(created)
}

#[derive(Clone)]
pub struct ReservationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReservationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get(&self, reservation_id: Uuid) -> Result<reservation::Model, ServiceError> {
        ReservationEntity::find_by_id(reservation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("reservation {} not found", reservation_id))
            })
    }

    pub async fn list_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let reservations = ReservationEntity::find()
            .filter(reservation::Column::RequestId.eq(request_id))
            .order_by_asc(reservation::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(reservations)
    }

    fn require_active(res: &reservation::Model, action: &str) -> Result<(), ServiceError> {
        if !res.is_active() {
            return Err(ServiceError::invalid_transition(
                "reservation",
                &res.lifecycle,
                action,
            ));
        }
        Ok(())
    }

    /// Marks a warehouse reservation as physically pulled from the shelf.
    #[instrument(skip(self))]
    pub async fn pick(
        &self,
        reservation_id: Uuid,
        picked_by: Uuid,
    ) -> Result<reservation::Model, ServiceError> {
        let res = self.get(reservation_id).await?;
        Self::require_active(&res, "pick")?;

        if res.is_blocked {
            return Err(ServiceError::invalid_transition(
                "reservation",
                "BLOCKED",
                "pick",
            ));
        }
        match res.source() {
            Some(SourceRef::Warehouse(_)) => {}
            _ => {
                return Err(ServiceError::InvalidOperation(
                    "only warehouse reservations are picked".into(),
                ))
            }
        }
        if res.status() != Some(ReservationStatus::Pending) {
            return Err(ServiceError::invalid_transition(
                "reservation",
                &res.status,
                "pick",
            ));
        }

        let now = Utc::now();
        let result = ReservationEntity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(ReservationStatus::Picked.as_str()),
            )
            .col_expr(reservation::Column::IsPicked, Expr::value(true))
            .col_expr(reservation::Column::PickedAt, Expr::value(Some(now)))
            .col_expr(reservation::Column::PickedBy, Expr::value(Some(picked_by)))
            .col_expr(
                reservation::Column::Version,
                Expr::col(reservation::Column::Version).add(1),
            )
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(reservation::Column::Id.eq(reservation_id))
            .filter(reservation::Column::Version.eq(res.version))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(reservation_id));
        }

        info!(%reservation_id, %picked_by, "reservation picked");
        emit(&self.event_sender, Event::ItemPicked { reservation_id }).await;
        recompute_request_status(&self.db, &self.event_sender, res.request_id).await?;

        self.get(reservation_id).await
    }

    /// Asynchronous supplier acknowledgement: SUPPLIER_PENDING →
    /// SUPPLIER_CONFIRMED. Nothing ever blocks waiting for this.
    #[instrument(skip(self))]
    pub async fn confirm_supplier(
        &self,
        reservation_id: Uuid,
    ) -> Result<reservation::Model, ServiceError> {
        let res = self.get(reservation_id).await?;
        Self::require_active(&res, "supplier_confirm")?;

        if res.status() != Some(ReservationStatus::SupplierPending) {
            return Err(ServiceError::invalid_transition(
                "reservation",
                &res.status,
                "supplier_confirm",
            ));
        }

        let result = ReservationEntity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(ReservationStatus::SupplierConfirmed.as_str()),
            )
            .col_expr(
                reservation::Column::Version,
                Expr::col(reservation::Column::Version).add(1),
            )
            .col_expr(
                reservation::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(reservation::Column::Id.eq(reservation_id))
            .filter(reservation::Column::Version.eq(res.version))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(reservation_id));
        }

        info!(%reservation_id, "supplier confirmed availability");
        emit(&self.event_sender, Event::SupplierConfirmed { reservation_id }).await;
        recompute_request_status(&self.db, &self.event_sender, res.request_id).await?;

        self.get(reservation_id).await
    }

    /// Manual escape hatch: force a source to READY. Audit-logged via the
    /// resolution notes; use is expected to be rare.
    #[instrument(skip(self, note))]
    pub async fn mark_ready(
        &self,
        reservation_id: Uuid,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<reservation::Model, ServiceError> {
        let res = self.get(reservation_id).await?;
        Self::require_active(&res, "mark_ready")?;

        let status = res.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "reservation {} carries unknown status '{}'",
                reservation_id, res.status
            ))
        })?;
        if status == ReservationStatus::Cancelled {
            return Err(ServiceError::invalid_transition(
                "reservation",
                &res.status,
                "mark_ready",
            ));
        }
        if res.is_ready() {
            return Ok(res);
        }

        let audit = format!(
            "manually marked ready by {}{}",
            actor_id,
            note.as_deref()
                .map(|n| format!(": {}", n))
                .unwrap_or_default()
        );
        let result = ReservationEntity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(ReservationStatus::Ready.as_str()),
            )
            .col_expr(reservation::Column::IsBlocked, Expr::value(false))
            .col_expr(
                reservation::Column::BlockReason,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                reservation::Column::ResolutionNotes,
                Expr::value(Some(audit)),
            )
            .col_expr(
                reservation::Column::Version,
                Expr::col(reservation::Column::Version).add(1),
            )
            .col_expr(
                reservation::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(reservation::Column::Id.eq(reservation_id))
            .filter(reservation::Column::Version.eq(res.version))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(reservation_id));
        }

        info!(%reservation_id, %actor_id, "reservation manually marked ready");
        emit(&self.event_sender, Event::SourceMarkedReady { reservation_id }).await;
        recompute_request_status(&self.db, &self.event_sender, res.request_id).await?;

        self.get(reservation_id).await
    }
}
