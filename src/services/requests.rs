//! Request state machine.
//!
//! Explicit transitions (create, confirm, start picking, allocate, …) are
//! validated against a transition table; everything between RESERVED and
//! READY_FOR_ALLOCATION is *derived* from the states of the request's active
//! reservations. The derivation is a pure function so it can never drift from
//! the reservations, no matter in which order concurrent updates land.

use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::StaleReportConfig;
use crate::entities::product_request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::reservation::{self, Entity as ReservationEntity, Lifecycle, ReservationStatus};
use crate::entities::{product, reservation::SourceRef};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::inventory::release_stock_line;
use crate::services::reservations::materialize_plan;
use crate::services::sourcing::{Destination, SourcingRecommendation, SourcingService};

/// Validates an explicit request-status transition. Derived statuses move
/// freely within the fulfillment phase; everything else is enumerated.
pub fn is_valid_transition(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;
    match (from, to) {
        (Pending, AwaitingRecommendation) | (Pending, Cancelled) => true,
        (AwaitingRecommendation, Reserved)
        | (AwaitingRecommendation, AwaitingProcurementApproval)
        | (AwaitingRecommendation, Cancelled) => true,
        (AwaitingProcurementApproval, Reserved) | (AwaitingProcurementApproval, Cancelled) => true,
        (ReadyForAllocation, Allocated) => true,
        (Allocated, InTransit) => true,
        (InTransit, Completed) => true,
        (f, Cancelled) if f.is_fulfillment_phase() => true,
        (f, t) if f.is_fulfillment_phase() && t.is_fulfillment_phase() => true,
        _ => false,
    }
}

/// The slice of reservation state the aggregate derivation looks at.
#[derive(Debug, Clone, Copy)]
pub struct ReservationView {
    pub status: ReservationStatus,
    pub is_blocked: bool,
    pub is_picked: bool,
}

impl From<&reservation::Model> for ReservationView {
    fn from(model: &reservation::Model) -> Self {
        Self {
            status: model.status().unwrap_or(ReservationStatus::Pending),
            is_blocked: model.is_blocked,
            is_picked: model.is_picked,
        }
    }
}

impl ReservationView {
    fn is_ready(&self) -> bool {
        !self.is_blocked && self.status.is_ready_equivalent()
    }
}

/// Derives the fulfillment-phase status from the active reservations.
///
/// Pure and order-independent: only aggregate predicates over the views are
/// used, so any interleaving of reservation updates converges to the same
/// request status.
pub fn derive_request_status(current: RequestStatus, views: &[ReservationView]) -> RequestStatus {
    if views.is_empty() {
        return current;
    }

    let blocked = views.iter().filter(|v| v.is_blocked).count();
    if blocked == views.len() {
        return RequestStatus::Blocked;
    }
    if blocked > 0 {
        return RequestStatus::PartiallyBlocked;
    }

    if views.iter().all(|v| v.is_ready()) {
        return RequestStatus::ReadyForAllocation;
    }

    // A remedy has settled part of the request while other sources are
    // still in flight.
    if views
        .iter()
        .any(|v| v.status == ReservationStatus::ProcurementResolved)
    {
        return RequestStatus::ResolvedPartial;
    }

    let any_waiting = views.iter().any(|v| {
        matches!(
            v.status,
            ReservationStatus::Pending | ReservationStatus::SupplierPending
        )
    });
    if any_waiting {
        let picking_started = current == RequestStatus::Picking || views.iter().any(|v| v.is_picked);
        if picking_started {
            RequestStatus::Picking
        } else {
            RequestStatus::Reserved
        }
    } else {
        RequestStatus::InspectionPending
    }
}

/// Applies a status change under optimistic versioning. Zero rows affected
/// means someone else moved the request first.
pub async fn apply_status<C: ConnectionTrait>(
    db: &C,
    request: &product_request::Model,
    new_status: RequestStatus,
) -> Result<(), ServiceError> {
    let result = RequestEntity::update_many()
        .col_expr(
            product_request::Column::Status,
            Expr::value(new_status.as_str()),
        )
        .col_expr(
            product_request::Column::Version,
            Expr::col(product_request::Column::Version).add(1),
        )
        .col_expr(
            product_request::Column::UpdatedAt,
            Expr::value(Some(Utc::now())),
        )
        .filter(product_request::Column::Id.eq(request.id))
        .filter(product_request::Column::Version.eq(request.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(request.id));
    }
    Ok(())
}

/// Recomputes the aggregate status of a request from its active
/// reservations. Runs after every reservation-level transition; no-op
/// outside the fulfillment phase. Retries internally on version conflicts.
pub async fn recompute_request_status(
    db: &DatabaseConnection,
    event_sender: &EventSender,
    request_id: Uuid,
) -> Result<(), ServiceError> {
    const MAX_ATTEMPTS: u32 = 3;

    for _attempt in 0..MAX_ATTEMPTS {
        let request = RequestEntity::find_by_id(request_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {} not found", request_id)))?;

        let current = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;

        if !current.is_fulfillment_phase() {
            return Ok(());
        }

        let views: Vec<ReservationView> = ReservationEntity::find()
            .filter(reservation::Column::RequestId.eq(request_id))
            .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
            .all(db)
            .await?
            .iter()
            .map(ReservationView::from)
            .collect();

        let derived = derive_request_status(current, &views);
        if derived == current {
            return Ok(());
        }

        match apply_status(db, &request, derived).await {
            Ok(()) => {
                info!(
                    %request_id,
                    from = current.as_str(),
                    to = derived.as_str(),
                    "request status derived"
                );
                emit(
                    event_sender,
                    Event::RequestStatusChanged {
                        request_id,
                        old_status: current.as_str().to_string(),
                        new_status: derived.as_str().to_string(),
                    },
                )
                .await;
                if derived == RequestStatus::ReadyForAllocation {
                    emit(event_sender, Event::RequestReadyForAllocation(request_id)).await;
                }
                return Ok(());
            }
            Err(ServiceError::ConcurrentModification(_)) => continue,
            Err(other) => return Err(other),
        }
    }

    Err(ServiceError::ConcurrentModification(request_id))
}

/// Verifies that the active reservations still cover exactly the planned
/// quantity. Called after every reservation-affecting mutation.
pub async fn assert_plan_integrity<C: ConnectionTrait>(
    db: &C,
    request: &product_request::Model,
) -> Result<(), ServiceError> {
    let Some(planned) = request.planned_quantity else {
        return Ok(());
    };

    let reservations = ReservationEntity::find()
        .filter(reservation::Column::RequestId.eq(request.id))
        .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
        .all(db)
        .await?;
    let total: i32 = reservations.iter().map(|r| r.quantity).sum();

    if total != planned {
        error!(
            request_id = %request.id,
            planned,
            total,
            "active reservations no longer cover the planned quantity"
        );
        return Err(ServiceError::ConsistencyViolation(format!(
            "request {}: active reservations cover {} of {} planned units",
            request.id, total, planned
        )));
    }
    Ok(())
}

/// Events are best-effort; a full channel must never roll back a committed
/// state change.
pub(crate) async fn emit(event_sender: &EventSender, event: Event) {
    if let Err(e) = event_sender.send(event).await {
        warn!(error = %e, "failed to emit event");
    }
}

fn generate_request_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("REQ-{}-{:06}", date, suffix)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateRequestInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub delivery_location: String,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub requested_delivery_date: Option<chrono::DateTime<Utc>>,
    pub dealer_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    Confirm,
    SendToProcurement,
    Cancel,
}

/// An entry in the stale-state report. Reporting only: nothing is
/// transitioned automatically.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaleEntry {
    pub request_id: Uuid,
    pub request_number: String,
    pub status: String,
    pub stalled_in: String,
    pub since: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct RequestService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    sourcing: SourcingService,
    stale_config: StaleReportConfig,
}

impl RequestService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        sourcing: SourcingService,
        stale_config: StaleReportConfig,
    ) -> Self {
        Self {
            db,
            event_sender,
            sourcing,
            stale_config,
        }
    }

    fn destination(request: &product_request::Model) -> Destination {
        Destination {
            city: request.delivery_city.clone(),
            state: request.delivery_state.clone(),
            country: None,
        }
    }

    pub async fn get(&self, request_id: Uuid) -> Result<product_request::Model, ServiceError> {
        RequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {} not found", request_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        dealer_id: Option<Uuid>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<product_request::Model>, ServiceError> {
        let mut query = RequestEntity::find();
        if let Some(dealer_id) = dealer_id {
            query = query.filter(product_request::Column::DealerId.eq(dealer_id));
        }
        if let Some(status) = status {
            query = query.filter(product_request::Column::Status.eq(status.as_str()));
        }
        let requests = query
            .order_by_desc(product_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(requests)
    }

    /// Creates a request and immediately attaches a sourcing recommendation.
    /// Nothing is reserved yet; the dealer decides on the plan later.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub async fn create(
        &self,
        dealer_id: Uuid,
        input: CreateRequestInput,
    ) -> Result<product_request::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".into(),
            ));
        }
        if input.delivery_location.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "delivery_location must not be empty".into(),
            ));
        }

        let db = &*self.db;
        let prod = product::Entity::find_by_id(input.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {} not found", input.product_id))
            })?;
        if input.quantity < prod.min_order_quantity {
            return Err(ServiceError::ValidationError(format!(
                "quantity {} is below the minimum order quantity {} for {}",
                input.quantity, prod.min_order_quantity, prod.sku
            )));
        }

        let dest = Destination {
            city: input.delivery_city.clone(),
            state: input.delivery_state.clone(),
            country: None,
        };
        let plan = self
            .sourcing
            .recommend(input.product_id, input.quantity, &dest)
            .await?;

        use sea_orm::{ActiveModelTrait, Set};
        let model = product_request::ActiveModel {
            request_number: Set(generate_request_number()),
            dealer_id: Set(dealer_id),
            product_id: Set(input.product_id),
            quantity: Set(input.quantity),
            planned_quantity: Set(None),
            delivery_location: Set(input.delivery_location),
            delivery_city: Set(input.delivery_city),
            delivery_state: Set(input.delivery_state),
            status: Set(RequestStatus::AwaitingRecommendation.as_str().to_string()),
            recommended_source: Set(plan.source_type.map(|s| s.as_str().to_string())),
            recommendation_explanation: Set(Some(plan.explanation.clone())),
            requested_delivery_date: Set(input.requested_delivery_date),
            dealer_notes: Set(input.dealer_notes),
            ..Default::default()
        };
        let created = model.insert(db).await?;

        metrics::REQUESTS_CREATED.inc();
        info!(request_id = %created.id, request_number = %created.request_number, "request created");
        emit(&self.event_sender, Event::RequestCreated(created.id)).await;
        emit(
            &self.event_sender,
            Event::PlanProposed {
                request_id: created.id,
                can_fulfill: plan.can_fulfill,
            },
        )
        .await;

        Ok(created)
    }

    /// Recomputes the sourcing recommendation against current availability.
    /// Read-only; the plan is only acted on at confirmation.
    #[instrument(skip(self))]
    pub async fn recommendation(
        &self,
        request_id: Uuid,
    ) -> Result<SourcingRecommendation, ServiceError> {
        let request = self.get(request_id).await?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if status.is_terminal() {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "recommendation",
            ));
        }

        self.sourcing
            .recommend(
                request.product_id,
                request.quantity,
                &Self::destination(&request),
            )
            .await
    }

    /// Dealer decision on an AWAITING_RECOMMENDATION request.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        request_id: Uuid,
        action: ConfirmAction,
    ) -> Result<product_request::Model, ServiceError> {
        let request = self.get(request_id).await?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if status != RequestStatus::AwaitingRecommendation {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "confirm",
            ));
        }

        match action {
            ConfirmAction::Confirm => self.confirm_and_materialize(request).await,
            ConfirmAction::SendToProcurement => {
                apply_status(&*self.db, &request, RequestStatus::AwaitingProcurementApproval)
                    .await?;
                emit(&self.event_sender, Event::RequestSentToProcurement(request.id)).await;
                self.get(request_id).await
            }
            ConfirmAction::Cancel => {
                apply_status(&*self.db, &request, RequestStatus::Cancelled).await?;
                emit(&self.event_sender, Event::RequestCancelled(request.id)).await;
                self.get(request_id).await
            }
        }
    }

    /// Re-plans against live availability and materializes the plan in one
    /// transaction: local stock held atomically, supplier reservations
    /// created as SUPPLIER_PENDING, planned_quantity fixed. Also the
    /// `approve` path out of AWAITING_PROCUREMENT_APPROVAL.
    pub(crate) async fn confirm_and_materialize(
        &self,
        request: product_request::Model,
    ) -> Result<product_request::Model, ServiceError> {
        let plan = self
            .sourcing
            .recommend(
                request.product_id,
                request.quantity,
                &Self::destination(&request),
            )
            .await?;
        if !plan.can_fulfill {
            return Err(ServiceError::InvalidOperation(format!(
                "plan can no longer fulfill the request ({}); send it to procurement instead",
                plan.explanation
            )));
        }

        let txn = self.db.begin().await?;

        let created = materialize_plan(&txn, &request, &plan).await?;

        let now = Utc::now();
        let estimated = now + Duration::days(plan.estimated_days);
        let result = RequestEntity::update_many()
            .col_expr(
                product_request::Column::Status,
                Expr::value(RequestStatus::Reserved.as_str()),
            )
            .col_expr(
                product_request::Column::PlannedQuantity,
                Expr::value(Some(plan.total_allocated)),
            )
            .col_expr(
                product_request::Column::RecommendedSource,
                Expr::value(plan.source_type.map(|s| s.as_str().to_string())),
            )
            .col_expr(
                product_request::Column::RecommendationExplanation,
                Expr::value(Some(plan.explanation.clone())),
            )
            .col_expr(
                product_request::Column::EstimatedDeliveryDate,
                Expr::value(Some(estimated)),
            )
            .col_expr(product_request::Column::ConfirmedAt, Expr::value(Some(now)))
            .col_expr(
                product_request::Column::Version,
                Expr::col(product_request::Column::Version).add(1),
            )
            .col_expr(
                product_request::Column::UpdatedAt,
                Expr::value(Some(now)),
            )
            .filter(product_request::Column::Id.eq(request.id))
            .filter(product_request::Column::Version.eq(request.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(request.id));
        }

        txn.commit().await?;

        let confirmed = self.get(request.id).await?;
        assert_plan_integrity(&*self.db, &confirmed).await?;

        info!(request_id = %request.id, planned = plan.total_allocated, "request confirmed and plan materialized");
        emit(&self.event_sender, Event::RequestConfirmed(request.id)).await;
        for res in &created {
            emit(
                &self.event_sender,
                Event::ReservationCreated {
                    request_id: request.id,
                    reservation_id: res.id,
                    quantity: res.quantity,
                },
            )
            .await;
        }

        Ok(confirmed)
    }

    /// RESERVED → PICKING; the floor has started pulling goods.
    #[instrument(skip(self))]
    pub async fn start_picking(
        &self,
        request_id: Uuid,
    ) -> Result<product_request::Model, ServiceError> {
        let request = self.get(request_id).await?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if !is_valid_transition(status, RequestStatus::Picking)
            || status != RequestStatus::Reserved
        {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "start_picking",
            ));
        }

        apply_status(&*self.db, &request, RequestStatus::Picking).await?;
        emit(
            &self.event_sender,
            Event::RequestStatusChanged {
                request_id,
                old_status: status.as_str().to_string(),
                new_status: RequestStatus::Picking.as_str().to_string(),
            },
        )
        .await;
        self.get(request_id).await
    }

    /// Cancels a request, releasing every hold its active warehouse
    /// reservations still have on stock. Shared by dealer cancellation and
    /// procurement rejection.
    pub async fn cancel_with_release(
        &self,
        request_id: Uuid,
    ) -> Result<product_request::Model, ServiceError> {
        let request = self.get(request_id).await?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if !is_valid_transition(status, RequestStatus::Cancelled) {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "cancel",
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
                release_stock_line(&txn, warehouse_id, request.product_id, res.quantity).await?;
            }
            let updated = ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Status,
                    Expr::value(ReservationStatus::Cancelled.as_str()),
                )
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
            if updated.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(res.id));
            }
        }

        apply_status(&txn, &request, RequestStatus::Cancelled).await?;

        txn.commit().await?;

        info!(request_id = %request_id, released = reservations.len(), "request cancelled, holds released");
        emit(&self.event_sender, Event::RequestCancelled(request_id)).await;
        self.get(request_id).await
    }

    /// Requests sitting in approval or supplier-pending states beyond the
    /// configured windows.
    #[instrument(skip(self))]
    pub async fn stale_report(&self) -> Result<Vec<StaleEntry>, ServiceError> {
        let db = &*self.db;
        let mut entries = Vec::new();

        let approval_cutoff = Utc::now() - Duration::hours(self.stale_config.approval_stale_hours);
        let stale_approvals = RequestEntity::find()
            .filter(
                product_request::Column::Status
                    .eq(RequestStatus::AwaitingProcurementApproval.as_str()),
            )
            .filter(product_request::Column::UpdatedAt.lt(approval_cutoff))
            .all(db)
            .await?;
        for request in stale_approvals {
            entries.push(StaleEntry {
                request_id: request.id,
                request_number: request.request_number,
                status: request.status,
                stalled_in: "procurement approval".into(),
                since: request.updated_at.unwrap_or(request.created_at),
            });
        }

        let supplier_cutoff = Utc::now() - Duration::hours(self.stale_config.supplier_stale_hours);
        let stale_supplier = ReservationEntity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::SupplierPending.as_str()))
            .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
            .filter(reservation::Column::UpdatedAt.lt(supplier_cutoff))
            .all(db)
            .await?;
        for res in stale_supplier {
            if entries.iter().any(|e| e.request_id == res.request_id) {
                continue;
            }
            let request = self.get(res.request_id).await?;
            entries.push(StaleEntry {
                request_id: request.id,
                request_number: request.request_number,
                status: request.status,
                stalled_in: "supplier confirmation".into(),
                since: res.updated_at.unwrap_or(res.created_at),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(status: ReservationStatus, is_blocked: bool, is_picked: bool) -> ReservationView {
        ReservationView {
            status,
            is_blocked,
            is_picked,
        }
    }

    #[test]
    fn all_blocked_derives_blocked() {
        let views = vec![
            view(ReservationStatus::AiDamaged, true, true),
            view(ReservationStatus::AiLowConfidence, true, true),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::InspectionPending, &views),
            RequestStatus::Blocked
        );
    }

    #[test]
    fn one_blocked_derives_partially_blocked() {
        let views = vec![
            view(ReservationStatus::AiDamaged, true, true),
            view(ReservationStatus::AiConfirmed, false, true),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::InspectionPending, &views),
            RequestStatus::PartiallyBlocked
        );
    }

    #[test]
    fn all_ready_derives_ready_for_allocation() {
        let views = vec![
            view(ReservationStatus::AiConfirmed, false, true),
            view(ReservationStatus::SupplierConfirmed, false, false),
            view(ReservationStatus::ProcurementResolved, false, true),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::PartiallyBlocked, &views),
            RequestStatus::ReadyForAllocation
        );
    }

    #[test]
    fn derivation_is_order_independent() {
        let mut views = vec![
            view(ReservationStatus::AiConfirmed, false, true),
            view(ReservationStatus::Pending, false, false),
            view(ReservationStatus::SupplierPending, false, false),
        ];
        let forward = derive_request_status(RequestStatus::Picking, &views);
        views.reverse();
        let backward = derive_request_status(RequestStatus::Picking, &views);
        assert_eq!(forward, backward);
        assert_eq!(forward, RequestStatus::Picking);
    }

    #[test]
    fn waiting_sources_stay_reserved_until_picking_starts() {
        let views = vec![
            view(ReservationStatus::Pending, false, false),
            view(ReservationStatus::SupplierPending, false, false),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::Reserved, &views),
            RequestStatus::Reserved
        );

        let views = vec![
            view(ReservationStatus::Picked, false, true),
            view(ReservationStatus::Pending, false, false),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::Reserved, &views),
            RequestStatus::Picking
        );
    }

    #[test]
    fn all_picked_derives_inspection_pending() {
        let views = vec![
            view(ReservationStatus::Picked, false, true),
            view(ReservationStatus::AiProcessing, false, true),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::Picking, &views),
            RequestStatus::InspectionPending
        );
    }

    #[test]
    fn remedy_with_in_flight_sources_derives_resolved_partial() {
        let views = vec![
            view(ReservationStatus::ProcurementResolved, false, true),
            view(ReservationStatus::Picked, false, true),
        ];
        assert_eq!(
            derive_request_status(RequestStatus::PartiallyBlocked, &views),
            RequestStatus::ResolvedPartial
        );
    }

    #[test]
    fn no_reservations_keeps_current() {
        assert_eq!(
            derive_request_status(RequestStatus::Reserved, &[]),
            RequestStatus::Reserved
        );
    }

    #[test]
    fn transition_table_enforces_the_happy_path() {
        use RequestStatus::*;
        assert!(is_valid_transition(Pending, AwaitingRecommendation));
        assert!(is_valid_transition(AwaitingRecommendation, Reserved));
        assert!(is_valid_transition(
            AwaitingRecommendation,
            AwaitingProcurementApproval
        ));
        assert!(is_valid_transition(AwaitingProcurementApproval, Reserved));
        assert!(is_valid_transition(Reserved, Picking));
        assert!(is_valid_transition(ReadyForAllocation, Allocated));
        assert!(is_valid_transition(Allocated, InTransit));
        assert!(is_valid_transition(InTransit, Completed));
    }

    #[test]
    fn transition_table_rejects_illegal_moves() {
        use RequestStatus::*;
        assert!(!is_valid_transition(Completed, Picking));
        assert!(!is_valid_transition(Cancelled, Reserved));
        assert!(!is_valid_transition(Pending, Reserved));
        assert!(!is_valid_transition(Allocated, Picking));
        assert!(!is_valid_transition(Reserved, Allocated));
    }

    #[test]
    fn request_numbers_carry_the_date_prefix() {
        let number = generate_request_number();
        assert!(number.starts_with("REQ-"));
        assert_eq!(number.len(), "REQ-20250101-000000".len());
    }
}
