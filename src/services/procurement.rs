//! Procurement resolution of blocked requests.
//!
//! Every remedy keeps the audit trail: blocked reservations are superseded
//! or annotated, never deleted, and their stock holds are released exactly
//! once.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product_request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::reservation::{
    self, Entity as ReservationEntity, Lifecycle, ReservationStatus, SourceRef,
};
use crate::entities::supplier;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::inventory::{release_stock_line, reserve_stock_line};
use crate::services::requests::{
    apply_status, assert_plan_integrity, emit, recompute_request_status, RequestService,
};
use crate::services::sourcing::{Destination, SourcingRecommendation, SourcingService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    /// Materialize the plan of an AWAITING_PROCUREMENT_APPROVAL request.
    Approve,
    /// Source the blocked quantity from another warehouse.
    Replace,
    /// Source the blocked quantity from a supplier.
    Import,
    /// Accept the goods as-is; no re-inspection.
    Accept,
    /// Cancel the request, releasing every hold.
    Reject,
    /// Send the blocked sources back to the floor for new photos.
    RequestReupload,
}

impl ResolveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveAction::Approve => "approve",
            ResolveAction::Replace => "replace",
            ResolveAction::Import => "import",
            ResolveAction::Accept => "accept",
            ResolveAction::Reject => "reject",
            ResolveAction::RequestReupload => "request_reupload",
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResolveInput {
    pub action: ResolveAction,
    /// Blocked reservation the remedy targets. Optional when the request has
    /// exactly one blocked reservation (or, for `accept`, to accept all).
    pub reservation_id: Option<Uuid>,
    /// Replacement warehouse (`replace`) or supplier (`import`).
    pub source_id: Option<Uuid>,
    /// Remedy quantity; defaults to the full blocked quantity. May be
    /// smaller for a partial replacement.
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

/// Which pool a re-sourcing remedy draws from. `replace` maps to Warehouse,
/// `import` to Supplier; no other action reaches the re-sourcing path.
#[derive(Debug, Clone, Copy)]
enum RemedySource {
    Warehouse,
    Supplier,
}

const RESOLVABLE: &[RequestStatus] = &[
    RequestStatus::PartiallyBlocked,
    RequestStatus::Blocked,
    RequestStatus::AwaitingProcurementApproval,
];

#[derive(Clone)]
pub struct ProcurementService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    sourcing: SourcingService,
    requests: RequestService,
}

impl ProcurementService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        sourcing: SourcingService,
        requests: RequestService,
    ) -> Self {
        Self {
            db,
            event_sender,
            sourcing,
            requests,
        }
    }

    /// Requests waiting on a procurement decision.
    #[instrument(skip(self))]
    pub async fn pending(&self) -> Result<Vec<product_request::Model>, ServiceError> {
        let statuses: Vec<&str> = RESOLVABLE.iter().map(|s| s.as_str()).collect();
        let requests = RequestEntity::find()
            .filter(product_request::Column::Status.is_in(statuses))
            .all(&*self.db)
            .await?;
        Ok(requests)
    }

    /// Re-runs the planner scoped to the blocked quantity. Read-only. The
    /// warehouses behind the blocked reservations are excluded: damaged
    /// stock is never re-offered from the same shelf.
    #[instrument(skip(self))]
    pub async fn replacement_options(
        &self,
        request_id: Uuid,
    ) -> Result<SourcingRecommendation, ServiceError> {
        let (request, _status) = self.load_resolvable(request_id).await?;
        let blocked = self.blocked_reservations(request_id).await?;
        let blocked_qty: i32 = blocked.iter().map(|r| r.quantity).sum();
        if blocked_qty == 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "request {} has no blocked quantity to replace",
                request_id
            )));
        }
        let excluded: Vec<Uuid> = blocked
            .iter()
            .filter_map(|r| match r.source() {
                Some(SourceRef::Warehouse(id)) => Some(id),
                _ => None,
            })
            .collect();

        let dest = Destination {
            city: request.delivery_city.clone(),
            state: request.delivery_state.clone(),
            country: None,
        };
        self.sourcing
            .recommend_excluding(request.product_id, blocked_qty, &dest, &excluded)
            .await
    }

    #[instrument(skip(self, input), fields(action = input.action.as_str()))]
    pub async fn resolve(
        &self,
        request_id: Uuid,
        input: ResolveInput,
    ) -> Result<product_request::Model, ServiceError> {
        let (request, status) = self.load_resolvable(request_id).await?;

        match input.action {
            ResolveAction::Approve => {
                if status != RequestStatus::AwaitingProcurementApproval {
                    return Err(ServiceError::invalid_transition(
                        "request",
                        status.as_str(),
                        "approve",
                    ));
                }
                let approved = self.requests.confirm_and_materialize(request).await?;
                self.finish(request_id, input.action, input.notes).await?;
                Ok(approved)
            }
            ResolveAction::Replace => {
                self.re_source(&request, &input, RemedySource::Warehouse)
                    .await?;
                self.finish(request_id, input.action, input.notes).await
            }
            ResolveAction::Import => {
                self.re_source(&request, &input, RemedySource::Supplier)
                    .await?;
                self.finish(request_id, input.action, input.notes).await
            }
            ResolveAction::Accept => {
                self.accept(&request, &input).await?;
                self.finish(request_id, input.action, input.notes).await
            }
            ResolveAction::Reject => {
                let cancelled = self.requests.cancel_with_release(request_id).await?;
                metrics::PROCUREMENT_RESOLUTIONS
                    .with_label_values(&[input.action.as_str()])
                    .inc();
                emit(
                    &self.event_sender,
                    Event::ProcurementResolved {
                        request_id,
                        action: input.action.as_str().to_string(),
                    },
                )
                .await;
                Ok(cancelled)
            }
            ResolveAction::RequestReupload => {
                self.request_reupload(&request, &input).await?;
                // The request goes back to PICKING explicitly; picks and
                // re-inspections drive it forward from there.
                let fresh = self.requests.get(request_id).await?;
                apply_status(&*self.db, &fresh, RequestStatus::Picking).await?;
                metrics::PROCUREMENT_RESOLUTIONS
                    .with_label_values(&[input.action.as_str()])
                    .inc();
                emit(
                    &self.event_sender,
                    Event::ProcurementResolved {
                        request_id,
                        action: input.action.as_str().to_string(),
                    },
                )
                .await;
                self.requests.get(request_id).await
            }
        }
    }

    async fn load_resolvable(
        &self,
        request_id: Uuid,
    ) -> Result<(product_request::Model, RequestStatus), ServiceError> {
        let request = self.requests.get(request_id).await?;
        let status = request.status().ok_or_else(|| {
            ServiceError::ConsistencyViolation(format!(
                "request {} carries unknown status '{}'",
                request_id, request.status
            ))
        })?;
        if !RESOLVABLE.contains(&status) {
            return Err(ServiceError::invalid_transition(
                "request",
                status.as_str(),
                "resolve",
            ));
        }
        Ok((request, status))
    }

    async fn blocked_reservations(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let reservations = ReservationEntity::find()
            .filter(reservation::Column::RequestId.eq(request_id))
            .filter(reservation::Column::Lifecycle.eq(Lifecycle::Active.as_str()))
            .filter(reservation::Column::IsBlocked.eq(true))
            .all(&*self.db)
            .await?;
        Ok(reservations)
    }

    /// Resolves the remedy target: the named reservation, or the single
    /// blocked one when unambiguous.
    async fn target_reservation(
        &self,
        request_id: Uuid,
        input: &ResolveInput,
    ) -> Result<reservation::Model, ServiceError> {
        let blocked = self.blocked_reservations(request_id).await?;
        match input.reservation_id {
            Some(id) => blocked.into_iter().find(|r| r.id == id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no active blocked reservation {} on request {}",
                    id, request_id
                ))
            }),
            None => {
                if blocked.len() == 1 {
                    Ok(blocked.into_iter().next().unwrap())
                } else {
                    Err(ServiceError::ValidationError(format!(
                        "request {} has {} blocked reservations; name one explicitly",
                        request_id,
                        blocked.len()
                    )))
                }
            }
        }
    }

    async fn re_source(
        &self,
        request: &product_request::Model,
        input: &ResolveInput,
        remedy: RemedySource,
    ) -> Result<(), ServiceError> {
        let old = self.target_reservation(request.id, input).await?;
        let source_id = input.source_id.ok_or_else(|| {
            ServiceError::ValidationError("source_id is required for replace/import".into())
        })?;
        let qty = input.quantity.unwrap_or(old.quantity);
        if qty <= 0 || qty > old.quantity {
            return Err(ServiceError::ValidationError(format!(
                "remedy quantity {} must be in 1..={}",
                qty, old.quantity
            )));
        }

        let txn = self.db.begin().await?;

        let (new_source, new_status) = match remedy {
            RemedySource::Warehouse => {
                if old.source() == Some(SourceRef::Warehouse(source_id)) {
                    return Err(ServiceError::ValidationError(format!(
                        "replacement must come from a different warehouse than {}",
                        source_id
                    )));
                }
                reserve_stock_line(&txn, source_id, request.product_id, qty).await?;
                (SourceRef::Warehouse(source_id), ReservationStatus::Pending)
            }
            RemedySource::Supplier => {
                supplier::Entity::find_by_id(source_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("supplier {} not found", source_id))
                    })?;
                (
                    SourceRef::Supplier(source_id),
                    ReservationStatus::SupplierPending,
                )
            }
        };

        let replacement = reservation::ActiveModel {
            request_id: Set(request.id),
            source_type: Set(new_source.type_str().to_string()),
            source_id: Set(new_source.id()),
            quantity: Set(qty),
            status: Set(new_status.as_str().to_string()),
            is_blocked: Set(false),
            is_picked: Set(false),
            is_replacement: Set(true),
            original_reservation_id: Set(Some(old.id)),
            resolution_notes: Set(input.notes.clone()),
            ..Default::default()
        };
        let replacement = replacement.insert(&txn).await?;
        metrics::RESERVATIONS_CREATED.inc();

        // The replaced portion's hold is released exactly once, here.
        if let Some(SourceRef::Warehouse(old_warehouse)) = old.source() {
            release_stock_line(&txn, old_warehouse, request.product_id, qty).await?;
        }

        let now = Utc::now();
        let update = if qty == old.quantity {
            ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Lifecycle,
                    Expr::value(Lifecycle::Superseded.as_str()),
                )
                .col_expr(
                    reservation::Column::ReplacedById,
                    Expr::value(Some(replacement.id)),
                )
                .col_expr(
                    reservation::Column::ResolutionNotes,
                    Expr::value(Some(format!(
                        "superseded by {} via {}",
                        replacement.id,
                        input.action.as_str()
                    ))),
                )
        } else {
            // Partial remedy: the rest of the blocked quantity stays put.
            ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Quantity,
                    Expr::col(reservation::Column::Quantity).sub(qty),
                )
                .col_expr(
                    reservation::Column::ResolutionNotes,
                    Expr::value(Some(format!(
                        "{} units re-sourced to {} via {}",
                        qty,
                        replacement.id,
                        input.action.as_str()
                    ))),
                )
        };
        let result = update
            .col_expr(
                reservation::Column::Version,
                Expr::col(reservation::Column::Version).add(1),
            )
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(reservation::Column::Id.eq(old.id))
            .filter(reservation::Column::Version.eq(old.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(old.id));
        }

        txn.commit().await?;

        assert_plan_integrity(&*self.db, request).await?;
        info!(
            request_id = %request.id,
            old_reservation = %old.id,
            new_reservation = %replacement.id,
            qty,
            action = input.action.as_str(),
            "blocked reservation re-sourced"
        );
        emit(
            &self.event_sender,
            Event::ReservationSuperseded {
                old_reservation_id: old.id,
                new_reservation_id: replacement.id,
            },
        )
        .await;

        Ok(())
    }

    /// Accepts blocked goods as-is. The hold stays in place and commits on
    /// delivery like any confirmed source.
    async fn accept(
        &self,
        request: &product_request::Model,
        input: &ResolveInput,
    ) -> Result<(), ServiceError> {
        let targets = match input.reservation_id {
            Some(_) => vec![self.target_reservation(request.id, input).await?],
            None => self.blocked_reservations(request.id).await?,
        };
        if targets.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "request {} has no blocked reservations to accept",
                request.id
            )));
        }

        let note = format!(
            "damage accepted by procurement{}",
            input
                .notes
                .as_deref()
                .map(|n| format!(": {}", n))
                .unwrap_or_default()
        );

        for res in &targets {
            let result = ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Status,
                    Expr::value(ReservationStatus::ProcurementResolved.as_str()),
                )
                .col_expr(reservation::Column::IsBlocked, Expr::value(false))
                .col_expr(
                    reservation::Column::ResolutionNotes,
                    Expr::value(Some(note.clone())),
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
                .exec(&*self.db)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(res.id));
            }
        }

        info!(request_id = %request.id, accepted = targets.len(), "blocked goods accepted");
        Ok(())
    }

    /// Clears the AI verdicts so the floor can re-pick and re-photograph.
    async fn request_reupload(
        &self,
        request: &product_request::Model,
        input: &ResolveInput,
    ) -> Result<(), ServiceError> {
        let targets = match input.reservation_id {
            Some(_) => vec![self.target_reservation(request.id, input).await?],
            None => self.blocked_reservations(request.id).await?,
        };
        if targets.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "request {} has no blocked reservations to reset",
                request.id
            )));
        }

        for res in &targets {
            let result = ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Status,
                    Expr::value(ReservationStatus::Pending.as_str()),
                )
                .col_expr(reservation::Column::IsBlocked, Expr::value(false))
                .col_expr(
                    reservation::Column::BlockReason,
                    Expr::value(Option::<String>::None),
                )
                .col_expr(reservation::Column::IsPicked, Expr::value(false))
                .col_expr(
                    reservation::Column::PickedAt,
                    Expr::value(Option::<chrono::DateTime<Utc>>::None),
                )
                .col_expr(
                    reservation::Column::PickedBy,
                    Expr::value(Option::<Uuid>::None),
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
                .exec(&*self.db)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(res.id));
            }
        }

        info!(request_id = %request.id, reset = targets.len(), "blocked reservations sent back for reupload");
        Ok(())
    }

    /// Common tail of the mutating remedies: notes, metrics, event,
    /// aggregate recompute.
    async fn finish(
        &self,
        request_id: Uuid,
        action: ResolveAction,
        notes: Option<String>,
    ) -> Result<product_request::Model, ServiceError> {
        if let Some(notes) = notes {
            RequestEntity::update_many()
                .col_expr(
                    product_request::Column::ProcurementNotes,
                    Expr::value(Some(notes)),
                )
                .col_expr(
                    product_request::Column::UpdatedAt,
                    Expr::value(Some(Utc::now())),
                )
                .filter(product_request::Column::Id.eq(request_id))
                .exec(&*self.db)
                .await?;
        }

        metrics::PROCUREMENT_RESOLUTIONS
            .with_label_values(&[action.as_str()])
            .inc();
        emit(
            &self.event_sender,
            Event::ProcurementResolved {
                request_id,
                action: action.as_str().to_string(),
            },
        )
        .await;

        recompute_request_status(&self.db, &self.event_sender, request_id).await?;
        self.requests.get(request_id).await
    }
}
