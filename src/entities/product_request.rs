use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a dealer product request. Values are stored as uppercase
/// strings; the fulfillment-phase statuses between RESERVED and
/// READY_FOR_ALLOCATION are derived from reservation states, never stored
/// as deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    AwaitingRecommendation,
    AwaitingProcurementApproval,
    Reserved,
    Picking,
    InspectionPending,
    PartiallyBlocked,
    Blocked,
    ResolvedPartial,
    ReadyForAllocation,
    Allocated,
    InTransit,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::AwaitingRecommendation => "AWAITING_RECOMMENDATION",
            RequestStatus::AwaitingProcurementApproval => "AWAITING_PROCUREMENT_APPROVAL",
            RequestStatus::Reserved => "RESERVED",
            RequestStatus::Picking => "PICKING",
            RequestStatus::InspectionPending => "INSPECTION_PENDING",
            RequestStatus::PartiallyBlocked => "PARTIALLY_BLOCKED",
            RequestStatus::Blocked => "BLOCKED",
            RequestStatus::ResolvedPartial => "RESOLVED_PARTIAL",
            RequestStatus::ReadyForAllocation => "READY_FOR_ALLOCATION",
            RequestStatus::Allocated => "ALLOCATED",
            RequestStatus::InTransit => "IN_TRANSIT",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RequestStatus::Pending),
            "AWAITING_RECOMMENDATION" => Some(RequestStatus::AwaitingRecommendation),
            "AWAITING_PROCUREMENT_APPROVAL" => Some(RequestStatus::AwaitingProcurementApproval),
            "RESERVED" => Some(RequestStatus::Reserved),
            "PICKING" => Some(RequestStatus::Picking),
            "INSPECTION_PENDING" => Some(RequestStatus::InspectionPending),
            "PARTIALLY_BLOCKED" => Some(RequestStatus::PartiallyBlocked),
            "BLOCKED" => Some(RequestStatus::Blocked),
            "RESOLVED_PARTIAL" => Some(RequestStatus::ResolvedPartial),
            "READY_FOR_ALLOCATION" => Some(RequestStatus::ReadyForAllocation),
            "ALLOCATED" => Some(RequestStatus::Allocated),
            "IN_TRANSIT" => Some(RequestStatus::InTransit),
            "COMPLETED" => Some(RequestStatus::Completed),
            "CANCELLED" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// No transitions leave a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Statuses whose value is derived from reservation states. The
    /// aggregate recompute only applies while the request sits here.
    pub fn is_fulfillment_phase(&self) -> bool {
        matches!(
            self,
            RequestStatus::Reserved
                | RequestStatus::Picking
                | RequestStatus::InspectionPending
                | RequestStatus::PartiallyBlocked
                | RequestStatus::Blocked
                | RequestStatus::ResolvedPartial
                | RequestStatus::ReadyForAllocation
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-facing identifier, `REQ-YYYYMMDD-XXXXXX`.
    #[sea_orm(unique)]
    pub request_number: String,
    pub dealer_id: Uuid,
    pub product_id: Uuid,
    /// Requested quantity; immutable after creation.
    pub quantity: i32,
    /// Quantity committed by the confirmed plan. Σ active reservation
    /// quantities must equal this at all times after confirmation.
    pub planned_quantity: Option<i32>,
    pub delivery_location: String,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub status: String,
    /// LOCAL | IMPORT | MIXED, from the accepted sourcing plan.
    pub recommended_source: Option<String>,
    pub recommendation_explanation: Option<String>,
    pub requested_delivery_date: Option<DateTime<Utc>>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub dealer_notes: Option<String>,
    pub procurement_notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<RequestStatus> {
        RequestStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.version {
                active_model.version = Set(0);
            }
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::AwaitingRecommendation,
            RequestStatus::AwaitingProcurementApproval,
            RequestStatus::Reserved,
            RequestStatus::Picking,
            RequestStatus::InspectionPending,
            RequestStatus::PartiallyBlocked,
            RequestStatus::Blocked,
            RequestStatus::ResolvedPartial,
            RequestStatus::ReadyForAllocation,
            RequestStatus::Allocated,
            RequestStatus::InTransit,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ] {
            assert_eq!(RequestStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::from_str("SHIPPED"), None);
    }

    #[test]
    fn terminal_states_are_not_fulfillment_phase() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::Completed.is_fulfillment_phase());
        assert!(RequestStatus::PartiallyBlocked.is_fulfillment_phase());
        assert!(!RequestStatus::Pending.is_fulfillment_phase());
    }
}
