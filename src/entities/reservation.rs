use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-source progress of a reservation. Warehouse sources walk
/// PENDING → PICKED → AI_PROCESSING → an AI verdict; supplier sources walk
/// SUPPLIER_PENDING → SUPPLIER_CONFIRMED. PROCUREMENT_RESOLVED and READY
/// are the remedy / manual-override outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Picked,
    AiProcessing,
    AiConfirmed,
    AiLowConfidence,
    AiDamaged,
    SupplierPending,
    SupplierConfirmed,
    ProcurementResolved,
    Ready,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Picked => "PICKED",
            ReservationStatus::AiProcessing => "AI_PROCESSING",
            ReservationStatus::AiConfirmed => "AI_CONFIRMED",
            ReservationStatus::AiLowConfidence => "AI_LOW_CONFIDENCE",
            ReservationStatus::AiDamaged => "AI_DAMAGED",
            ReservationStatus::SupplierPending => "SUPPLIER_PENDING",
            ReservationStatus::SupplierConfirmed => "SUPPLIER_CONFIRMED",
            ReservationStatus::ProcurementResolved => "PROCUREMENT_RESOLVED",
            ReservationStatus::Ready => "READY",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "PICKED" => Some(ReservationStatus::Picked),
            "AI_PROCESSING" => Some(ReservationStatus::AiProcessing),
            "AI_CONFIRMED" => Some(ReservationStatus::AiConfirmed),
            "AI_LOW_CONFIDENCE" => Some(ReservationStatus::AiLowConfidence),
            "AI_DAMAGED" => Some(ReservationStatus::AiDamaged),
            "SUPPLIER_PENDING" => Some(ReservationStatus::SupplierPending),
            "SUPPLIER_CONFIRMED" => Some(ReservationStatus::SupplierConfirmed),
            "PROCUREMENT_RESOLVED" => Some(ReservationStatus::ProcurementResolved),
            "READY" => Some(ReservationStatus::Ready),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// Ready-equivalent for the joint wait: the source needs no further
    /// action before allocation. Blocked reservations never count as ready
    /// regardless of status; callers must check `is_blocked` too.
    pub fn is_ready_equivalent(&self) -> bool {
        matches!(
            self,
            ReservationStatus::AiConfirmed
                | ReservationStatus::SupplierConfirmed
                | ReservationStatus::ProcurementResolved
                | ReservationStatus::Ready
        )
    }
}

/// Which pool a reservation draws from. Stored as a (source_type, source_id)
/// column pair; the pair is total, so "exactly one of two nullable foreign
/// keys" can never be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "source_type", content = "source_id", rename_all = "lowercase")]
pub enum SourceRef {
    Warehouse(Uuid),
    Supplier(Uuid),
}

impl SourceRef {
    pub fn type_str(&self) -> &'static str {
        match self {
            SourceRef::Warehouse(_) => "warehouse",
            SourceRef::Supplier(_) => "supplier",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            SourceRef::Warehouse(id) | SourceRef::Supplier(id) => *id,
        }
    }

    pub fn from_parts(source_type: &str, source_id: Uuid) -> Option<Self> {
        match source_type {
            "warehouse" => Some(SourceRef::Warehouse(source_id)),
            "supplier" => Some(SourceRef::Supplier(source_id)),
            _ => None,
        }
    }
}

/// Row lifecycle: reservations are never deleted. Superseded rows keep their
/// audit trail and point at their replacement; retired rows closed out with
/// the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Active,
    Superseded,
    Retired,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Superseded => "superseded",
            Lifecycle::Retired => "retired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Lifecycle::Active),
            "superseded" => Some(Lifecycle::Superseded),
            "retired" => Some(Lifecycle::Retired),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub source_type: String,
    pub source_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub is_picked: bool,
    pub picked_at: Option<DateTime<Utc>>,
    pub picked_by: Option<Uuid>,
    pub lifecycle: String,
    pub replaced_by_id: Option<Uuid>,
    pub is_replacement: bool,
    pub original_reservation_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    /// Optimistic concurrency counter.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<ReservationStatus> {
        ReservationStatus::from_str(&self.status)
    }

    pub fn source(&self) -> Option<SourceRef> {
        SourceRef::from_parts(&self.source_type, self.source_id)
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        Lifecycle::from_str(&self.lifecycle)
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active.as_str()
    }

    /// A source is ready iff unblocked and in a ready-equivalent status.
    pub fn is_ready(&self) -> bool {
        !self.is_blocked
            && self
                .status()
                .map(|s| s.is_ready_equivalent())
                .unwrap_or(false)
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
            if let ActiveValue::NotSet = active_model.lifecycle {
                active_model.lifecycle = Set(Lifecycle::Active.as_str().to_string());
            }
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
