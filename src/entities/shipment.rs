use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Confirmed,
    Dispatched,
    InTransit,
    Delivered,
    Received,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Confirmed => "CONFIRMED",
            ShipmentStatus::Dispatched => "DISPATCHED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Received => "RECEIVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(ShipmentStatus::Confirmed),
            "DISPATCHED" => Some(ShipmentStatus::Dispatched),
            "IN_TRANSIT" => Some(ShipmentStatus::InTransit),
            "DELIVERED" => Some(ShipmentStatus::Delivered),
            "RECEIVED" => Some(ShipmentStatus::Received),
            _ => None,
        }
    }

    /// Forward-only progression; no shipment status ever moves backwards.
    pub fn is_valid_transition(&self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Confirmed, Dispatched)
                | (Dispatched, InTransit)
                | (Dispatched, Delivered)
                | (InTransit, Delivered)
                | (Delivered, Received)
        )
    }
}

/// One shipment per allocated reservation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub reservation_id: Uuid,
    pub source_type: String,
    pub source_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub carrier: Option<String>,
    /// Human-facing identifier, `SHP-...`.
    #[sea_orm(unique)]
    pub tracking_number: String,
    pub dispatch_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<ShipmentStatus> {
        ShipmentStatus::from_str(&self.status)
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
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_progression_is_forward_only() {
        use ShipmentStatus::*;
        assert!(Confirmed.is_valid_transition(Dispatched));
        assert!(Dispatched.is_valid_transition(InTransit));
        assert!(InTransit.is_valid_transition(Delivered));
        assert!(Delivered.is_valid_transition(Received));
        assert!(!Received.is_valid_transition(Confirmed));
        assert!(!Delivered.is_valid_transition(Dispatched));
        assert!(!Confirmed.is_valid_transition(Received));
    }
}
