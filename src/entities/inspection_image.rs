use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw classifier verdicts. ERROR records a classifier failure; it never
/// advances the reservation (fail closed).
pub const RESULT_OK: &str = "OK";
pub const RESULT_DAMAGED: &str = "DAMAGED";
pub const RESULT_EXPIRED: &str = "EXPIRED";
pub const RESULT_ERROR: &str = "ERROR";

/// One uploaded inspection photo with the classifier's verdict. The raw
/// verdict is immutable once processed; a manual override is layered on top
/// and the effective result is computed, never destructively rewritten.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inspection_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub reservation_id: Uuid,
    pub uploaded_by: Uuid,
    pub filename: String,
    pub image_type: String,
    /// Raw classifier result; immutable after processing.
    pub result: String,
    /// Classifier confidence, 0-100.
    pub confidence_score: Option<Decimal>,
    pub damage_detected: bool,
    pub damage_type: Option<String>,
    pub damage_severity: Option<String>,
    pub expiry_detected: bool,
    pub detected_expiry_date: Option<NaiveDate>,
    pub is_expired: bool,
    pub seal_intact: Option<bool>,
    pub spoilage_detected: bool,
    pub overridden: bool,
    pub override_result: Option<String>,
    pub override_reason: Option<String>,
    pub overridden_by: Option<Uuid>,
    pub overridden_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// The verdict that currently counts: the override if one was recorded,
    /// otherwise the raw classifier result.
    pub fn effective_result(&self) -> &str {
        if self.overridden {
            self.override_result.as_deref().unwrap_or(&self.result)
        } else {
            &self.result
        }
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

    fn image(result: &str) -> Model {
        Model {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            filename: "pallet-1.jpg".into(),
            image_type: "overview".into(),
            result: result.into(),
            confidence_score: None,
            damage_detected: false,
            damage_type: None,
            damage_severity: None,
            expiry_detected: false,
            detected_expiry_date: None,
            is_expired: false,
            seal_intact: None,
            spoilage_detected: false,
            overridden: false,
            override_result: None,
            override_reason: None,
            overridden_by: None,
            overridden_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn effective_result_prefers_override() {
        let mut img = image(RESULT_DAMAGED);
        assert_eq!(img.effective_result(), RESULT_DAMAGED);

        img.overridden = true;
        img.override_result = Some(RESULT_OK.into());
        assert_eq!(img.effective_result(), RESULT_OK);
    }
}
