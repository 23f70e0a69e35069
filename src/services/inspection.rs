//! Inspection result aggregation.
//!
//! The image classifier is a black box: its verdict arrives with the upload
//! and is applied here. Policy is fail-closed — a classifier failure records
//! an ERROR image and leaves the reservation in AI_PROCESSING, it never
//! counts as a pass.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::InspectionConfig;
use crate::entities::inspection_image::{
    self, Entity as ImageEntity, RESULT_DAMAGED, RESULT_ERROR, RESULT_EXPIRED, RESULT_OK,
};
use crate::entities::product_request::Entity as RequestEntity;
use crate::entities::reservation::{self, Entity as ReservationEntity, ReservationStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::services::requests::{emit, recompute_request_status};

/// Raw classifier output accompanying an uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassifierVerdict {
    /// OK | DAMAGED | EXPIRED | ERROR
    pub result: String,
    /// 0-100.
    pub confidence_score: Option<Decimal>,
    #[serde(default)]
    pub damage_detected: bool,
    pub damage_type: Option<String>,
    pub damage_severity: Option<String>,
    #[serde(default)]
    pub expiry_detected: bool,
    pub detected_expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_expired: bool,
    pub seal_intact: Option<bool>,
    #[serde(default)]
    pub spoilage_detected: bool,
}

/// What the policy decided about a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictOutcome {
    /// Classifier failed; record and stay in AI_PROCESSING.
    ClassifierError,
    /// Physical damage, broken seal, or spoilage.
    Damaged { reason: String },
    /// Expired or expiry suspected.
    Expired,
    /// Verdict OK but confidence below the review threshold.
    LowConfidence,
    Confirmed,
}

impl VerdictOutcome {
    /// Target reservation state for this outcome.
    pub fn reservation_state(&self) -> (ReservationStatus, bool, Option<String>) {
        match self {
            VerdictOutcome::ClassifierError => (ReservationStatus::AiProcessing, false, None),
            VerdictOutcome::Damaged { reason } => (
                ReservationStatus::AiDamaged,
                true,
                Some(format!("DAMAGED: {}", reason)),
            ),
            VerdictOutcome::Expired => (
                ReservationStatus::AiDamaged,
                true,
                Some("EXPIRED".to_string()),
            ),
            VerdictOutcome::LowConfidence => (
                ReservationStatus::AiLowConfidence,
                true,
                Some("LOW_CONFIDENCE".to_string()),
            ),
            VerdictOutcome::Confirmed => (ReservationStatus::AiConfirmed, false, None),
        }
    }
}

/// Applies the verdict policy. Pure; the threshold comes from configuration.
///
/// Detected damage or expiry blocks regardless of confidence. An OK verdict
/// below the threshold (or with no confidence at all) is parked for manual
/// review rather than trusted.
pub fn evaluate_verdict(verdict: &ClassifierVerdict, threshold: Decimal) -> VerdictOutcome {
    let result = verdict.result.trim().to_ascii_uppercase();

    if result == RESULT_ERROR {
        return VerdictOutcome::ClassifierError;
    }

    if verdict.damage_detected
        || verdict.spoilage_detected
        || verdict.seal_intact == Some(false)
        || result == RESULT_DAMAGED
    {
        let reason = if verdict.spoilage_detected {
            "spoilage detected".to_string()
        } else if verdict.seal_intact == Some(false) {
            "seal broken".to_string()
        } else {
            verdict
                .damage_type
                .clone()
                .unwrap_or_else(|| "damage detected".to_string())
        };
        return VerdictOutcome::Damaged { reason };
    }

    if verdict.is_expired || verdict.expiry_detected || result == RESULT_EXPIRED {
        return VerdictOutcome::Expired;
    }

    match verdict.confidence_score {
        Some(confidence) if confidence >= threshold => VerdictOutcome::Confirmed,
        _ => VerdictOutcome::LowConfidence,
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitInspectionInput {
    pub reservation_id: Uuid,
    pub filename: String,
    pub image_type: String,
    pub verdict: ClassifierVerdict,
}

#[derive(Clone)]
pub struct InspectionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    threshold: Decimal,
}

impl InspectionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &InspectionConfig,
    ) -> Result<Self, ServiceError> {
        let threshold = Decimal::try_from(config.confidence_threshold).map_err(|_| {
            ServiceError::InternalError(format!(
                "invalid confidence threshold {}",
                config.confidence_threshold
            ))
        })?;
        Ok(Self {
            db,
            event_sender,
            threshold,
        })
    }

    pub async fn list_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<inspection_image::Model>, ServiceError> {
        let images = ImageEntity::find()
            .filter(inspection_image::Column::RequestId.eq(request_id))
            .order_by_asc(inspection_image::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(images)
    }

    /// Records an inspection image and applies its verdict to the
    /// reservation. A classifier ERROR is persisted but surfaced as 502 so
    /// the uploader retries.
    #[instrument(skip(self, input), fields(reservation_id = %input.reservation_id))]
    pub async fn submit(
        &self,
        uploaded_by: Uuid,
        input: SubmitInspectionInput,
    ) -> Result<inspection_image::Model, ServiceError> {
        let res = ReservationEntity::find_by_id(input.reservation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("reservation {} not found", input.reservation_id))
            })?;
        if !res.is_active() {
            return Err(ServiceError::invalid_transition(
                "reservation",
                &res.lifecycle,
                "inspect",
            ));
        }
        match res.status() {
            Some(ReservationStatus::Picked) | Some(ReservationStatus::AiProcessing) => {}
            _ => {
                return Err(ServiceError::invalid_transition(
                    "reservation",
                    &res.status,
                    "inspect",
                ));
            }
        }

        let outcome = evaluate_verdict(&input.verdict, self.threshold);
        let (new_status, blocked, block_reason) = outcome.reservation_state();

        let stored_result = match &outcome {
            VerdictOutcome::ClassifierError => RESULT_ERROR.to_string(),
            _ => input.verdict.result.trim().to_ascii_uppercase(),
        };

        let txn = self.db.begin().await?;

        let image = inspection_image::ActiveModel {
            request_id: Set(res.request_id),
            reservation_id: Set(res.id),
            uploaded_by: Set(uploaded_by),
            filename: Set(input.filename.clone()),
            image_type: Set(input.image_type.clone()),
            result: Set(stored_result),
            confidence_score: Set(input.verdict.confidence_score),
            damage_detected: Set(input.verdict.damage_detected),
            damage_type: Set(input.verdict.damage_type.clone()),
            damage_severity: Set(input.verdict.damage_severity.clone()),
            expiry_detected: Set(input.verdict.expiry_detected),
            detected_expiry_date: Set(input.verdict.detected_expiry_date),
            is_expired: Set(input.verdict.is_expired),
            seal_intact: Set(input.verdict.seal_intact),
            spoilage_detected: Set(input.verdict.spoilage_detected),
            overridden: Set(false),
            ..Default::default()
        };
        let image = image.insert(&txn).await?;

        let result = ReservationEntity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(new_status.as_str()),
            )
            .col_expr(reservation::Column::IsBlocked, Expr::value(blocked))
            .col_expr(
                reservation::Column::BlockReason,
                Expr::value(block_reason.clone()),
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

        txn.commit().await?;

        metrics::INSPECTIONS_TOTAL
            .with_label_values(&[new_status.as_str()])
            .inc();

        if matches!(outcome, VerdictOutcome::ClassifierError) {
            warn!(reservation_id = %res.id, "classifier failure recorded, reservation stays in AI_PROCESSING");
            return Err(ServiceError::ClassifierUnavailable(format!(
                "classifier reported an error for reservation {}; the verdict was recorded and the item remains pending inspection",
                res.id
            )));
        }

        info!(
            reservation_id = %res.id,
            verdict = new_status.as_str(),
            blocked,
            "inspection applied"
        );
        emit(
            &self.event_sender,
            Event::InspectionCompleted {
                reservation_id: res.id,
                verdict: new_status.as_str().to_string(),
                blocked,
            },
        )
        .await;
        recompute_request_status(&self.db, &self.event_sender, res.request_id).await?;

        Ok(image)
    }

    /// Records a manual review on top of an existing verdict. The raw
    /// classifier result is never touched; the reservation is recomputed
    /// deterministically from the new effective result.
    ///
    /// Repeating an override with the identical result is a no-op; a
    /// conflicting second override is rejected.
    #[instrument(skip(self, reason))]
    pub async fn override_result(
        &self,
        image_id: Uuid,
        reviewer_id: Uuid,
        new_result: &str,
        reason: &str,
    ) -> Result<inspection_image::Model, ServiceError> {
        let new_result = new_result.trim().to_ascii_uppercase();
        if ![RESULT_OK, RESULT_DAMAGED, RESULT_EXPIRED].contains(&new_result.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "override result must be one of OK, DAMAGED, EXPIRED; got '{}'",
                new_result
            )));
        }
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "an override requires a reason".into(),
            ));
        }

        let image = ImageEntity::find_by_id(image_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("inspection image {} not found", image_id))
            })?;

        let request = RequestEntity::find_by_id(image.request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("request {} not found", image.request_id))
            })?;
        if request
            .status()
            .map(|s| s.is_terminal())
            .unwrap_or(true)
        {
            return Err(ServiceError::invalid_transition(
                "request",
                &request.status,
                "override_inspection",
            ));
        }

        if image.overridden {
            if image.override_result.as_deref() == Some(new_result.as_str()) {
                return Ok(image);
            }
            return Err(ServiceError::ValidationError(format!(
                "image {} was already overridden to {}; conflicting overrides are not allowed",
                image_id,
                image.override_result.as_deref().unwrap_or("?")
            )));
        }

        let res = ReservationEntity::find_by_id(image.reservation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("reservation {} not found", image.reservation_id))
            })?;

        let (new_status, blocked, block_reason) = match new_result.as_str() {
            RESULT_OK => (ReservationStatus::AiConfirmed, false, None),
            RESULT_EXPIRED => (
                ReservationStatus::AiDamaged,
                true,
                Some("EXPIRED (manual review)".to_string()),
            ),
            _ => (
                ReservationStatus::AiDamaged,
                true,
                Some("DAMAGED (manual review)".to_string()),
            ),
        };

        let txn = self.db.begin().await?;

        let now = Utc::now();
        let mut active: inspection_image::ActiveModel = image.clone().into();
        active.overridden = Set(true);
        active.override_result = Set(Some(new_result.clone()));
        active.override_reason = Set(Some(reason.trim().to_string()));
        active.overridden_by = Set(Some(reviewer_id));
        active.overridden_at = Set(Some(now));
        let updated_image = active.update(&txn).await?;

        if res.is_active() {
            let result = ReservationEntity::update_many()
                .col_expr(
                    reservation::Column::Status,
                    Expr::value(new_status.as_str()),
                )
                .col_expr(reservation::Column::IsBlocked, Expr::value(blocked))
                .col_expr(
                    reservation::Column::BlockReason,
                    Expr::value(block_reason.clone()),
                )
                .col_expr(
                    reservation::Column::Version,
                    Expr::col(reservation::Column::Version).add(1),
                )
                .col_expr(reservation::Column::UpdatedAt, Expr::value(Some(now)))
                .filter(reservation::Column::Id.eq(res.id))
                .filter(reservation::Column::Version.eq(res.version))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(res.id));
            }
        }

        txn.commit().await?;

        info!(
            %image_id,
            %reviewer_id,
            result = new_result.as_str(),
            "inspection verdict overridden"
        );
        emit(
            &self.event_sender,
            Event::InspectionOverridden {
                reservation_id: res.id,
                verdict: new_result.clone(),
                reviewer_id,
            },
        )
        .await;
        recompute_request_status(&self.db, &self.event_sender, res.request_id).await?;

        Ok(updated_image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ok_verdict(confidence: Option<Decimal>) -> ClassifierVerdict {
        ClassifierVerdict {
            result: RESULT_OK.into(),
            confidence_score: confidence,
            damage_detected: false,
            damage_type: None,
            damage_severity: None,
            expiry_detected: false,
            detected_expiry_date: None,
            is_expired: false,
            seal_intact: Some(true),
            spoilage_detected: false,
        }
    }

    #[test]
    fn high_confidence_ok_confirms() {
        let outcome = evaluate_verdict(&ok_verdict(Some(dec!(92))), dec!(85));
        assert_eq!(outcome, VerdictOutcome::Confirmed);
    }

    #[test]
    fn low_confidence_ok_is_parked_for_review() {
        let outcome = evaluate_verdict(&ok_verdict(Some(dec!(60))), dec!(85));
        assert_eq!(outcome, VerdictOutcome::LowConfidence);
        let (status, blocked, _) = outcome.reservation_state();
        assert_eq!(status, ReservationStatus::AiLowConfidence);
        assert!(blocked);
    }

    #[test]
    fn missing_confidence_is_never_trusted() {
        let outcome = evaluate_verdict(&ok_verdict(None), dec!(85));
        assert_eq!(outcome, VerdictOutcome::LowConfidence);
    }

    #[test]
    fn damage_blocks_regardless_of_confidence() {
        let mut verdict = ok_verdict(Some(dec!(99)));
        verdict.damage_detected = true;
        verdict.damage_type = Some("crushed packaging".into());
        let outcome = evaluate_verdict(&verdict, dec!(85));
        let (status, blocked, reason) = outcome.reservation_state();
        assert_eq!(status, ReservationStatus::AiDamaged);
        assert!(blocked);
        assert!(reason.unwrap().contains("crushed packaging"));
    }

    #[test]
    fn broken_seal_counts_as_damage() {
        let mut verdict = ok_verdict(Some(dec!(99)));
        verdict.seal_intact = Some(false);
        assert!(matches!(
            evaluate_verdict(&verdict, dec!(85)),
            VerdictOutcome::Damaged { .. }
        ));
    }

    #[test]
    fn expiry_blocks_with_expired_reason() {
        let mut verdict = ok_verdict(Some(dec!(99)));
        verdict.is_expired = true;
        let outcome = evaluate_verdict(&verdict, dec!(85));
        assert_eq!(outcome, VerdictOutcome::Expired);
        let (_, blocked, reason) = outcome.reservation_state();
        assert!(blocked);
        assert_eq!(reason.as_deref(), Some("EXPIRED"));
    }

    #[test]
    fn classifier_error_fails_closed() {
        let mut verdict = ok_verdict(Some(dec!(99)));
        verdict.result = RESULT_ERROR.into();
        let outcome = evaluate_verdict(&verdict, dec!(85));
        assert_eq!(outcome, VerdictOutcome::ClassifierError);
        let (status, blocked, _) = outcome.reservation_state();
        assert_eq!(status, ReservationStatus::AiProcessing);
        assert!(!blocked);
    }
}
