//! Sourcing planner.
//!
//! `build_plan` is a pure function over snapshots of warehouse and supplier
//! availability: no I/O, deterministic, and it never mutates state. Stock is
//! only held later, when a dealer confirms the plan. The service wrapper's
//! only job is loading those snapshots.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::entities::reservation::SourceRef;
use crate::entities::{supplier, supplier_stock, warehouse, warehouse_stock};
use crate::errors::ServiceError;

/// Ranking and handling-time policy. Data, not code: the proximity heuristic
/// is configurable per deployment.
#[derive(Debug, Clone)]
pub struct PlannerPolicy {
    pub rank_same_city: u8,
    pub rank_same_state: u8,
    pub rank_same_country: u8,
    pub rank_other: u8,
    pub default_supplier_lead_days: i64,
    pub same_city_days: i64,
    pub local_handling_days: i64,
}

impl PlannerPolicy {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            rank_same_city: config.rank_same_city,
            rank_same_state: config.rank_same_state,
            rank_same_country: config.rank_same_country,
            rank_other: config.rank_other,
            default_supplier_lead_days: config.default_supplier_lead_days,
            same_city_days: config.same_city_days,
            local_handling_days: config.local_handling_days,
        }
    }
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// Where the goods should end up, as far as the request tells us.
#[derive(Debug, Clone, Default)]
pub struct Destination {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// Snapshot of one warehouse's availability for the requested product.
#[derive(Debug, Clone)]
pub struct LocalLine {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub available: i32,
}

/// Snapshot of one supplier's claimed availability.
#[derive(Debug, Clone)]
pub struct SupplierLine {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub reliability_score: Decimal,
    pub lead_time_days: i64,
    pub available: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SourceType {
    Local,
    Import,
    Mixed,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Local => "LOCAL",
            SourceType::Import => "IMPORT",
            SourceType::Mixed => "MIXED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlannedAllocation {
    pub source: SourceRef,
    pub source_name: String,
    pub quantity: i32,
    pub estimated_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourcingRecommendation {
    pub source_type: Option<SourceType>,
    pub can_fulfill: bool,
    pub total_allocated: i32,
    pub shortfall: i32,
    /// Worst allocation lead time; the request is only complete when every
    /// source delivers.
    pub estimated_days: i64,
    pub allocations: Vec<PlannedAllocation>,
    pub explanation: String,
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn proximity_rank(dest: &Destination, line: &LocalLine, policy: &PlannerPolicy) -> u8 {
    if let Some(city) = &dest.city {
        if eq_ignore_case(city, &line.city) {
            return policy.rank_same_city;
        }
    }
    if let Some(state) = &dest.state {
        if eq_ignore_case(state, &line.state) {
            return policy.rank_same_state;
        }
    }
    if let Some(country) = &dest.country {
        if eq_ignore_case(country, &line.country) {
            return policy.rank_same_country;
        }
    }
    policy.rank_other
}

fn proximity_label(rank: u8, policy: &PlannerPolicy) -> &'static str {
    if rank == policy.rank_same_city {
        "same city"
    } else if rank == policy.rank_same_state {
        "same state"
    } else if rank == policy.rank_same_country {
        "same country"
    } else {
        "remote"
    }
}

/// Builds a fulfillment plan for `requested_qty` units.
///
/// Local warehouses are consumed first, ranked by proximity then available
/// quantity descending; the remainder comes from suppliers ranked by
/// reliability descending then effective lead time ascending. A shortfall
/// still allocates everything available and reports the gap.
pub fn build_plan(
    requested_qty: i32,
    dest: &Destination,
    local_lines: &[LocalLine],
    supplier_lines: &[SupplierLine],
    policy: &PlannerPolicy,
) -> SourcingRecommendation {
    let mut remaining = requested_qty.max(0);
    let mut allocations = Vec::new();
    let mut notes = Vec::new();

    let mut locals: Vec<(&LocalLine, u8)> = local_lines
        .iter()
        .filter(|l| l.available > 0)
        .map(|l| (l, proximity_rank(dest, l, policy)))
        .collect();
    locals.sort_by(|a, b| a.1.cmp(&b.1).then(b.0.available.cmp(&a.0.available)));

    for (line, rank) in locals {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(line.available);
        let days = if rank == policy.rank_same_city {
            policy.same_city_days
        } else {
            policy.local_handling_days
        };
        notes.push(format!(
            "{} units from warehouse {} ({}, ~{}d)",
            take,
            line.warehouse_name,
            proximity_label(rank, policy),
            days
        ));
        allocations.push(PlannedAllocation {
            source: SourceRef::Warehouse(line.warehouse_id),
            source_name: line.warehouse_name.clone(),
            quantity: take,
            estimated_days: days,
        });
        remaining -= take;
    }

    let local_count = allocations.len();

    let mut suppliers: Vec<&SupplierLine> =
        supplier_lines.iter().filter(|s| s.available > 0).collect();
    suppliers.sort_by(|a, b| {
        b.reliability_score
            .cmp(&a.reliability_score)
            .then(a.lead_time_days.cmp(&b.lead_time_days))
    });

    for line in suppliers {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(line.available);
        notes.push(format!(
            "{} units from supplier {} (reliability {}, ~{}d lead)",
            take, line.supplier_name, line.reliability_score, line.lead_time_days
        ));
        allocations.push(PlannedAllocation {
            source: SourceRef::Supplier(line.supplier_id),
            source_name: line.supplier_name.clone(),
            quantity: take,
            estimated_days: line.lead_time_days,
        });
        remaining -= take;
    }

    let total_allocated: i32 = allocations.iter().map(|a| a.quantity).sum();
    let can_fulfill = remaining == 0 && requested_qty > 0;
    let estimated_days = allocations
        .iter()
        .map(|a| a.estimated_days)
        .max()
        .unwrap_or(0);

    let source_type = if allocations.is_empty() {
        None
    } else if allocations.len() == local_count {
        Some(SourceType::Local)
    } else if local_count == 0 {
        Some(SourceType::Import)
    } else {
        Some(SourceType::Mixed)
    };

    if !can_fulfill {
        notes.push(format!(
            "short {} of {} requested units; only {} available across all sources",
            remaining, requested_qty, total_allocated
        ));
    }

    let explanation = if notes.is_empty() {
        "no stock available at any warehouse or supplier".to_string()
    } else {
        notes.join("; ")
    };

    SourcingRecommendation {
        source_type,
        can_fulfill,
        total_allocated,
        shortfall: remaining,
        estimated_days,
        allocations,
        explanation,
    }
}

/// Loads availability snapshots and runs the pure planner.
#[derive(Clone)]
pub struct SourcingService {
    db: Arc<DatabaseConnection>,
    policy: PlannerPolicy,
}

impl SourcingService {
    pub fn new(db: Arc<DatabaseConnection>, policy: PlannerPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &PlannerPolicy {
        &self.policy
    }

    #[instrument(skip(self))]
    pub async fn recommend(
        &self,
        product_id: Uuid,
        quantity: i32,
        dest: &Destination,
    ) -> Result<SourcingRecommendation, ServiceError> {
        self.recommend_excluding(product_id, quantity, dest, &[])
            .await
    }

    /// Like [`recommend`](Self::recommend), but skips the named warehouses.
    /// Used for re-sourcing a blocked reservation, where goods from the
    /// warehouse that produced the damage must not be offered again.
    #[instrument(skip(self))]
    pub async fn recommend_excluding(
        &self,
        product_id: Uuid,
        quantity: i32,
        dest: &Destination,
        excluded_warehouses: &[Uuid],
    ) -> Result<SourcingRecommendation, ServiceError> {
        let (mut local_lines, supplier_lines) = self.load_snapshots(product_id).await?;
        local_lines.retain(|l| !excluded_warehouses.contains(&l.warehouse_id));
        Ok(build_plan(
            quantity,
            dest,
            &local_lines,
            &supplier_lines,
            &self.policy,
        ))
    }

    async fn load_snapshots(
        &self,
        product_id: Uuid,
    ) -> Result<(Vec<LocalLine>, Vec<SupplierLine>), ServiceError> {
        let db = &*self.db;

        let stock_lines = warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::ProductId.eq(product_id))
            .all(db)
            .await?;
        let warehouses = warehouse::Entity::find()
            .filter(warehouse::Column::IsActive.eq(true))
            .all(db)
            .await?;
        let mut local_lines = Vec::new();
        for line in &stock_lines {
            if line.available() <= 0 {
                continue;
            }
            if let Some(wh) = warehouses.iter().find(|w| w.id == line.warehouse_id) {
                local_lines.push(LocalLine {
                    warehouse_id: wh.id,
                    warehouse_name: wh.name.clone(),
                    city: wh.city.clone(),
                    state: wh.state.clone(),
                    country: wh.country.clone(),
                    available: line.available(),
                });
            }
        }

        let product_lines = supplier_stock::Entity::find()
            .filter(supplier_stock::Column::ProductId.eq(product_id))
            .all(db)
            .await?;
        let suppliers = supplier::Entity::find()
            .filter(supplier::Column::IsActive.eq(true))
            .all(db)
            .await?;
        let mut supplier_lines = Vec::new();
        for line in &product_lines {
            if line.available_quantity <= 0 {
                continue;
            }
            if let Some(sup) = suppliers.iter().find(|s| s.id == line.supplier_id) {
                supplier_lines.push(SupplierLine {
                    supplier_id: sup.id,
                    supplier_name: sup.name.clone(),
                    reliability_score: sup.reliability_score,
                    lead_time_days: line.effective_lead_time_days(sup.lead_time_days) as i64,
                    available: line.available_quantity,
                });
            }
        }

        Ok((local_lines, supplier_lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn dest() -> Destination {
        Destination {
            city: Some("Nairobi".into()),
            state: Some("Nairobi County".into()),
            country: Some("KE".into()),
        }
    }

    fn local(name: &str, city: &str, available: i32) -> LocalLine {
        LocalLine {
            warehouse_id: Uuid::new_v4(),
            warehouse_name: name.into(),
            city: city.into(),
            state: "Nairobi County".into(),
            country: "KE".into(),
            available,
        }
    }

    fn supplier(name: &str, reliability: Decimal, lead: i64, available: i32) -> SupplierLine {
        SupplierLine {
            supplier_id: Uuid::new_v4(),
            supplier_name: name.into(),
            reliability_score: reliability,
            lead_time_days: lead,
            available,
        }
    }

    #[test]
    fn splits_across_two_local_warehouses() {
        let locals = vec![local("Central", "Nairobi", 60), local("Depot B", "Nakuru", 40)];
        let plan = build_plan(100, &dest(), &locals, &[], &PlannerPolicy::default());

        assert!(plan.can_fulfill);
        assert_eq!(plan.source_type, Some(SourceType::Local));
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].quantity, 60);
        assert_eq!(plan.allocations[0].source_name, "Central");
        assert_eq!(plan.allocations[1].quantity, 40);
        assert_eq!(plan.total_allocated, 100);
        assert_eq!(plan.shortfall, 0);
        // same-city allocation is 1 day, other local 2; overall is the max
        assert_eq!(plan.estimated_days, 2);
    }

    #[test]
    fn tops_up_from_supplier_as_mixed() {
        let locals = vec![local("Central", "Nairobi", 30)];
        let sups = vec![supplier("Acme Imports", dec!(0.9), 10, 200)];
        let plan = build_plan(100, &dest(), &locals, &sups, &PlannerPolicy::default());

        assert!(plan.can_fulfill);
        assert_eq!(plan.source_type, Some(SourceType::Mixed));
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].quantity, 30);
        assert_eq!(plan.allocations[1].quantity, 70);
        assert_eq!(plan.estimated_days, 10);
    }

    #[test]
    fn supplier_only_plan_is_import() {
        let sups = vec![
            supplier("Reliable", dec!(0.95), 12, 80),
            supplier("Fast but flaky", dec!(0.60), 3, 80),
        ];
        let plan = build_plan(50, &dest(), &[], &sups, &PlannerPolicy::default());

        assert!(plan.can_fulfill);
        assert_eq!(plan.source_type, Some(SourceType::Import));
        // reliability outranks lead time
        assert_eq!(plan.allocations[0].source_name, "Reliable");
    }

    #[test]
    fn shortfall_allocates_everything_and_reports_gap() {
        let locals = vec![local("Central", "Nairobi", 20)];
        let sups = vec![supplier("Acme", dec!(0.8), 7, 30)];
        let plan = build_plan(100, &dest(), &locals, &sups, &PlannerPolicy::default());

        assert!(!plan.can_fulfill);
        assert_eq!(plan.total_allocated, 50);
        assert_eq!(plan.shortfall, 50);
        assert!(plan.explanation.contains("short 50"));
    }

    #[test]
    fn proximity_outranks_quantity() {
        let locals = vec![
            local("Huge remote", "Mombasa", 500),
            local("Small nearby", "Nairobi", 10),
        ];
        let plan = build_plan(10, &dest(), &locals, &[], &PlannerPolicy::default());

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].source_name, "Small nearby");
        assert_eq!(plan.estimated_days, 1);
    }

    #[test]
    fn planning_is_deterministic() {
        let locals = vec![local("Central", "Nairobi", 60), local("Depot", "Nakuru", 40)];
        let a = build_plan(80, &dest(), &locals, &[], &PlannerPolicy::default());
        let b = build_plan(80, &dest(), &locals, &[], &PlannerPolicy::default());
        assert_eq!(a.explanation, b.explanation);
        assert_eq!(a.total_allocated, b.total_allocated);
    }
}
