pub mod inspections;
pub mod logistics;
pub mod procurement;
pub mod requests;
pub mod reservations;
pub mod suppliers;
pub mod warehouses;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services;
use crate::services::sourcing::PlannerPolicy;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub requests: services::requests::RequestService,
    pub reservations: services::reservations::ReservationService,
    pub inspections: services::inspection::InspectionService,
    pub procurement: services::procurement::ProcurementService,
    pub logistics: services::logistics::LogisticsService,
    pub inventory: services::inventory::InventoryService,
    pub sourcing: services::sourcing::SourcingService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let policy = PlannerPolicy::from_config(&config.planner);
        let sourcing = services::sourcing::SourcingService::new(db.clone(), policy);
        let requests = services::requests::RequestService::new(
            db.clone(),
            event_sender.clone(),
            sourcing.clone(),
            config.stale_report.clone(),
        );
        let procurement = services::procurement::ProcurementService::new(
            db.clone(),
            event_sender.clone(),
            sourcing.clone(),
            requests.clone(),
        );
        let inspections = services::inspection::InspectionService::new(
            db.clone(),
            event_sender.clone(),
            &config.inspection,
        )?;

        Ok(Self {
            requests,
            reservations: services::reservations::ReservationService::new(
                db.clone(),
                event_sender.clone(),
            ),
            inspections,
            procurement,
            logistics: services::logistics::LogisticsService::new(db.clone(), event_sender),
            inventory: services::inventory::InventoryService::new(db),
            sourcing,
        })
    }
}
