use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Domain events emitted after each committed state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Request lifecycle
    RequestCreated(Uuid),
    PlanProposed {
        request_id: Uuid,
        can_fulfill: bool,
    },
    RequestConfirmed(Uuid),
    RequestSentToProcurement(Uuid),
    RequestCancelled(Uuid),
    RequestStatusChanged {
        request_id: Uuid,
        old_status: String,
        new_status: String,
    },
    /// All sources settled; logistics may allocate a shipment.
    RequestReadyForAllocation(Uuid),
    RequestCompleted(Uuid),

    // Reservation / fulfillment progress
    ReservationCreated {
        request_id: Uuid,
        reservation_id: Uuid,
        quantity: i32,
    },
    ItemPicked {
        reservation_id: Uuid,
    },
    InspectionCompleted {
        reservation_id: Uuid,
        verdict: String,
        blocked: bool,
    },
    InspectionOverridden {
        reservation_id: Uuid,
        verdict: String,
        reviewer_id: Uuid,
    },
    SupplierConfirmed {
        reservation_id: Uuid,
    },
    SourceMarkedReady {
        reservation_id: Uuid,
    },
    ReservationSuperseded {
        old_reservation_id: Uuid,
        new_reservation_id: Uuid,
    },
    ProcurementResolved {
        request_id: Uuid,
        action: String,
    },

    // Logistics
    ShipmentAllocated {
        request_id: Uuid,
        shipment_id: Uuid,
    },
    ShipmentDispatched {
        shipment_id: Uuid,
    },
    ShipmentReceived {
        shipment_id: Uuid,
    },
    StockCommitted {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
}

impl Event {
    /// Short name used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RequestCreated(_) => "request_created",
            Event::PlanProposed { .. } => "plan_proposed",
            Event::RequestConfirmed(_) => "request_confirmed",
            Event::RequestSentToProcurement(_) => "request_sent_to_procurement",
            Event::RequestCancelled(_) => "request_cancelled",
            Event::RequestStatusChanged { .. } => "request_status_changed",
            Event::RequestReadyForAllocation(_) => "request_ready_for_allocation",
            Event::RequestCompleted(_) => "request_completed",
            Event::ReservationCreated { .. } => "reservation_created",
            Event::ItemPicked { .. } => "item_picked",
            Event::InspectionCompleted { .. } => "inspection_completed",
            Event::InspectionOverridden { .. } => "inspection_overridden",
            Event::SupplierConfirmed { .. } => "supplier_confirmed",
            Event::SourceMarkedReady { .. } => "source_marked_ready",
            Event::ReservationSuperseded { .. } => "reservation_superseded",
            Event::ProcurementResolved { .. } => "procurement_resolved",
            Event::ShipmentAllocated { .. } => "shipment_allocated",
            Event::ShipmentDispatched { .. } => "shipment_dispatched",
            Event::ShipmentReceived { .. } => "shipment_received",
            Event::StockCommitted { .. } => "stock_committed",
        }
    }
}

/// Drains the event channel, logging and counting each event. Downstream
/// consumers (notifications, analytics) subscribe here; the core engine only
/// requires that emission never blocks a request handler.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::EVENTS_PROCESSED
            .with_label_values(&[event.name()])
            .inc();

        match &event {
            Event::RequestReadyForAllocation(request_id) => {
                info!(%request_id, "request ready for allocation; notifying logistics");
            }
            Event::StockCommitted {
                warehouse_id,
                product_id,
                quantity,
            } => {
                info!(%warehouse_id, %product_id, quantity, "stock committed");
            }
            Event::InspectionCompleted {
                reservation_id,
                verdict,
                blocked,
            } => {
                if *blocked {
                    warn!(%reservation_id, verdict, "inspection blocked reservation");
                } else {
                    info!(%reservation_id, verdict, "inspection completed");
                }
            }
            other => {
                info!(event = other.name(), "event processed");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::RequestCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::RequestCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn event_names_are_stable() {
        assert_eq!(
            Event::RequestReadyForAllocation(Uuid::new_v4()).name(),
            "request_ready_for_allocation"
        );
        assert_eq!(
            Event::InspectionCompleted {
                reservation_id: Uuid::new_v4(),
                verdict: "AI_CONFIRMED".into(),
                blocked: false,
            }
            .name(),
            "inspection_completed"
        );
    }
}
