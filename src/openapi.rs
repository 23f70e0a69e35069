//! OpenAPI document assembly.

use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Supplyline API",
        version = "0.1.0",
        description = r#"
Fulfillment engine for dealer product requests.

Dealers raise product requests; the planner recommends a sourcing split
across warehouses and import suppliers; confirmation reserves stock;
warehouse picking feeds an AI inspection gate; procurement resolves blocked
sources; logistics allocates and tracks shipments through delivery.

Callers are identified by the `x-user-id` and `x-user-role` headers,
forwarded by the gateway.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        crate::handlers::requests::create_request,
        crate::handlers::requests::list_requests,
        crate::handlers::requests::get_request,
        crate::handlers::requests::get_recommendation,
        crate::handlers::requests::confirm_request,
        crate::handlers::requests::start_picking,
        crate::handlers::requests::cancel_request,
        crate::handlers::requests::stale_report,
        crate::handlers::reservations::list_for_request,
        crate::handlers::reservations::pick,
        crate::handlers::reservations::supplier_confirm,
        crate::handlers::reservations::mark_ready,
        crate::handlers::inspections::submit_inspection,
        crate::handlers::inspections::list_for_request,
        crate::handlers::inspections::override_result,
        crate::handlers::procurement::pending,
        crate::handlers::procurement::replacement_options,
        crate::handlers::procurement::resolve,
        crate::handlers::logistics::ready_for_allocation,
        crate::handlers::logistics::allocate,
        crate::handlers::logistics::shipments_for_request,
        crate::handlers::logistics::dispatch,
        crate::handlers::logistics::update_status,
        crate::handlers::warehouses::list_warehouses,
        crate::handlers::warehouses::warehouse_stock,
        crate::handlers::warehouses::receive_stock,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::supplier_lines,
    ),
    tags(
        (name = "requests", description = "Dealer product requests and their state machine"),
        (name = "reservations", description = "Per-source reservation lifecycle"),
        (name = "inspections", description = "AI inspection verdicts and manual overrides"),
        (name = "procurement", description = "Blocked-source remedies"),
        (name = "logistics", description = "Shipment allocation and tracking"),
        (name = "warehouses", description = "Warehouse stock"),
        (name = "suppliers", description = "Supplier catalog"),
        (name = "reports", description = "Operational reports"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
