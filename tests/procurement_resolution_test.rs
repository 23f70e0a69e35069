mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use supplyline_api::entities::reservation::{Lifecycle, ReservationStatus};
use supplyline_api::errors::ServiceError;
use supplyline_api::services::inspection::{ClassifierVerdict, SubmitInspectionInput};
use supplyline_api::services::procurement::{ResolveAction, ResolveInput};
use supplyline_api::services::requests::{ConfirmAction, CreateRequestInput};

fn create_input(product_id: Uuid, quantity: i32) -> CreateRequestInput {
    CreateRequestInput {
        product_id,
        quantity,
        delivery_location: "Av. Ipiranga 6681, Porto Alegre".into(),
        delivery_city: Some("Porto Alegre".into()),
        delivery_state: Some("RS".into()),
        requested_delivery_date: None,
        dealer_notes: None,
    }
}

fn verdict(result: &str, confidence: rust_decimal::Decimal) -> ClassifierVerdict {
    ClassifierVerdict {
        result: result.into(),
        confidence_score: Some(confidence),
        damage_detected: result == "DAMAGED",
        damage_type: (result == "DAMAGED").then(|| "crushed packaging".to_string()),
        damage_severity: None,
        expiry_detected: false,
        detected_expiry_date: None,
        is_expired: false,
        seal_intact: Some(true),
        spoilage_detected: false,
    }
}

fn resolve_input(action: ResolveAction) -> ResolveInput {
    ResolveInput {
        action,
        reservation_id: None,
        source_id: None,
        quantity: None,
        notes: None,
    }
}

/// Drives a single-warehouse request through pick and a DAMAGED verdict,
/// leaving it BLOCKED with one blocked reservation.
async fn blocked_request(app: &TestApp, product_id: Uuid, quantity: i32) -> (Uuid, Uuid) {
    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product_id, quantity))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();
    svc.requests.start_picking(created.id).await.unwrap();

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert_eq!(reservations.len(), 1);
    let res_id = reservations[0].id;
    svc.reservations.pick(res_id, Uuid::new_v4()).await.unwrap();
    svc.inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: res_id,
                filename: "pallet-1.jpg".into(),
                image_type: "pallet".into(),
                verdict: verdict("DAMAGED", dec!(97)),
            },
        )
        .await
        .unwrap();

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "BLOCKED");
    (created.id, res_id)
}

#[tokio::test]
async fn damaged_goods_are_replaced_from_another_warehouse() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-600", 1).await;
    let wh1 = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    let wh2 = app.seed_warehouse("CXS", "Caxias do Sul", "RS").await;
    app.seed_stock(wh1.id, product.id, 50).await;
    app.seed_stock(wh2.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, old_res_id) = blocked_request(&app, product.id, 20).await;

    let res = svc.reservations.get(old_res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::AiDamaged.as_str());
    assert!(res.is_blocked);
    assert!(res.block_reason.as_deref().unwrap().contains("crushed"));

    let pending = svc.procurement.pending().await.unwrap();
    assert!(pending.iter().any(|r| r.id == request_id));

    let options = svc.procurement.replacement_options(request_id).await.unwrap();
    assert!(options.can_fulfill);
    assert!(options
        .allocations
        .iter()
        .any(|a| a.source.id() == wh2.id && a.quantity == 20));

    svc.procurement
        .resolve(
            request_id,
            ResolveInput {
                action: ResolveAction::Replace,
                reservation_id: None,
                source_id: Some(wh2.id),
                quantity: None,
                notes: Some("re-sourced after damage".into()),
            },
        )
        .await
        .unwrap();

    // The hold moved to the replacement warehouse.
    assert_eq!(app.stock_line(wh1.id, product.id).await.reserved_quantity, 0);
    assert_eq!(app.stock_line(wh2.id, product.id).await.reserved_quantity, 20);

    let old = svc.reservations.get(old_res_id).await.unwrap();
    assert_eq!(old.lifecycle, Lifecycle::Superseded.as_str());
    assert!(old.replaced_by_id.is_some());

    let replacement = svc
        .reservations
        .get(old.replaced_by_id.unwrap())
        .await
        .unwrap();
    assert!(replacement.is_replacement);
    assert_eq!(replacement.original_reservation_id, Some(old_res_id));
    assert_eq!(replacement.status, ReservationStatus::Pending.as_str());
    assert_eq!(replacement.quantity, 20);

    // The replacement starts over on the floor.
    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "RESERVED");
}

#[tokio::test]
async fn replacement_never_returns_to_the_damaged_warehouse() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-605", 1).await;
    // wh1 is same-city and would win the ranking outright if eligible.
    let wh1 = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    let wh2 = app.seed_warehouse("CXS", "Caxias do Sul", "RS").await;
    app.seed_stock(wh1.id, product.id, 100).await;
    app.seed_stock(wh2.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, old_res_id) = blocked_request(&app, product.id, 20).await;

    let options = svc.procurement.replacement_options(request_id).await.unwrap();
    assert!(options.allocations.iter().all(|a| a.source.id() != wh1.id));
    assert!(options
        .allocations
        .iter()
        .any(|a| a.source.id() == wh2.id && a.quantity == 20));

    // Naming the damaged warehouse explicitly is refused too.
    let err = svc
        .procurement
        .resolve(
            request_id,
            ResolveInput {
                action: ResolveAction::Replace,
                reservation_id: Some(old_res_id),
                source_id: Some(wh1.id),
                quantity: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
    assert_eq!(app.stock_line(wh1.id, product.id).await.reserved_quantity, 20);

    svc.procurement
        .resolve(
            request_id,
            ResolveInput {
                action: ResolveAction::Replace,
                reservation_id: Some(old_res_id),
                source_id: Some(wh2.id),
                quantity: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(app.stock_line(wh1.id, product.id).await.reserved_quantity, 0);
    assert_eq!(app.stock_line(wh2.id, product.id).await.reserved_quantity, 20);
}

#[tokio::test]
async fn partial_replacement_leaves_the_remainder_blocked() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-610", 1).await;
    let wh1 = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    let wh2 = app.seed_warehouse("CXS", "Caxias do Sul", "RS").await;
    app.seed_stock(wh1.id, product.id, 50).await;
    app.seed_stock(wh2.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, old_res_id) = blocked_request(&app, product.id, 30).await;

    svc.procurement
        .resolve(
            request_id,
            ResolveInput {
                action: ResolveAction::Replace,
                reservation_id: Some(old_res_id),
                source_id: Some(wh2.id),
                quantity: Some(10),
                notes: None,
            },
        )
        .await
        .unwrap();

    let old = svc.reservations.get(old_res_id).await.unwrap();
    assert_eq!(old.lifecycle, Lifecycle::Active.as_str());
    assert_eq!(old.quantity, 20);
    assert!(old.is_blocked);

    assert_eq!(app.stock_line(wh1.id, product.id).await.reserved_quantity, 20);
    assert_eq!(app.stock_line(wh2.id, product.id).await.reserved_quantity, 10);

    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "PARTIALLY_BLOCKED");
}

#[tokio::test]
async fn import_supersedes_to_a_supplier_source() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-620", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;
    let supplier = app.seed_supplier("SUP-CN", 14).await;
    app.seed_supplier_line(supplier.id, product.id, 500).await;

    let svc = &app.state.services;
    let (request_id, old_res_id) = blocked_request(&app, product.id, 20).await;

    svc.procurement
        .resolve(
            request_id,
            ResolveInput {
                action: ResolveAction::Import,
                reservation_id: None,
                source_id: Some(supplier.id),
                quantity: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(app.stock_line(wh.id, product.id).await.reserved_quantity, 0);

    let old = svc.reservations.get(old_res_id).await.unwrap();
    let replacement = svc
        .reservations
        .get(old.replaced_by_id.unwrap())
        .await
        .unwrap();
    assert_eq!(replacement.source_type, "supplier");
    assert_eq!(replacement.source_id, supplier.id);
    assert_eq!(
        replacement.status,
        ReservationStatus::SupplierPending.as_str()
    );

    // Supplier acknowledgement is now the only thing in the way.
    svc.reservations
        .confirm_supplier(replacement.id)
        .await
        .unwrap();
    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");
}

#[tokio::test]
async fn accepting_damage_keeps_the_hold_and_unblocks() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-630", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, res_id) = blocked_request(&app, product.id, 20).await;

    svc.procurement
        .resolve(request_id, resolve_input(ResolveAction::Accept))
        .await
        .unwrap();

    let res = svc.reservations.get(res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::ProcurementResolved.as_str());
    assert!(!res.is_blocked);
    assert!(res.resolution_notes.as_deref().unwrap().contains("accepted"));

    // The hold never moved; it commits on delivery like any other source.
    assert_eq!(app.stock_line(wh.id, product.id).await.reserved_quantity, 20);

    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");
}

#[tokio::test]
async fn rejecting_cancels_and_releases_holds() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-640", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, _) = blocked_request(&app, product.id, 20).await;

    let cancelled = svc
        .procurement
        .resolve(request_id, resolve_input(ResolveAction::Reject))
        .await
        .unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    let line = app.stock_line(wh.id, product.id).await;
    assert_eq!(line.quantity, 50);
    assert_eq!(line.reserved_quantity, 0);
}

#[tokio::test]
async fn reupload_resets_the_source_to_the_floor() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-650", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;

    let svc = &app.state.services;
    let (request_id, res_id) = blocked_request(&app, product.id, 20).await;

    svc.procurement
        .resolve(request_id, resolve_input(ResolveAction::RequestReupload))
        .await
        .unwrap();

    let res = svc.reservations.get(res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::Pending.as_str());
    assert!(!res.is_blocked);
    assert!(!res.is_picked);

    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "PICKING");

    // Second pass with good photos goes through.
    svc.reservations.pick(res_id, Uuid::new_v4()).await.unwrap();
    svc.inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: res_id,
                filename: "pallet-2.jpg".into(),
                image_type: "pallet".into(),
                verdict: verdict("OK", dec!(96)),
            },
        )
        .await
        .unwrap();
    let request = svc.requests.get(request_id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");
}

#[tokio::test]
async fn approval_materializes_a_procurement_request() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-660", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 5).await;

    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product.id, 50))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::SendToProcurement)
        .await
        .unwrap();

    // Still short: approval re-plans against live stock and refuses.
    let err = svc
        .procurement
        .resolve(created.id, resolve_input(ResolveAction::Approve))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    svc.inventory
        .receive_stock(wh.id, product.id, 100, None, None, None)
        .await
        .unwrap();
    let approved = svc
        .procurement
        .resolve(created.id, resolve_input(ResolveAction::Approve))
        .await
        .unwrap();
    assert_eq!(approved.status, "RESERVED");
    assert_eq!(app.stock_line(wh.id, product.id).await.reserved_quantity, 50);
}

#[tokio::test]
async fn low_confidence_verdict_is_overridable() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-670", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;

    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product.id, 20))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();
    svc.requests.start_picking(created.id).await.unwrap();
    let res_id = svc.reservations.list_for_request(created.id).await.unwrap()[0].id;
    svc.reservations.pick(res_id, Uuid::new_v4()).await.unwrap();

    let image = svc
        .inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: res_id,
                filename: "pallet-1.jpg".into(),
                image_type: "pallet".into(),
                verdict: verdict("OK", dec!(60)),
            },
        )
        .await
        .unwrap();

    let res = svc.reservations.get(res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::AiLowConfidence.as_str());
    assert!(res.is_blocked);

    let reviewer = Uuid::new_v4();
    let updated = svc
        .inspections
        .override_result(image.id, reviewer, "ok", "verified by hand")
        .await
        .unwrap();
    assert!(updated.overridden);
    assert_eq!(updated.override_result.as_deref(), Some("OK"));
    assert_eq!(updated.result, "OK");
    assert_eq!(updated.effective_result(), "OK");

    let res = svc.reservations.get(res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::AiConfirmed.as_str());
    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");

    // Repeating the same override is a no-op; flipping it is refused.
    svc.inspections
        .override_result(image.id, reviewer, "OK", "still fine")
        .await
        .unwrap();
    let err = svc
        .inspections
        .override_result(image.id, reviewer, "DAMAGED", "changed my mind")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn classifier_errors_fail_closed_and_allow_retry() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-680", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 50).await;

    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product.id, 20))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();
    svc.requests.start_picking(created.id).await.unwrap();
    let res_id = svc.reservations.list_for_request(created.id).await.unwrap()[0].id;
    svc.reservations.pick(res_id, Uuid::new_v4()).await.unwrap();

    let err = svc
        .inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: res_id,
                filename: "pallet-1.jpg".into(),
                image_type: "pallet".into(),
                verdict: verdict("ERROR", dec!(0)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ClassifierUnavailable(_)));

    // The failure was recorded but never counted as a pass.
    let res = svc.reservations.get(res_id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::AiProcessing.as_str());
    assert!(!res.is_blocked);
    let images = svc.inspections.list_for_request(created.id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].result, "ERROR");

    // A clean retry moves the request forward.
    svc.inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: res_id,
                filename: "pallet-1-retry.jpg".into(),
                image_type: "pallet".into(),
                verdict: verdict("OK", dec!(94)),
            },
        )
        .await
        .unwrap();
    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");
}

#[tokio::test]
async fn procurement_endpoints_are_role_gated() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/procurement/pending",
            Uuid::new_v4(),
            "dealer",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::GET,
            "/api/v1/procurement/pending",
            Uuid::new_v4(),
            "procurement",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = common::response_json(response).await;
    assert_eq!(payload["data"], json!([]));
}
