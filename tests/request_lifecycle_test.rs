mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{response_json, TestApp};
use supplyline_api::entities::reservation::{Lifecycle, ReservationStatus};
use supplyline_api::entities::shipment::ShipmentStatus;
use supplyline_api::errors::ServiceError;
use supplyline_api::services::inspection::{ClassifierVerdict, SubmitInspectionInput};
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

fn ok_verdict(confidence: rust_decimal::Decimal) -> ClassifierVerdict {
    ClassifierVerdict {
        result: "OK".into(),
        confidence_score: Some(confidence),
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

#[tokio::test]
async fn warehouse_request_runs_to_completion() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-100", 1).await;
    let warehouse = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(warehouse.id, product.id, 100).await;

    let dealer = Uuid::new_v4();
    let svc = &app.state.services;

    let created = svc
        .requests
        .create(dealer, create_input(product.id, 40))
        .await
        .unwrap();
    assert_eq!(created.status, "AWAITING_RECOMMENDATION");
    assert_eq!(created.recommended_source.as_deref(), Some("LOCAL"));
    assert!(created.recommendation_explanation.is_some());
    assert!(created.request_number.starts_with("REQ-"));

    let confirmed = svc
        .requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.status, "RESERVED");
    assert_eq!(confirmed.planned_quantity, Some(40));

    let line = app.stock_line(warehouse.id, product.id).await;
    assert_eq!(line.quantity, 100);
    assert_eq!(line.reserved_quantity, 40);

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert_eq!(reservations.len(), 1);
    let res = &reservations[0];
    assert_eq!(res.status, ReservationStatus::Pending.as_str());
    assert_eq!(res.source_type, "warehouse");
    assert_eq!(res.source_id, warehouse.id);
    assert_eq!(res.quantity, 40);

    let picking = svc.requests.start_picking(created.id).await.unwrap();
    assert_eq!(picking.status, "PICKING");

    let picker = Uuid::new_v4();
    let picked = svc.reservations.pick(res.id, picker).await.unwrap();
    assert_eq!(picked.status, ReservationStatus::Picked.as_str());
    assert!(picked.is_picked);
    assert_eq!(picked.picked_by, Some(picker));

    let uploader = Uuid::new_v4();
    svc.inspections
        .submit(
            uploader,
            SubmitInspectionInput {
                reservation_id: res.id,
                filename: "pallet-1.jpg".into(),
                image_type: "pallet".into(),
                verdict: ok_verdict(dec!(95)),
            },
        )
        .await
        .unwrap();

    let res = svc.reservations.get(res.id).await.unwrap();
    assert_eq!(res.status, ReservationStatus::AiConfirmed.as_str());
    assert!(!res.is_blocked);

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");

    let shipments = svc
        .logistics
        .allocate(created.id, Some("TransSul".into()))
        .await
        .unwrap();
    assert_eq!(shipments.len(), 1);
    let shp = &shipments[0];
    assert_eq!(shp.status, ShipmentStatus::Confirmed.as_str());
    assert!(shp.tracking_number.starts_with("SHP-"));
    assert_eq!(shp.quantity, 40);
    assert_eq!(shp.carrier.as_deref(), Some("TransSul"));

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "ALLOCATED");

    let dispatched = svc.logistics.dispatch(shp.id).await.unwrap();
    assert_eq!(dispatched.status, ShipmentStatus::Dispatched.as_str());
    assert!(dispatched.dispatch_date.is_some());

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "IN_TRANSIT");

    svc.logistics
        .advance(shp.id, ShipmentStatus::Delivered)
        .await
        .unwrap();
    let received = svc
        .logistics
        .advance(shp.id, ShipmentStatus::Received)
        .await
        .unwrap();
    assert_eq!(received.status, ShipmentStatus::Received.as_str());
    assert!(received.delivery_date.is_some());

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "COMPLETED");
    assert!(request.completed_at.is_some());

    // Delivery converted the hold into a deduction and closed the book.
    let line = app.stock_line(warehouse.id, product.id).await;
    assert_eq!(line.quantity, 60);
    assert_eq!(line.reserved_quantity, 0);

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert!(reservations
        .iter()
        .all(|r| r.lifecycle == Lifecycle::Retired.as_str()));
}

#[tokio::test]
async fn split_plan_waits_for_every_source() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-200", 1).await;
    let warehouse = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(warehouse.id, product.id, 30).await;
    let supplier = app.seed_supplier("SUP-CN", 14).await;
    app.seed_supplier_line(supplier.id, product.id, 500).await;

    let dealer = Uuid::new_v4();
    let svc = &app.state.services;

    let created = svc
        .requests
        .create(dealer, create_input(product.id, 50))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert_eq!(reservations.len(), 2);
    let wh_res = reservations
        .iter()
        .find(|r| r.source_type == "warehouse")
        .unwrap();
    let sup_res = reservations
        .iter()
        .find(|r| r.source_type == "supplier")
        .unwrap();
    assert_eq!(wh_res.quantity, 30);
    assert_eq!(sup_res.quantity, 20);
    assert_eq!(sup_res.status, ReservationStatus::SupplierPending.as_str());

    svc.requests.start_picking(created.id).await.unwrap();
    svc.reservations
        .pick(wh_res.id, Uuid::new_v4())
        .await
        .unwrap();
    svc.inspections
        .submit(
            Uuid::new_v4(),
            SubmitInspectionInput {
                reservation_id: wh_res.id,
                filename: "pallet-1.jpg".into(),
                image_type: "pallet".into(),
                verdict: ok_verdict(dec!(93)),
            },
        )
        .await
        .unwrap();

    // The warehouse half is done; the supplier half still gates allocation.
    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "PICKING");
    let err = svc.logistics.allocate(created.id, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStateTransition(_)));

    svc.reservations.confirm_supplier(sup_res.id).await.unwrap();
    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");

    let shipments = svc.logistics.allocate(created.id, None).await.unwrap();
    assert_eq!(shipments.len(), 2);
}

#[tokio::test]
async fn unfulfillable_plan_cannot_be_confirmed() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-300", 1).await;
    let warehouse = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(warehouse.id, product.id, 5).await;

    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product.id, 50))
        .await
        .unwrap();

    let err = svc
        .requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // Nothing was reserved by the failed confirmation.
    let line = app.stock_line(warehouse.id, product.id).await;
    assert_eq!(line.reserved_quantity, 0);
    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "AWAITING_RECOMMENDATION");

    let sent = svc
        .requests
        .confirm(created.id, ConfirmAction::SendToProcurement)
        .await
        .unwrap();
    assert_eq!(sent.status, "AWAITING_PROCUREMENT_APPROVAL");
}

#[tokio::test]
async fn cancellation_releases_warehouse_holds() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-400", 1).await;
    let warehouse = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(warehouse.id, product.id, 50).await;

    let svc = &app.state.services;
    let created = svc
        .requests
        .create(Uuid::new_v4(), create_input(product.id, 30))
        .await
        .unwrap();
    svc.requests
        .confirm(created.id, ConfirmAction::Confirm)
        .await
        .unwrap();
    assert_eq!(
        app.stock_line(warehouse.id, product.id).await.reserved_quantity,
        30
    );

    let cancelled = svc.requests.cancel_with_release(created.id).await.unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    let line = app.stock_line(warehouse.id, product.id).await;
    assert_eq!(line.quantity, 50);
    assert_eq!(line.reserved_quantity, 0);

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert!(!reservations.is_empty());
    for res in &reservations {
        assert_eq!(res.status, ReservationStatus::Cancelled.as_str());
        assert_eq!(res.lifecycle, Lifecycle::Retired.as_str());
    }

    // Terminal states reject further work.
    let err = svc.requests.start_picking(created.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn http_surface_enforces_roles_and_visibility() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-500", 1).await;
    let warehouse = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(warehouse.id, product.id, 100).await;

    let dealer = Uuid::new_v4();
    let body = json!({
        "product_id": product.id,
        "quantity": 20,
        "delivery_location": "Av. Ipiranga 6681, Porto Alegre",
        "delivery_city": "Porto Alegre",
        "delivery_state": "RS"
    });

    // Only dealers open requests.
    let response = app
        .request(
            Method::POST,
            "/api/v1/requests",
            Uuid::new_v4(),
            "warehouse",
            Some(body.clone()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::POST, "/api/v1/requests", dealer, "dealer", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["success"], json!(true));
    let request_id = payload["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(payload["data"]["status"], json!("AWAITING_RECOMMENDATION"));

    // Another dealer cannot see it; admin can.
    let path = format!("/api/v1/requests/{}", request_id);
    let response = app
        .request(Method::GET, &path, Uuid::new_v4(), "dealer", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = app
        .request(Method::GET, &path, Uuid::new_v4(), "admin", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Confirm over HTTP; the owning dealer drives the decision.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{}/confirm", request_id),
            dealer,
            "dealer",
            Some(json!({ "action": "confirm" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["data"]["status"], json!("RESERVED"));

    // Validation failures surface as 400.
    let response = app
        .request(
            Method::POST,
            "/api/v1/requests",
            dealer,
            "dealer",
            Some(json!({
                "product_id": product.id,
                "quantity": 0,
                "delivery_location": "x"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown status filters are rejected rather than ignored.
    let response = app
        .request(
            Method::GET,
            "/api/v1/requests?status=SHIPPED",
            dealer,
            "dealer",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_identity_headers_are_unauthorized() {
    let app = TestApp::new().await;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/requests")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // An unknown role is rejected the same way.
    let response = app
        .request(Method::GET, "/api/v1/requests", Uuid::new_v4(), "janitor", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
