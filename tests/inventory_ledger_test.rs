mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{response_json, TestApp};
use supplyline_api::entities::reservation::ReservationStatus;
use supplyline_api::errors::ServiceError;
use supplyline_api::services::inventory::{
    commit_stock_line, release_stock_line, reserve_stock_line,
};
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

#[tokio::test]
async fn holds_never_overdraw_a_stock_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-700", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 10).await;
    let db = &*app.state.db;

    reserve_stock_line(db, wh.id, product.id, 6).await.unwrap();
    let line = app.stock_line(wh.id, product.id).await;
    assert_eq!(line.reserved_quantity, 6);
    assert_eq!(line.available(), 4);

    // Only 4 left: the conditional update refuses and deducts nothing.
    let err = reserve_stock_line(db, wh.id, product.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
    assert_eq!(app.stock_line(wh.id, product.id).await.reserved_quantity, 6);

    reserve_stock_line(db, wh.id, product.id, 4).await.unwrap();
    assert_eq!(app.stock_line(wh.id, product.id).await.available(), 0);

    release_stock_line(db, wh.id, product.id, 10).await.unwrap();
    let line = app.stock_line(wh.id, product.id).await;
    assert_eq!(line.quantity, 10);
    assert_eq!(line.reserved_quantity, 0);

    // Releasing a hold that does not exist is a ledger bug, not a no-op.
    let err = release_stock_line(db, wh.id, product.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ConsistencyViolation(_)));
}

#[tokio::test]
async fn commit_requires_a_matching_hold() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-710", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 10).await;
    let db = &*app.state.db;

    reserve_stock_line(db, wh.id, product.id, 4).await.unwrap();

    let err = commit_stock_line(db, wh.id, product.id, 6)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ConsistencyViolation(_)));

    commit_stock_line(db, wh.id, product.id, 4).await.unwrap();
    let line = app.stock_line(wh.id, product.id).await;
    assert_eq!(line.quantity, 6);
    assert_eq!(line.reserved_quantity, 0);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-720", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 10).await;
    let db = &*app.state.db;

    for qty in [0, -3] {
        assert!(matches!(
            reserve_stock_line(db, wh.id, product.id, qty).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            release_stock_line(db, wh.id, product.id, qty).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            commit_stock_line(db, wh.id, product.id, qty).await,
            Err(ServiceError::ValidationError(_))
        ));
    }
}

#[tokio::test]
async fn receiving_stock_creates_or_tops_up_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-730", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    let svc = &app.state.services;

    // No line yet: the first receipt creates one.
    let line = svc
        .inventory
        .receive_stock(wh.id, product.id, 30, Some("B-001".into()), None, None)
        .await
        .unwrap();
    assert_eq!(line.quantity, 30);
    assert_eq!(line.reserved_quantity, 0);
    assert_eq!(line.batch_number.as_deref(), Some("B-001"));

    let line = svc
        .inventory
        .receive_stock(wh.id, product.id, 20, None, None, None)
        .await
        .unwrap();
    assert_eq!(line.quantity, 50);

    // Over HTTP the warehouse role receives; dealers do not.
    let path = format!("/api/v1/warehouses/{}/stock", wh.id);
    let body = json!({ "product_id": product.id, "quantity": 25 });
    let response = app
        .request(Method::POST, &path, Uuid::new_v4(), "dealer", Some(body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::POST, &path, Uuid::new_v4(), "warehouse", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["data"]["quantity"], json!(75));

    let response = app
        .request(
            Method::POST,
            &path,
            Uuid::new_v4(),
            "warehouse",
            Some(json!({ "product_id": product.id, "quantity": 0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn supplier_reservations_are_not_pickable() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-740", 1).await;
    let supplier = app.seed_supplier("SUP-CN", 14).await;
    app.seed_supplier_line(supplier.id, product.id, 500).await;

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

    let reservations = svc.reservations.list_for_request(created.id).await.unwrap();
    assert_eq!(reservations.len(), 1);
    let sup_res = &reservations[0];
    assert_eq!(sup_res.source_type, "supplier");

    let err = svc
        .reservations
        .pick(sup_res.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn mark_ready_overrides_a_stuck_source() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-750", 1).await;
    let supplier = app.seed_supplier("SUP-CN", 14).await;
    app.seed_supplier_line(supplier.id, product.id, 500).await;

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
    let res_id = svc.reservations.list_for_request(created.id).await.unwrap()[0].id;

    // The supplier never acknowledges; procurement forces the source through.
    let operator = Uuid::new_v4();
    let forced = svc
        .reservations
        .mark_ready(res_id, operator, Some("supplier confirmed by phone".into()))
        .await
        .unwrap();
    assert_eq!(forced.status, ReservationStatus::Ready.as_str());
    assert!(!forced.is_blocked);
    let audit = forced.resolution_notes.unwrap();
    assert!(audit.contains(&operator.to_string()));
    assert!(audit.contains("by phone"));

    let request = svc.requests.get(created.id).await.unwrap();
    assert_eq!(request.status, "READY_FOR_ALLOCATION");

    // Already-ready sources are a no-op, not an error.
    let again = svc
        .reservations
        .mark_ready(res_id, operator, None)
        .await
        .unwrap();
    assert_eq!(again.status, ReservationStatus::Ready.as_str());
}

#[tokio::test]
async fn catalog_endpoints_list_warehouses_and_suppliers() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-760", 1).await;
    let wh = app.seed_warehouse("POA", "Porto Alegre", "RS").await;
    app.seed_stock(wh.id, product.id, 40).await;
    let supplier = app.seed_supplier("SUP-CN", 14).await;
    app.seed_supplier_line(supplier.id, product.id, 500).await;

    let response = app
        .request(Method::GET, "/api/v1/warehouses", Uuid::new_v4(), "dealer", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["data"][0]["code"], json!("POA"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/warehouses/{}/stock", wh.id),
            Uuid::new_v4(),
            "logistics",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["data"][0]["quantity"], json!(40));
    assert_eq!(payload["data"][0]["available"], json!(40));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/suppliers/{}/lines", supplier.id),
            Uuid::new_v4(),
            "procurement",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response_json(response).await;
    assert_eq!(payload["data"][0]["available_quantity"], json!(500));
    assert_eq!(payload["data"][0]["lead_time_days"], json!(14));
}
