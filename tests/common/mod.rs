use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use supplyline_api::{
    config::AppConfig,
    entities::{product, supplier, supplier_stock, warehouse, warehouse_stock},
    events::{self, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 18_080,
        environment: "test".into(),
        log_level: "warn".into(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        event_channel_capacity: 64,
        inspection: Default::default(),
        planner: Default::default(),
        stale_report: Default::default(),
    }
}

/// Application harness backed by an in-memory SQLite database. A single pool
/// connection keeps the whole test on one database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = test_config();

        let mut options = ConnectOptions::new(cfg.database_url.clone());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("failed to open in-memory database");
        Migrator::up(&db, None).await.expect("migrations failed");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), event_sender.clone(), &cfg)
            .expect("failed to build services");
        let state = AppState {
            db,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", supplyline_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user_id: Uuid,
        role: &str,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", role);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(json.to_string()))
                    .expect("request body")
            }
            None => builder.body(Body::empty()).expect("request body"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn seed_product(&self, sku: &str, min_order_quantity: i32) -> product::Model {
        product::ActiveModel {
            sku: Set(sku.to_string()),
            name: Set(format!("Product {}", sku)),
            unit: Set("unit".into()),
            min_order_quantity: Set(min_order_quantity),
            unit_price: Set(dec!(25.00)),
            currency: Set("USD".into()),
            requires_inspection: Set(true),
            shelf_life_days: Set(None),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_warehouse(&self, code: &str, city: &str, state: &str) -> warehouse::Model {
        warehouse::ActiveModel {
            code: Set(code.to_string()),
            name: Set(format!("Warehouse {}", code)),
            city: Set(city.to_string()),
            state: Set(state.to_string()),
            country: Set("BR".into()),
            address: Set(None),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed warehouse")
    }

    pub async fn seed_stock(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> warehouse_stock::Model {
        warehouse_stock::ActiveModel {
            warehouse_id: Set(warehouse_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            reserved_quantity: Set(0),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed stock line")
    }

    pub async fn seed_supplier(&self, code: &str, lead_time_days: i32) -> supplier::Model {
        supplier::ActiveModel {
            code: Set(code.to_string()),
            name: Set(format!("Supplier {}", code)),
            country: Set("CN".into()),
            city: Set(None),
            lead_time_days: Set(lead_time_days),
            reliability_score: Set(dec!(90.0)),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed supplier")
    }

    pub async fn seed_supplier_line(
        &self,
        supplier_id: Uuid,
        product_id: Uuid,
        available_quantity: i32,
    ) -> supplier_stock::Model {
        supplier_stock::ActiveModel {
            supplier_id: Set(supplier_id),
            product_id: Set(product_id),
            available_quantity: Set(available_quantity),
            min_order_quantity: Set(1),
            unit_price: Set(dec!(20.00)),
            currency: Set("USD".into()),
            custom_lead_time_days: Set(None),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed supplier line")
    }

    pub async fn stock_line(
        &self,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> warehouse_stock::Model {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_stock::Column::ProductId.eq(product_id))
            .one(&*self.state.db)
            .await
            .expect("stock query")
            .expect("stock line exists")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
