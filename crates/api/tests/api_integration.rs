//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use accounting::InMemoryAccountingService;
use api::AppState;
use api::config::Config;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::FixedClock;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// 2026-03-09 07:00 in Guayaquil.
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap()
}

struct TestApp {
    app: Router,
    clock: Arc<FixedClock>,
    accounting: InMemoryAccountingService,
}

fn setup() -> TestApp {
    let clock = Arc::new(FixedClock::new(start()));
    let accounting = InMemoryAccountingService::new();
    let state = Arc::new(AppState::with_clock(
        InMemoryOrderStore::new(),
        Arc::new(accounting.clone()),
        clock.clone(),
        &Config::default(),
    ));
    TestApp {
        app: api::create_app(state, get_metrics_handle(), &[]),
        clock,
        accounting,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_order(&self, body: Value) -> Value {
        let (status, json) = self.send("POST", "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["order"].clone()
    }
}

fn pickup_order(products: Value) -> Value {
    json!({
        "deliveryDate": "2026-03-10T15:00:00Z",
        "deliveryTime": "10:00",
        "customerName": "Ana Torres",
        "deliveryType": "pickup",
        "branch": "San Marino",
        "products": products
    })
}

fn invoiced_order() -> Value {
    let mut order = pickup_order(json!([{"name": "Tarta", "quantity": 2, "price": 1500}]));
    order["invoiceNeeded"] = json!(true);
    order["invoiceData"] = json!({
        "ruc": "0912345678",
        "businessName": "Ana Torres",
        "email": "ana@example.com",
        "address": "Urdesa"
    });
    order
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();
    let (status, json) = t.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let t = setup();
    let (status, json) = t
        .send(
            "POST",
            "/orders",
            Some(pickup_order(json!([{"name": "Tarta", "quantity": 2, "price": 1500}]))),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(!json["confirmationMessage"].as_str().unwrap().is_empty());
    assert_eq!(json["order"]["productionStage"], "PENDING");
    assert_eq!(json["order"]["dispatchStatus"], "NOT_SENT");
    assert_eq!(json["order"]["totalValue"], 3000);

    let id = json["order"]["id"].as_str().unwrap();
    let (status, fetched) = t.send("GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["customerName"], "Ana Torres");

    let (status, list) = t.send("GET", "/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_order_is_rejected() {
    let t = setup();
    let (status, json) = t.send("POST", "/orders", Some(pickup_order(json!([])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("products"));

    let mut delivery = pickup_order(json!([{"name": "Tarta", "quantity": 1, "price": 100}]));
    delivery["deliveryType"] = json!("delivery");
    let (status, _) = t.send("POST", "/orders", Some(delivery)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_nonexistent_and_invalid_order() {
    let t = setup();
    let id = common::OrderId::new();
    let (status, json) = t.send("GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = t.send("GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_production_progress_fifo() {
    let t = setup();
    let first = t
        .create_order(pickup_order(json!([{"name": "Tarta", "quantity": 10, "price": 100}])))
        .await;
    let mut later = pickup_order(json!([{"name": "tarta", "quantity": 5, "price": 100}]));
    later["deliveryDate"] = json!("2026-03-11T15:00:00Z");
    let second = t.create_order(later).await;

    let (status, outcome) = t
        .send(
            "POST",
            "/production/progress",
            Some(json!({"productName": "Tarta", "quantityMade": 12})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({"distributed": 12, "remaining": 0}));

    let (_, first) = t
        .send("GET", &format!("/orders/{}", first["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(first["productionStage"], "FINISHED");
    let (_, second) = t
        .send("GET", &format!("/orders/{}", second["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(second["products"][0]["produced"], 2);
    assert_eq!(second["productionStage"], "IN_PROCESS");

    let (status, json) = t
        .send(
            "POST",
            "/production/progress",
            Some(json!({"productName": "Tarta", "quantityMade": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
}

#[tokio::test]
async fn test_production_task_updates() {
    let t = setup();
    let order = t
        .create_order(pickup_order(json!([{"name": "Pan", "quantity": 4, "price": 50}])))
        .await;
    let id = order["id"].as_str().unwrap();
    let line_id = order["products"][0]["id"].as_str().unwrap();

    let (status, _) = t
        .send("PATCH", &format!("/production/{id}"), Some(json!({"stage": "DELAYED"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .send("PATCH", &format!("/production/{id}"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = t
        .send(
            "PATCH",
            &format!("/production/{id}/items/{line_id}"),
            Some(json!({"status": "COMPLETED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["productionStage"], "FINISHED");
    assert_eq!(json["products"][0]["produced"], 4);

    let missing = common::OrderId::new();
    let (status, json) = t
        .send(
            "PATCH",
            "/production/batch",
            Some(json!({"orderIds": [id, missing.to_string()], "notes": "sin azúcar"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], json!([id]));
    assert_eq!(json["missing"], json!([missing.to_string()]));

    let (status, tasks) = t.send("GET", "/production", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks[0]["productionNotes"], "sin azúcar");

    let (status, aggregated) = t.send("GET", "/production/aggregated", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(aggregated["today"].is_array());
}

#[tokio::test]
async fn test_dispatch_flow() {
    let t = setup();
    let order = t
        .create_order(pickup_order(json!([{"name": "Tarta", "quantity": 3, "price": 100}])))
        .await;
    let id = order["id"].as_str().unwrap();
    let line_id = order["products"][0]["id"].as_str().unwrap();

    t.send(
        "POST",
        "/production/progress",
        Some(json!({"productName": "Tarta", "quantityMade": 3})),
    )
    .await;

    let (status, outcomes) = t
        .send(
            "POST",
            "/dispatch/progress",
            Some(json!({"destination": "San Marino", "items": [{"name": "Tarta", "quantity": 5}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        outcomes,
        json!([{"item": "Tarta", "requested": 5, "distributed": 3, "remaining": 2}])
    );

    let (_, order) = t.send("GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["dispatchStatus"], "SENT");

    // Hand-entered overshipment
    let (status, created) = t
        .send(
            "POST",
            &format!("/orders/{id}/dispatches"),
            Some(json!({
                "destination": "San Marino",
                "items": [{"lineItemId": line_id, "quantitySent": 1}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order"]["dispatchStatus"], "PROBLEM");
    let dispatch_id = created["dispatchId"].as_str().unwrap();

    let (status, edited) = t
        .send(
            "PUT",
            &format!("/orders/{id}/dispatches/{dispatch_id}"),
            Some(json!({
                "items": [{"lineItemId": line_id, "quantitySent": 0}],
                "notes": "corregido"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["dispatchStatus"], "SENT");

    t.clock.advance(Duration::hours(2));
    let (status, json) = t
        .send(
            "PUT",
            &format!("/orders/{id}/dispatches/{dispatch_id}"),
            Some(json!({"notes": "tarde"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_invoice_and_collection() {
    let t = setup();
    let order = t.create_order(invoiced_order()).await;
    let id = order["id"].as_str().unwrap();
    assert_eq!(order["invoiceStatus"], "PENDING");

    let (status, report) = t.send("POST", "/orders/batch-invoice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 1);
    assert_eq!(report["totalPending"], 1);
    assert_eq!(report["remaining"], 0);
    assert_eq!(t.accounting.invoices().await.len(), 1);

    let (status, _) = t
        .send(
            "PUT",
            &format!("/orders/{id}/invoice"),
            Some(json!({"invoiceNeeded": false})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, paid) = t
        .send(
            "POST",
            &format!("/orders/{id}/collection"),
            Some(json!({"method": "TRA", "amount": 3450, "date": "2026-03-09"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["collectionStatus"], "PROCESSED");

    t.accounting.set_fail_on_collection(true).await;
    let (status, _) = t
        .send(
            "POST",
            &format!("/orders/{id}/collection"),
            Some(json!({"method": "TRA", "amount": 3450, "date": "2026-03-09"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, order) = t.send("GET", &format!("/orders/{id}"), None).await;
    assert_eq!(order["collectionStatus"], "ERROR");

    let (status, docs) = t
        .send("GET", "/documents?fecha_emision=09/03/2026", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(docs["count"], 1);
    assert_eq!(docs["totalSales"], 3450);
}

#[tokio::test]
async fn test_reports_and_analytics() {
    let t = setup();
    t.create_order(pickup_order(json!([{"name": "Tarta", "quantity": 2, "price": 1500}])))
        .await;

    let (status, stats) = t
        .send("GET", "/reports/stats?from=2026-03-10&to=2026-03-10", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalOrders"], 1);
    assert_eq!(stats["unitsOrdered"], 2);

    let (status, _) = t.send("GET", "/reports/stats?from=yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    t.accounting
        .add_document(json!({"id": "d1", "fecha_emision": "01/03/2026", "total": "12.00"}))
        .await;
    let (status, sync) = t
        .send(
            "POST",
            "/analytics/sync",
            Some(json!({"from": "01/03/2026", "to": "02/03/2026"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sync["syncedDays"], 2);

    let (status, _) = t
        .send(
            "POST",
            "/analytics/sync",
            Some(json!({"from": "2026-03-02", "to": "2026-03-01"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, dashboard) = t.send("GET", "/analytics/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["totalSales"], 1200);
    assert_eq!(dashboard["transactionCount"], 1);
    assert_eq!(dashboard["dailyBreakdown"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_accounting_lookups() {
    let t = setup();
    let (status, _) = t.send("GET", "/persons", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = t
        .send(
            "POST",
            "/persons",
            Some(json!({
                "razon_social": "Panadería Sol",
                "ruc": "0912345678001",
                "email": "sol@example.com",
                "direccion": "Urdesa",
                "telefonos": "042000000"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());

    let (status, found) = t.send("GET", "/persons?search=sol", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, _) = t.send("GET", "/persons?identificacion=0000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.send("POST", "/persons", Some(json!({"ruc": "1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    t.accounting
        .add_product(json!({"id": "p1", "nombre": "Tarta de chocolate"}))
        .await;
    let (status, products) = t.send("GET", "/products?filtro=tarta", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().unwrap().len(), 1);
}
