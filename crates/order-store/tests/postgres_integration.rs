//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables
//! between tests, so they run serially. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use order_store::{
    DailySummary, OrderDocument, OrderId, OrderQuery, OrderSort, OrderStore, OrderStoreExt,
    PostgresOrderStore, SaveOptions, StoreError, SummaryStore, Version, normalize_name,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, daily_summaries")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn create_test_document(days_ahead: i64, products: &[&str]) -> OrderDocument {
    let now = Utc::now();
    OrderDocument {
        id: OrderId::new(),
        version: Version::initial(),
        delivery_date: now + Duration::days(days_ahead),
        production_stage: "PENDING".to_string(),
        dispatch_status: "NOT_SENT".to_string(),
        delivery_type: "pickup".to_string(),
        branch: Some("San Marino".to_string()),
        product_names: products.iter().map(|p| normalize_name(p)).collect(),
        invoice_needed: false,
        invoice_status: None,
        created_at: now,
        updated_at: now,
        body: serde_json::json!({"customerName": "Ana"}),
    }
}

#[tokio::test]
#[serial]
async fn insert_and_get_document() {
    let store = get_test_store().await;
    let doc = create_test_document(1, &["Tarta"]);
    let id = doc.id;

    let version = store.insert(doc).await.unwrap();
    assert_eq!(version, Version::first());

    let stored = store.get_required(id).await.unwrap();
    assert_eq!(stored.version, Version::first());
    assert_eq!(stored.product_names, vec!["tarta".to_string()]);
    assert_eq!(stored.body["customerName"], "Ana");
}

#[tokio::test]
#[serial]
async fn duplicate_insert_conflicts() {
    let store = get_test_store().await;
    let doc = create_test_document(1, &["Tarta"]);

    store.insert(doc.clone()).await.unwrap();
    let result = store.insert(doc).await;

    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
    ));
}

#[tokio::test]
#[serial]
async fn versioned_save() {
    let store = get_test_store().await;
    let mut doc = create_test_document(1, &["Tarta"]);
    store.insert(doc.clone()).await.unwrap();

    doc.production_stage = "IN_PROCESS".to_string();
    let version = store
        .save(doc.clone(), SaveOptions::expect_version(Version::first()))
        .await
        .unwrap();
    assert_eq!(version, Version::new(2));

    let stale = store
        .save(doc.clone(), SaveOptions::expect_version(Version::first()))
        .await;
    assert!(matches!(
        stale,
        Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
    ));

    let stored = store.get_required(doc.id).await.unwrap();
    assert_eq!(stored.production_stage, "IN_PROCESS");
}

#[tokio::test]
#[serial]
async fn save_missing_document() {
    let store = get_test_store().await;
    let doc = create_test_document(1, &["Tarta"]);

    let result = store.save(doc, SaveOptions::new()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn find_open_orders_for_product_in_fifo_order() {
    let store = get_test_store().await;

    let later = create_test_document(3, &["Tarta", "Pan"]);
    let sooner = create_test_document(1, &["tarta"]);
    let other = create_test_document(0, &["Pan"]);
    let mut done = create_test_document(0, &["Tarta"]);
    done.production_stage = "FINISHED".to_string();
    let (later_id, sooner_id) = (later.id, sooner.id);

    for doc in [later, sooner, other, done] {
        store.insert(doc).await.unwrap();
    }

    let query = OrderQuery::new()
        .production_stages(["PENDING", "IN_PROCESS", "DELAYED"])
        .product_name("TARTA ");
    let found = store.find(query.clone()).await.unwrap();

    let ids: Vec<_> = found.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![sooner_id, later_id]);
    assert_eq!(store.count(query).await.unwrap(), 2);
}

#[tokio::test]
#[serial]
async fn find_by_branch_and_dispatch_status() {
    let store = get_test_store().await;

    let mut mall = create_test_document(1, &["Tarta"]);
    mall.branch = Some("Mall del Sol".to_string());
    let mut sent = create_test_document(1, &["Tarta"]);
    sent.branch = Some("Mall del Sol".to_string());
    sent.dispatch_status = "SENT".to_string();
    let san_marino = create_test_document(1, &["Tarta"]);
    let mall_id = mall.id;

    for doc in [mall, sent, san_marino] {
        store.insert(doc).await.unwrap();
    }

    let query = OrderQuery::new()
        .exclude_dispatch_statuses(["SENT"])
        .delivery_type("pickup")
        .branch_contains("mall");
    let found = store.find(query).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, mall_id);
}

#[tokio::test]
#[serial]
async fn branch_fragment_is_matched_literally() {
    let store = get_test_store().await;

    let mut mall = create_test_document(1, &["Tarta"]);
    mall.branch = Some("Mall del Sol".to_string());
    let mall_id = mall.id;
    store.insert(mall).await.unwrap();
    store
        .insert(create_test_document(1, &["Tarta"]))
        .await
        .unwrap();

    for fragment in ["_", "%", "m_ll"] {
        let found = store
            .find(OrderQuery::new().branch_contains(fragment))
            .await
            .unwrap();
        assert!(found.is_empty(), "{fragment} matched {} orders", found.len());
    }

    let found = store
        .find(OrderQuery::new().branch_contains("DEL SOL"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, mall_id);
}

#[tokio::test]
#[serial]
async fn newest_first_with_limit() {
    let store = get_test_store().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let mut doc = create_test_document(1, &["Tarta"]);
        doc.created_at = Utc::now() + Duration::seconds(i);
        ids.push(doc.id);
        store.insert(doc).await.unwrap();
    }

    let query = OrderQuery::new().sort(OrderSort::CreatedAtDesc).limit(2);
    let found = store.find(query).await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id, ids[4]);
    assert_eq!(found[1].id, ids[3]);
}

#[tokio::test]
#[serial]
async fn summaries_upsert_by_date() {
    let store = get_test_store().await;
    let day = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();

    store
        .upsert_summary(DailySummary::new(day, 1200, 2, Utc::now()))
        .await
        .unwrap();
    store
        .upsert_summary(DailySummary::new(day, 4500, 5, Utc::now()))
        .await
        .unwrap();
    store
        .upsert_summary(DailySummary::new(day.succ_opt().unwrap(), 100, 1, Utc::now()))
        .await
        .unwrap();

    let found = store.summaries_between(day, day).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].total_sales_cents, 4500);
    assert_eq!(found[0].transaction_count, 5);

    let both = store
        .summaries_between(day, day + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(both.len(), 2);
}
