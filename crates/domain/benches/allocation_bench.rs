use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    DispatchService, NewOrder, Order, OrderRepository, OrderService, ProductionService,
    ReportedItem, production::aggregate_pending,
};
use order_store::InMemoryOrderStore;
use serde_json::json;

fn new_order(days_out: i64, quantity: u32) -> NewOrder {
    serde_json::from_value(json!({
        "deliveryDate": Utc::now() + Duration::days(days_out),
        "deliveryTime": "10:00",
        "customerName": "Bench",
        "deliveryType": "pickup",
        "branch": "San Marino",
        "products": [
            {"name": "Pan", "quantity": quantity, "price": 100},
            {"name": "Tarta", "quantity": 1, "price": 1500}
        ],
    }))
    .unwrap()
}

/// Builds a store with `count` open orders for "Pan".
fn seeded(rt: &tokio::runtime::Runtime, count: i64) -> OrderRepository<InMemoryOrderStore> {
    let repo = OrderRepository::new(InMemoryOrderStore::new());
    let orders = OrderService::new(repo.clone(), chrono_tz::America::Guayaquil, "Bench");
    rt.block_on(async {
        for i in 0..count {
            orders.create_order(new_order(i % 7, 10)).await.unwrap();
        }
    });
    repo
}

fn bench_production_allocation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("allocation/production_fifo_50_orders", |b| {
        b.iter_batched(
            || seeded(&rt, 50),
            |repo| {
                let service = ProductionService::new(repo, chrono_tz::America::Guayaquil);
                rt.block_on(async { service.register_progress("Pan", 480).await.unwrap() })
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

fn bench_dispatch_reconciliation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("allocation/dispatch_fifo_50_orders", |b| {
        b.iter_batched(
            || {
                let repo = seeded(&rt, 50);
                let production = ProductionService::new(repo.clone(), chrono_tz::America::Guayaquil);
                rt.block_on(async { production.register_progress("Pan", 500).await.unwrap() });
                repo
            },
            |repo| {
                let service = DispatchService::new(repo);
                let items = vec![ReportedItem {
                    name: "Pan".to_string(),
                    quantity: 480,
                }];
                rt.block_on(async { service.register_progress("San Marino", items).await.unwrap() })
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let now = Utc::now();
    let orders: Vec<Order> = (0..200)
        .map(|i| Order::place(new_order(i % 7, 10), now).unwrap())
        .collect();
    let today = now.date_naive();

    c.bench_function("allocation/aggregate_200_orders", |b| {
        b.iter(|| aggregate_pending(&orders, chrono_tz::America::Guayaquil, today));
    });
}

criterion_group!(
    benches,
    bench_production_allocation,
    bench_dispatch_reconciliation,
    bench_aggregation,
);
criterion_main!(benches);
