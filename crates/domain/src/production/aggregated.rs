use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use common::OrderId;
use order_store::normalize_name;
use serde::Serialize;

use crate::order::{Order, ProductionStage};

/// Pending production grouped by delivery day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedItems {
    /// Due today, plus anything overdue.
    pub today: Vec<ProductDemand>,
    pub tomorrow: Vec<ProductDemand>,
    pub future: Vec<ProductDemand>,
}

/// Units of one product still to be produced, with the orders that need them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDemand {
    pub name: String,
    pub total_pending: u32,
    pub orders: Vec<OrderDemand>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDemand {
    pub order_id: OrderId,
    pub customer_name: String,
    pub delivery_date: DateTime<Utc>,
    pub delivery_time: String,
    pub production_stage: ProductionStage,
    pub pending: u32,
}

#[derive(Default)]
struct Bucket {
    products: BTreeMap<String, ProductDemand>,
}

impl Bucket {
    fn add(&mut self, order: &Order, display_name: &str, key: String, pending: u32) {
        let demand = self.products.entry(key).or_insert_with(|| ProductDemand {
            name: display_name.to_string(),
            total_pending: 0,
            orders: Vec::new(),
        });
        demand.total_pending += pending;

        match demand.orders.iter_mut().find(|o| o.order_id == order.id()) {
            Some(existing) => existing.pending += pending,
            None => demand.orders.push(OrderDemand {
                order_id: order.id(),
                customer_name: order.customer_name().to_string(),
                delivery_date: order.delivery_date(),
                delivery_time: order.delivery_time().to_string(),
                production_stage: order.production_stage(),
                pending,
            }),
        }
    }

    fn into_vec(self) -> Vec<ProductDemand> {
        self.products.into_values().collect()
    }
}

/// Groups the unproduced units of `orders` by product and local delivery day.
///
/// Orders keep the order they are given in within each product.
pub fn aggregate_pending(orders: &[Order], tz: Tz, today: NaiveDate) -> AggregatedItems {
    let tomorrow = today.succ_opt().unwrap_or(today);
    let mut buckets: [Bucket; 3] = Default::default();

    for order in orders.iter().filter(|o| o.production_stage().is_active()) {
        let day = order.delivery_date().with_timezone(&tz).date_naive();
        let bucket = if day <= today {
            &mut buckets[0]
        } else if day == tomorrow {
            &mut buckets[1]
        } else {
            &mut buckets[2]
        };

        for line in order.products().iter().filter(|l| l.pending() > 0) {
            bucket.add(order, &line.name, normalize_name(&line.name), line.pending());
        }
    }

    let [due_today, due_tomorrow, later] = buckets;
    AggregatedItems {
        today: due_today.into_vec(),
        tomorrow: due_tomorrow.into_vec(),
        future: later.into_vec(),
    }
}
