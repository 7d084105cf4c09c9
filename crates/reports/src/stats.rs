//! Order statistics over a delivery-date range.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use domain::{Money, Order, OrderRepository};
use order_store::{OrderQuery, OrderStore, normalize_name};
use serde::Serialize;

use crate::error::Result;
use crate::range::DateRange;

/// Totals for one product across the orders in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    /// Name as first seen, grouping is case-insensitive.
    pub name: String,
    pub ordered: u64,
    pub produced: u64,
    pub sent: u64,
    pub sales: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub range: DateRange,
    pub total_orders: usize,
    pub total_sales: Money,
    pub units_ordered: u64,
    pub units_produced: u64,
    pub units_sent: u64,
    pub by_production_stage: BTreeMap<String, usize>,
    pub by_dispatch_status: BTreeMap<String, usize>,
    /// Orders that never asked for an invoice count as `NOT_REQUESTED`.
    pub by_invoice_status: BTreeMap<String, usize>,
    /// Sorted by units ordered, most first.
    pub products: Vec<ProductStats>,
}

impl ReportStats {
    fn empty(range: DateRange) -> Self {
        Self {
            range,
            total_orders: 0,
            total_sales: Money::zero(),
            units_ordered: 0,
            units_produced: 0,
            units_sent: 0,
            by_production_stage: BTreeMap::new(),
            by_dispatch_status: BTreeMap::new(),
            by_invoice_status: BTreeMap::new(),
            products: Vec::new(),
        }
    }

    fn add(&mut self, order: &Order, products: &mut BTreeMap<String, ProductStats>) {
        self.total_orders += 1;
        self.total_sales += order.total_value();
        *self
            .by_production_stage
            .entry(order.production_stage().as_str().to_string())
            .or_default() += 1;
        *self
            .by_dispatch_status
            .entry(order.dispatch_status().as_str().to_string())
            .or_default() += 1;
        let invoice = order
            .invoice_status()
            .map_or("NOT_REQUESTED", |s| s.as_str());
        *self.by_invoice_status.entry(invoice.to_string()).or_default() += 1;

        for line in order.products() {
            let sent = order.sent_for_line(line.id);
            self.units_ordered += u64::from(line.quantity);
            self.units_produced += u64::from(line.produced);
            self.units_sent += sent;

            let entry = products
                .entry(normalize_name(&line.name))
                .or_insert_with(|| ProductStats {
                    name: line.name.trim().to_string(),
                    ordered: 0,
                    produced: 0,
                    sent: 0,
                    sales: Money::zero(),
                });
            entry.ordered += u64::from(line.quantity);
            entry.produced += u64::from(line.produced);
            entry.sent += sent;
            entry.sales += line.line_total();
        }
    }
}

pub struct ReportService<S: OrderStore> {
    repo: OrderRepository<S>,
    tz: Tz,
}

impl<S: OrderStore> ReportService<S> {
    pub fn new(repo: OrderRepository<S>, tz: Tz) -> Self {
        Self { repo, tz }
    }

    /// Figures for orders delivered between `from` and `to` (business-local
    /// days, inclusive). Defaults to the last 30 days.
    #[tracing::instrument(skip(self))]
    pub async fn get_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<ReportStats> {
        let today = self.repo.now().with_timezone(&self.tz).date_naive();
        let range = DateRange::or_last_days(from, to, today)?;
        let (start, end) = range.bounds(self.tz);

        let orders = self
            .repo
            .find(OrderQuery::new().delivery_from(start).delivery_to(end))
            .await?;

        let mut stats = ReportStats::empty(range);
        let mut products = BTreeMap::new();
        for order in &orders {
            stats.add(order, &mut products);
        }

        stats.products = products.into_values().collect();
        stats
            .products
            .sort_by(|a, b| b.ordered.cmp(&a.ordered).then_with(|| a.name.cmp(&b.name)));

        tracing::debug!(
            orders = stats.total_orders,
            from = %range.from,
            to = %range.to,
            "report stats computed"
        );
        Ok(stats)
    }
}
