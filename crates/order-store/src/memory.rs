use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::{
    DailySummary, OrderDocument, OrderId, OrderQuery, OrderSort, Result, StoreError, Version,
    store::{OrderStore, SaveOptions, SummaryStore},
};

/// In-memory order store for tests and database-less runs.
///
/// This implementation keeps every document in memory and provides the
/// same interface and concurrency semantics as the PostgreSQL store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderDocument>>>,
    summaries: Arc<RwLock<BTreeMap<NaiveDate, DailySummary>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders and summaries.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.summaries.write().await.clear();
    }
}

fn matches(query: &OrderQuery, doc: &OrderDocument) -> bool {
    if let Some(ref stages) = query.production_stages
        && !stages.contains(&doc.production_stage)
    {
        return false;
    }
    if let Some(ref excluded) = query.excluded_dispatch_statuses
        && excluded.contains(&doc.dispatch_status)
    {
        return false;
    }
    if let Some(ref name) = query.product_name
        && !doc.has_product(name)
    {
        return false;
    }
    if let Some(ref delivery_type) = query.delivery_type
        && &doc.delivery_type != delivery_type
    {
        return false;
    }
    if let Some(ref fragment) = query.branch_contains {
        let hit = doc
            .branch
            .as_ref()
            .is_some_and(|b| b.to_lowercase().contains(fragment.as_str()));
        if !hit {
            return false;
        }
    }
    if let Some(from) = query.delivery_from
        && doc.delivery_date < from
    {
        return false;
    }
    if let Some(to) = query.delivery_to
        && doc.delivery_date > to
    {
        return false;
    }
    if let Some(from) = query.created_from
        && doc.created_at < from
    {
        return false;
    }
    if let Some(to) = query.created_to
        && doc.created_at > to
    {
        return false;
    }
    if let Some(since) = query.updated_since
        && doc.updated_at < since
    {
        return false;
    }
    if let Some(needed) = query.invoice_needed
        && doc.invoice_needed != needed
    {
        return false;
    }
    if let Some(ref status) = query.invoice_status
        && doc.invoice_status.as_ref() != Some(status)
    {
        return false;
    }
    true
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, mut document: OrderDocument) -> Result<Version> {
        let mut orders = self.orders.write().await;

        if let Some(existing) = orders.get(&document.id) {
            return Err(StoreError::ConcurrencyConflict {
                order_id: document.id,
                expected: Version::initial(),
                actual: existing.version,
            });
        }

        document.version = Version::first();
        orders.insert(document.id, document);
        Ok(Version::first())
    }

    async fn save(&self, mut document: OrderDocument, options: SaveOptions) -> Result<Version> {
        let mut orders = self.orders.write().await;

        let current = orders
            .get(&document.id)
            .map(|d| d.version)
            .ok_or(StoreError::NotFound(document.id))?;

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                order_id: document.id,
                expected,
                actual: current,
            });
        }

        let new_version = current.next();
        document.version = new_version;
        orders.insert(document.id, document);
        Ok(new_version)
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderDocument>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find(&self, query: OrderQuery) -> Result<Vec<OrderDocument>> {
        let orders = self.orders.read().await;
        let mut found: Vec<_> = orders
            .values()
            .filter(|doc| matches(&query, doc))
            .cloned()
            .collect();

        match query.sort {
            OrderSort::DeliveryDateAsc => found.sort_by(|a, b| {
                a.delivery_date
                    .cmp(&b.delivery_date)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.id.cmp(&b.id))
            }),
            OrderSort::CreatedAtDesc => found.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then(a.id.cmp(&b.id))
            }),
        }

        // Apply offset and limit
        let offset = query.offset.unwrap_or(0);
        let found = found.into_iter().skip(offset);
        let found = match query.limit {
            Some(limit) => found.take(limit).collect(),
            None => found.collect(),
        };

        Ok(found)
    }

    async fn count(&self, query: OrderQuery) -> Result<usize> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|doc| matches(&query, doc)).count())
    }
}

#[async_trait]
impl SummaryStore for InMemoryOrderStore {
    async fn upsert_summary(&self, summary: DailySummary) -> Result<()> {
        self.summaries.write().await.insert(summary.date, summary);
        Ok(())
    }

    async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>> {
        if from > to {
            return Ok(Vec::new());
        }
        let summaries = self.summaries.read().await;
        Ok(summaries.range(from..=to).map(|(_, s)| s.clone()).collect())
    }
}
