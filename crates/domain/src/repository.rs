//! Order persistence with optimistic concurrency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::OrderId;
use order_store::{OrderQuery, OrderStore, SaveOptions, StoreError, Version};

use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::order::{Order, OrderError};

/// Attempts per update before a concurrency conflict is surfaced.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Loads and saves orders.
///
/// Every update follows the same cycle:
/// 1. Load the order (or start from one the caller already loaded)
/// 2. Apply a mutation to it
/// 3. Save with the loaded version as the expected version
///
/// If another writer got there first, the cycle restarts from a fresh load,
/// up to `max_attempts` times.
pub struct OrderRepository<S: OrderStore> {
    store: S,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl<S: OrderStore + Clone> Clone for OrderRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: Arc::clone(&self.clock),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: OrderStore> OrderRepository<S> {
    /// Creates a repository backed by the wall clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a repository with the given time source.
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many times an update is attempted on conflict.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Stores a new order.
    pub async fn insert(&self, order: &mut Order) -> Result<Version, DomainError> {
        let document = order.to_document()?;
        let version = self.store.insert(document).await?;
        order.set_version(version);
        Ok(version)
    }

    /// Loads an order, failing with `NotFound` if it doesn't exist.
    pub async fn load(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.load_existing(order_id)
            .await?
            .ok_or(DomainError::NotFound(order_id))
    }

    /// Loads an order, returning None if it doesn't exist.
    pub async fn load_existing(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        match self.store.get(order_id).await? {
            Some(document) => Ok(Some(Order::from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Loads every order matching the query.
    pub async fn find(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        let documents = self.store.find(query).await?;
        documents
            .iter()
            .map(|doc| Order::from_document(doc).map_err(DomainError::from))
            .collect()
    }

    /// Counts orders matching the query.
    pub async fn count(&self, query: OrderQuery) -> Result<usize, DomainError> {
        Ok(self.store.count(query).await?)
    }

    /// Saves an order expecting the version it was loaded at.
    async fn save(&self, order: &mut Order) -> Result<Version, DomainError> {
        let previous_updated_at = order.updated_at();
        order.touch(self.clock.now());

        let document = order.to_document()?;
        let options = SaveOptions::expect_version(order.version());

        match self.store.save(document, options).await {
            Ok(version) => {
                order.set_version(version);
                Ok(version)
            }
            Err(e) => {
                order.touch(previous_updated_at);
                Err(e.into())
            }
        }
    }

    /// Loads an order, applies `mutation`, and saves it.
    pub async fn execute<T, F>(
        &self,
        order_id: OrderId,
        mutation: F,
    ) -> Result<(Order, T), DomainError>
    where
        F: FnMut(&mut Order) -> Result<T, OrderError>,
    {
        let order = self.load(order_id).await?;
        self.update(order, mutation).await
    }

    /// Applies `mutation` to an already loaded order and saves it.
    ///
    /// On a version conflict the order is reloaded and the mutation applied
    /// again, so it must compute its effect from the order it is given. An
    /// error from the mutation aborts without saving.
    pub async fn update<T, F>(
        &self,
        order: Order,
        mut mutation: F,
    ) -> Result<(Order, T), DomainError>
    where
        F: FnMut(&mut Order) -> Result<T, OrderError>,
    {
        let order_id = order.id();
        let mut order = order;
        let mut attempt = 1;

        loop {
            let output = mutation(&mut order)?;

            match self.save(&mut order).await {
                Ok(_) => return Ok((order, output)),
                Err(DomainError::Store(StoreError::ConcurrencyConflict {
                    expected, actual, ..
                })) if attempt < self.max_attempts => {
                    tracing::debug!(
                        %order_id,
                        %expected,
                        %actual,
                        attempt,
                        "version conflict, retrying order update"
                    );
                    metrics::counter!("store_conflict_retries_total").increment(1);
                    attempt += 1;
                    order = self.load(order_id).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use order_store::{InMemoryOrderStore, OrderDocument, Result as StoreResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::clock::FixedClock;
    use crate::order::fixtures::new_order;

    /// Store wrapper that bumps the stored version behind the caller's back
    /// before the first `conflicts` saves.
    #[derive(Clone)]
    struct RacingStore {
        inner: InMemoryOrderStore,
        conflicts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl OrderStore for RacingStore {
        async fn insert(&self, document: OrderDocument) -> StoreResult<Version> {
            self.inner.insert(document).await
        }

        async fn save(
            &self,
            document: OrderDocument,
            options: SaveOptions,
        ) -> StoreResult<Version> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                let current = self.inner.get(document.id).await?.unwrap();
                self.inner.save(current, SaveOptions::new()).await?;
            }
            self.inner.save(document, options).await
        }

        async fn get(&self, id: OrderId) -> StoreResult<Option<OrderDocument>> {
            self.inner.get(id).await
        }

        async fn find(&self, query: OrderQuery) -> StoreResult<Vec<OrderDocument>> {
            self.inner.find(query).await
        }

        async fn count(&self, query: OrderQuery) -> StoreResult<usize> {
            self.inner.count(query).await
        }
    }

    #[tokio::test]
    async fn insert_load_and_execute() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let repo = OrderRepository::with_clock(InMemoryOrderStore::new(), clock.clone());

        let mut order = Order::place(new_order(&[("Tarta", 10)]), start).unwrap();
        repo.insert(&mut order).await.unwrap();
        assert_eq!(order.version(), Version::first());

        clock.advance(Duration::minutes(5));
        let (updated, taken) = repo
            .execute(order.id(), |o| Ok(o.allocate_production("tarta", 4)))
            .await
            .unwrap();

        assert_eq!(taken, 4);
        assert_eq!(updated.version(), Version::new(2));
        assert_eq!(updated.updated_at(), start + Duration::minutes(5));

        let reloaded = repo.load(order.id()).await.unwrap();
        assert_eq!(reloaded.products()[0].produced, 4);
    }

    #[tokio::test]
    async fn load_missing_order() {
        let repo = OrderRepository::new(InMemoryOrderStore::new());
        let result = repo.load(OrderId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn mutation_error_skips_save() {
        let repo = OrderRepository::new(InMemoryOrderStore::new());
        let mut order = Order::place(new_order(&[("Tarta", 10)]), Utc::now()).unwrap();
        repo.insert(&mut order).await.unwrap();

        let result: Result<(Order, ()), _> = repo
            .execute(order.id(), |_| Err(OrderError::validation("nope")))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::Validation(_)))
        ));
        let stored = repo.load(order.id()).await.unwrap();
        assert_eq!(stored.version(), Version::first());
    }

    #[tokio::test]
    async fn conflict_is_retried_from_fresh_state() {
        let store = RacingStore {
            inner: InMemoryOrderStore::new(),
            conflicts: Arc::new(AtomicU32::new(1)),
        };
        let repo = OrderRepository::new(store);
        let mut order = Order::place(new_order(&[("Tarta", 10)]), Utc::now()).unwrap();
        repo.insert(&mut order).await.unwrap();

        let mut calls = 0;
        let (updated, _) = repo
            .update(order, |o| {
                calls += 1;
                Ok(o.allocate_production("tarta", 3))
            })
            .await
            .unwrap();

        assert_eq!(calls, 2);
        // Insert (1), racing write (2), our retried write (3)
        assert_eq!(updated.version(), Version::new(3));
        assert_eq!(updated.products()[0].produced, 3);
    }

    #[tokio::test]
    async fn conflict_surfaces_after_max_attempts() {
        let store = RacingStore {
            inner: InMemoryOrderStore::new(),
            conflicts: Arc::new(AtomicU32::new(10)),
        };
        let repo = OrderRepository::new(store).with_max_attempts(2);
        let mut order = Order::place(new_order(&[("Tarta", 10)]), Utc::now()).unwrap();
        repo.insert(&mut order).await.unwrap();

        let result = repo
            .update(order, |o| Ok(o.allocate_production("tarta", 3)))
            .await;

        assert!(matches!(result, Err(ref e) if e.is_conflict()));
    }
}
