use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{DailySummary, OrderDocument, OrderId, OrderQuery, Result, StoreError, Version};

/// Options for saving a document back to the store.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Version the caller loaded, for optimistic concurrency control.
    /// If None, the save overwrites whatever is stored (use with caution).
    pub expected_version: Option<Version>,
}

impl SaveOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored document to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// Core trait for order document stores.
///
/// Documents are written whole: a save replaces the stored body and index
/// columns in one step. All implementations must be thread-safe.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new document at [`Version::first`].
    ///
    /// Fails with `ConcurrencyConflict` if a document with the same id exists.
    async fn insert(&self, document: OrderDocument) -> Result<Version>;

    /// Replaces a stored document and returns its new version.
    ///
    /// If `options.expected_version` is set and doesn't match the stored
    /// version, fails with `ConcurrencyConflict`. Unknown ids fail with
    /// `NotFound`.
    async fn save(&self, document: OrderDocument, options: SaveOptions) -> Result<Version>;

    /// Retrieves a document by id.
    async fn get(&self, id: OrderId) -> Result<Option<OrderDocument>>;

    /// Retrieves documents matching a query.
    async fn find(&self, query: OrderQuery) -> Result<Vec<OrderDocument>>;

    /// Counts documents matching a query, ignoring limit and offset.
    async fn count(&self, query: OrderQuery) -> Result<usize>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Retrieves a document, failing with `NotFound` if it's absent.
    async fn get_required(&self, id: OrderId) -> Result<OrderDocument> {
        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Storage for cached daily sales summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts or replaces the summary for its date.
    async fn upsert_summary(&self, summary: DailySummary) -> Result<()>;

    /// Returns summaries with `from <= date <= to`, oldest first.
    async fn summaries_between(&self, from: NaiveDate, to: NaiveDate)
    -> Result<Vec<DailySummary>>;
}
