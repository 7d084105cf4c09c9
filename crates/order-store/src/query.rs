use chrono::{DateTime, Utc};

/// Normalizes a product name for matching: trimmed and lowercased.
///
/// Names are typed by people at the counter and on the production floor,
/// so "Tarta " and "tarta" must land on the same line items.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    /// Earliest delivery first (FIFO priority).
    #[default]
    DeliveryDateAsc,

    /// Most recently created first.
    CreatedAtDesc,
}

/// Builder for constructing order queries.
///
/// Every filter is optional; unset filters match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Match any of these production stages.
    pub production_stages: Option<Vec<String>>,

    /// Exclude these dispatch statuses.
    pub excluded_dispatch_statuses: Option<Vec<String>>,

    /// Match orders with a line item of this (normalized) name.
    pub product_name: Option<String>,

    /// Match this delivery type.
    pub delivery_type: Option<String>,

    /// Case-insensitive substring of the branch name.
    pub branch_contains: Option<String>,

    /// Delivery date lower bound (inclusive).
    pub delivery_from: Option<DateTime<Utc>>,

    /// Delivery date upper bound (inclusive).
    pub delivery_to: Option<DateTime<Utc>>,

    /// Creation lower bound (inclusive).
    pub created_from: Option<DateTime<Utc>>,

    /// Creation upper bound (inclusive).
    pub created_to: Option<DateTime<Utc>>,

    /// Last write at or after this instant.
    pub updated_since: Option<DateTime<Utc>>,

    /// Match the invoice-needed flag.
    pub invoice_needed: Option<bool>,

    /// Match this invoice status.
    pub invoice_status: Option<String>,

    /// Result ordering.
    pub sort: OrderSort,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by any of the given production stages.
    pub fn production_stages<I, T>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.production_stages = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    /// Excludes the given dispatch statuses.
    pub fn exclude_dispatch_statuses<I, T>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.excluded_dispatch_statuses = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Filters to orders containing a line item with this name.
    pub fn product_name(mut self, name: &str) -> Self {
        self.product_name = Some(normalize_name(name));
        self
    }

    /// Filters by delivery type.
    pub fn delivery_type(mut self, delivery_type: impl Into<String>) -> Self {
        self.delivery_type = Some(delivery_type.into());
        self
    }

    /// Filters to branches containing this fragment, ignoring case.
    pub fn branch_contains(mut self, fragment: &str) -> Self {
        self.branch_contains = Some(fragment.trim().to_lowercase());
        self
    }

    /// Filters to deliveries at or after this instant.
    pub fn delivery_from(mut self, from: DateTime<Utc>) -> Self {
        self.delivery_from = Some(from);
        self
    }

    /// Filters to deliveries at or before this instant.
    pub fn delivery_to(mut self, to: DateTime<Utc>) -> Self {
        self.delivery_to = Some(to);
        self
    }

    /// Filters to orders created at or after this instant.
    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    /// Filters to orders created at or before this instant.
    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    /// Filters to orders written at or after this instant.
    pub fn updated_since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }

    /// Filters by the invoice-needed flag.
    pub fn invoice_needed(mut self, needed: bool) -> Self {
        self.invoice_needed = Some(needed);
        self
    }

    /// Filters by invoice status.
    pub fn invoice_status(mut self, status: impl Into<String>) -> Self {
        self.invoice_status = Some(status.into());
        self
    }

    /// Sets the result ordering.
    pub fn sort(mut self, sort: OrderSort) -> Self {
        self.sort = sort;
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
