use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OrderId;

/// Version number of a stored order, used for optimistic concurrency control.
///
/// A freshly inserted document is at version 1; every successful save
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that was never stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) assigned on insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored order: the serialized aggregate plus the columns queries filter on.
///
/// The store never interprets `body`; the index columns are extracted by the
/// domain layer every time the order is saved so they cannot drift from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDocument {
    /// The order this document holds.
    pub id: OrderId,

    /// Version of the document as stored.
    pub version: Version,

    /// Delivery timestamp, used for FIFO ordering.
    pub delivery_date: DateTime<Utc>,

    /// Production stage tag (e.g. "PENDING").
    pub production_stage: String,

    /// Dispatch status tag (e.g. "NOT_SENT").
    pub dispatch_status: String,

    /// Delivery type tag ("delivery" or "pickup").
    pub delivery_type: String,

    /// Pickup/dispatch branch name, if any.
    pub branch: Option<String>,

    /// Normalized names of every line item (see [`crate::normalize_name`]).
    pub product_names: Vec<String>,

    /// Whether the customer asked for an invoice.
    pub invoice_needed: bool,

    /// Invoice synchronization status tag, if any.
    pub invoice_status: Option<String>,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last written.
    pub updated_at: DateTime<Utc>,

    /// The serialized aggregate.
    pub body: serde_json::Value,
}

impl OrderDocument {
    /// Deserializes the body into a concrete type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Returns true if any line item carries the given normalized name.
    pub fn has_product(&self, normalized_name: &str) -> bool {
        self.product_names.iter().any(|n| n == normalized_name)
    }
}
