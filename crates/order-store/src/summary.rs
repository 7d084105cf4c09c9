use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cached sales figures for one calendar day, pulled from the accounting
/// service so dashboards don't hit it on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// The day this summary covers. Unique across the collection.
    pub date: NaiveDate,

    /// Sum of document totals for the day, in cents.
    pub total_sales_cents: i64,

    /// Number of accounting documents issued that day.
    pub transaction_count: i64,

    /// When the summary was last refreshed.
    pub last_updated: DateTime<Utc>,
}

impl DailySummary {
    /// Creates a summary refreshed at `now`.
    pub fn new(
        date: NaiveDate,
        total_sales_cents: i64,
        transaction_count: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            date,
            total_sales_cents,
            transaction_count,
            last_updated: now,
        }
    }
}
