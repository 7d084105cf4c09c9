//! Reporting over stored orders and cached accounting sales.
//!
//! - [`ReportService`] aggregates order, production and dispatch figures
//!   for a delivery-date range
//! - [`AnalyticsService`] pulls daily sales from the accounting service
//!   into [`order_store::DailySummary`] records and serves them back

pub mod analytics;
pub mod error;
pub mod range;
pub mod stats;

pub use analytics::{AnalyticsService, Dashboard, DaySync, MAX_SYNC_DAYS, SyncReport};
pub use error::{ReportError, Result};
pub use range::{DEFAULT_RANGE_DAYS, DateRange};
pub use stats::{ProductStats, ReportService, ReportStats};
