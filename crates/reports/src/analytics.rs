//! Daily sales summaries cached from the accounting service.

use std::sync::Arc;

use accounting::{AccountingService, DocumentFilter, document_total};
use chrono::NaiveDate;
use chrono_tz::Tz;
use domain::{Clock, Money, SystemClock};
use order_store::{DailySummary, SummaryStore};
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::range::DateRange;

/// Longest range a single sync may cover.
pub const MAX_SYNC_DAYS: i64 = 366;

/// Figures pulled for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySync {
    pub date: NaiveDate,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub synced_days: usize,
    pub details: Vec<DaySync>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub range: DateRange,
    pub total_sales: Money,
    pub transaction_count: i64,
    pub daily_breakdown: Vec<DailySummary>,
}

pub struct AnalyticsService<S: SummaryStore> {
    store: S,
    accounting: Arc<dyn AccountingService>,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl<S: SummaryStore> AnalyticsService<S> {
    pub fn new(store: S, accounting: Arc<dyn AccountingService>, tz: Tz) -> Self {
        Self::with_clock(store, accounting, Arc::new(SystemClock), tz)
    }

    pub fn with_clock(
        store: S,
        accounting: Arc<dyn AccountingService>,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            accounting,
            clock,
            tz,
        }
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.tz).date_naive()
    }

    /// Refreshes the cached summary of every day from `from` to `to`.
    ///
    /// Without `from`, syncs yesterday only. Without `to`, syncs `from` only.
    /// Days are written as they are fetched, so a failure midway keeps the
    /// days already synced.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<SyncReport> {
        let from = match from {
            Some(from) => from,
            None => self
                .today()
                .pred_opt()
                .ok_or_else(|| ReportError::Validation("No day before today".to_string()))?,
        };
        let range = DateRange::new(from, to.unwrap_or(from))?;
        if range.num_days() > MAX_SYNC_DAYS {
            return Err(ReportError::Validation(format!(
                "Sync range is limited to {MAX_SYNC_DAYS} days"
            )));
        }

        let synced_at = self.clock.now();
        let mut details = Vec::new();
        for date in range.days() {
            let documents = self
                .accounting
                .list_documents(&DocumentFilter::issued_on(date))
                .await?;
            let total: Money = documents.iter().map(document_total).sum();
            let count = documents.len();

            self.store
                .upsert_summary(DailySummary::new(
                    date,
                    total.cents(),
                    count as i64,
                    synced_at,
                ))
                .await?;
            tracing::debug!(%date, %total, count, "day synced");
            details.push(DaySync { date, total, count });
        }

        tracing::info!(days = details.len(), from = %range.from, to = %range.to, "analytics synced");
        Ok(SyncReport {
            synced_days: details.len(),
            details,
        })
    }

    /// Cached summaries in range with their totals. Defaults to the last
    /// 30 days.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Dashboard> {
        let range = DateRange::or_last_days(from, to, self.today())?;
        let daily_breakdown = self.store.summaries_between(range.from, range.to).await?;

        let total_sales = daily_breakdown
            .iter()
            .map(|s| Money::from_cents(s.total_sales_cents))
            .sum();
        let transaction_count = daily_breakdown.iter().map(|s| s.transaction_count).sum();

        Ok(Dashboard {
            range,
            total_sales,
            transaction_count,
            daily_breakdown,
        })
    }
}
