//! Inclusive calendar-day ranges in the business time zone.

use chrono::{DateTime, Duration, NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{ReportError, Result};

/// Days covered by a report when no start date is given.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ReportError::Validation(format!(
                "Start date {from} is after end date {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Fills in missing bounds: `to` defaults to `today`, `from` to
    /// [`DEFAULT_RANGE_DAYS`] before `to`.
    pub fn or_last_days(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let to = to.unwrap_or(today);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
        Self::new(from, to)
    }

    /// Every day in the range, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    pub fn num_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// First and last instant of the range in `tz`, as UTC.
    pub fn bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = start_of_day(tz, self.from);
        let end = start_of_day(tz, self.to + Duration::days(1)) - Duration::microseconds(1);
        (start, end)
    }
}

fn start_of_day(tz: Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump. The day starts at the jump, which
        // is midnight read with the offset in force the day before.
        None => {
            let before = tz
                .offset_from_utc_datetime(&(midnight - Duration::days(1)))
                .fix();
            (midnight - Duration::seconds(i64::from(before.local_minus_utc()))).and_utc()
        }
    }
}
