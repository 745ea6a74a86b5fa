//! Time-bucket activity: hour of day, weekday, month, period of day.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::model::message::NormalizedMessage;
use crate::model::report::{BucketCount, DateRange, TimeActivity};

use super::Accumulator;

/// Period-of-day labels, in report order.
pub const PERIOD_LABELS: [&str; 4] = [
    "Morning (6-12)",
    "Afternoon (12-17)",
    "Evening (17-22)",
    "Night (22-6)",
];

const WEEKDAY_LABELS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Map an hour of day (0–23) to an index into [`PERIOD_LABELS`].
pub fn period_of_day(hour: u32) -> usize {
    match hour {
        6..=11 => 0,
        12..=16 => 1,
        17..=21 => 2,
        _ => 3,
    }
}

/// Buckets messages by UTC timestamp. Messages without a parseable date
/// land in a distinguished "unknown" counter instead of skewing hour 0,
/// and are excluded from the date range.
#[derive(Debug, Default)]
pub struct TimeActivityAccumulator {
    hours: [u64; 24],
    weekdays: [u64; 7],
    periods: [u64; 4],
    months: BTreeMap<String, u64>,
    unknown: u64,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl Accumulator for TimeActivityAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        let Some(date) = msg.date else {
            self.unknown += 1;
            return;
        };

        self.hours[date.hour() as usize] += 1;
        self.weekdays[date.weekday().num_days_from_monday() as usize] += 1;
        self.periods[period_of_day(date.hour())] += 1;
        *self
            .months
            .entry(format!("{:04}-{:02}", date.year(), date.month()))
            .or_insert(0) += 1;

        if self.first.is_none_or(|d| date < d) {
            self.first = Some(date);
        }
        if self.last.is_none_or(|d| date > d) {
            self.last = Some(date);
        }
    }
}

impl TimeActivityAccumulator {
    /// Oldest/newest dated message, `None` when nothing had a date.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.first, self.last) {
            (Some(first), Some(last)) => Some(DateRange { first, last }),
            _ => None,
        }
    }

    pub fn finish(self) -> TimeActivity {
        TimeActivity {
            hourly: self.hours.to_vec(),
            unknown_dates: self.unknown,
            weekdays: WEEKDAY_LABELS
                .iter()
                .zip(self.weekdays)
                .map(|(label, count)| BucketCount::new(*label, count))
                .collect(),
            months: self
                .months
                .into_iter()
                .map(|(label, count)| BucketCount::new(label, count))
                .collect(),
            periods: PERIOD_LABELS
                .iter()
                .zip(self.periods)
                .map(|(label, count)| BucketCount::new(*label, count))
                .collect(),
        }
    }
}
