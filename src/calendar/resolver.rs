use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::constants::MAX_DAYS_PER_EVENT;
use crate::types::{DayDetail, DayStatus, NormalizedEvent};

/// First and last day of a month, or `None` for an invalid year/month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// UTC calendar days touched by stepping one day at a time from `start` while
/// the step stays at or before `end`, kept to the given month.
///
/// Steps keep the start's time of day, so an end earlier in its day than the
/// start excludes the end date. Empty when `start > end` or the span misses
/// the month. The iterator is finite and can be recreated from the same inputs.
pub fn days_within_month(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    year: i32,
    month: u32,
) -> impl Iterator<Item = NaiveDate> {
    let bounds = month_bounds(year, month);
    let last = bounds.map(|(_, last)| last);
    // jump straight to the month's first day when the span starts earlier
    let lead = bounds.map_or(0, |(first, _)| (first - start.date_naive()).num_days().max(0));
    let first_step = bounds.and_then(|_| start.checked_add_signed(Duration::days(lead)));

    first_step
        .into_iter()
        .flat_map(|step| (0..).map_while(move |k| step.checked_add_signed(Duration::days(k))))
        .take_while(move |step| *step <= end)
        .map(|step| step.date_naive())
        .take_while(move |day| last.is_some_and(|last| *day <= last))
        .take(MAX_DAYS_PER_EVENT)
}

/// Per-day winner and contributing events for one month
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DayResolution {
    pub days: BTreeMap<NaiveDate, DayStatus>,
    pub day_details: BTreeMap<NaiveDate, Vec<DayDetail>>,
}

impl DayResolution {
    /// Records one event on one day. The most severe status wins; on equal
    /// severity the first status seen stays.
    fn record(&mut self, day: NaiveDate, event: &NormalizedEvent) {
        match self.days.entry(day) {
            Entry::Vacant(slot) => {
                slot.insert(event.status);
            }
            Entry::Occupied(mut slot) => {
                if event.status.is_more_severe_than(*slot.get()) {
                    slot.insert(event.status);
                }
            }
        }
        self.day_details.entry(day).or_default().push(DayDetail::from(event));
    }
}

/// Expands every event over its days in the requested month and resolves
/// each day's status.
pub fn resolve(events: &[NormalizedEvent], year: i32, month: u32) -> DayResolution {
    let mut resolution = DayResolution::default();
    for event in events {
        for day in days_within_month(event.start, event.end, year, month) {
            debug_assert!(day.year() == year && day.month() == month);
            resolution.record(day, event);
        }
    }
    resolution
}
