//! Cycle time and throughput

use crate::item::Item;
use chrono::{DateTime, Duration, Utc};

/// Length of the trailing throughput window
pub const THROUGHPUT_WINDOW_DAYS: i64 = 7;

/// Whole days from creation to completion for every completed item
///
/// Items finishing before they were created are data-quality artifacts and
/// are left out, so the samples are never negative. Mean and percentiles are
/// left to the consumer.
#[must_use]
pub fn cycle_times(items: &[Item]) -> Vec<i64> {
    items
        .iter()
        .filter_map(|item| {
            let created = item.created_at?;
            let finished = item.finished_at?;
            (finished >= created).then(|| (finished - created).num_days())
        })
        .collect()
}

/// Closed items finished within the trailing week ending at `now`
///
/// Both window edges are inclusive.
#[must_use]
pub fn throughput(items: &[Item], now: DateTime<Utc>) -> usize {
    let window_start = now - Duration::days(THROUGHPUT_WINDOW_DAYS);
    items
        .iter()
        .filter(|item| item.is_closed)
        .filter_map(|item| item.finished_at)
        .filter(|finished| *finished >= window_start && *finished <= now)
        .count()
}
