//! Round boundary arithmetic.
//!
//! Rounds always end on a Sunday at 12:00 UTC. Closing a round exactly at
//! that boundary must open a full seven-day round, never a zero-length one.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

/// Returns the end time for a round opened at `now`: the next upcoming
/// Sunday 12:00 UTC.
///
/// When `now` already falls on a Sunday the boundary advances a full week,
/// so the returned instant is always strictly after `now`.
#[must_use]
pub fn next_round_end(now: DateTime<Utc>) -> DateTime<Utc> {
    // Monday = 0 .. Sunday = 6.
    let days_until_sunday = i64::from((6 - now.weekday().num_days_from_monday()) % 7);
    let days_until_sunday = if days_until_sunday == 0 {
        7
    } else {
        days_until_sunday
    };

    let end_date = now.date_naive() + Duration::days(days_until_sunday);
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    end_date.and_time(noon).and_utc()
}
