//! Calendar helpers pinned to the zone the dashboards report in.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Reference zone for hour/weekday bucketing and for deciding what "today" is.
pub const REFERENCE_TZ: Tz = chrono_tz::Europe::Madrid;

/// Local calendar day in the reference zone at instant `now`.
pub fn today_in_reference_zone(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_TZ).date_naive()
}

/// Hour of day (0-23) of `instant` in the reference zone.
pub fn reference_hour(instant: DateTime<Utc>) -> u32 {
    instant.with_timezone(&REFERENCE_TZ).hour()
}

/// ISO weekday (1 = Monday .. 7 = Sunday) of `instant` in the reference zone.
pub fn reference_iso_weekday(instant: DateTime<Utc>) -> u32 {
    instant
        .with_timezone(&REFERENCE_TZ)
        .weekday()
        .number_from_monday()
}
