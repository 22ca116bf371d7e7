//! Conversions between tick counts and calendar timestamps.
//!
//! A tick is 100 nanoseconds; tick 0 is 0001-01-01T00:00:00Z in the
//! proleptic Gregorian calendar.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

pub fn from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
    let since_epoch = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = since_epoch.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
}

pub fn to_ticks(dt: &DateTime<Utc>) -> Option<i64> {
    let secs = dt.timestamp();
    let sub_ticks = i64::from(dt.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    secs.checked_mul(TICKS_PER_SECOND)?
        .checked_add(sub_ticks)?
        .checked_add(UNIX_EPOCH_TICKS)
}

pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse RFC 3339 text, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) or a
/// bare `YYYY-MM-DD` date.
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
