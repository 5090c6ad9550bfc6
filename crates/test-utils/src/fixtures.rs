//! Common test fixtures for tc-align tests.

use chrono::{DateTime, TimeZone, Utc};

/// A synoptic reference time: 2018-09-12 12:00 UTC.
pub fn synoptic_time() -> DateTime<Utc> {
    utc(2018, 9, 12, 12, 0, 0)
}

/// Build a UTC timestamp; panics on an invalid date, as fixtures should.
pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{} {}:{}:{}", y, mo, d, h, mi, s))
}
