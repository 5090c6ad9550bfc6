//! Hourly rounding and bucketing of observation timestamps.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, DurationRound, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Truncate a timestamp to the start of its hour.
pub fn floor_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::hours(1)).unwrap_or(t)
}

/// Round to the nearest whole hour: minutes ≥ 30 round up, seconds and
/// sub-seconds are discarded.
pub fn round_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let floored = floor_to_hour(t);
    if t.minute() >= 30 {
        floored + Duration::hours(1)
    } else {
        floored
    }
}

/// The first whole hour strictly after `t` unless `t` already is one.
pub fn ceil_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let floored = floor_to_hour(t);
    if floored == t {
        t
    } else {
        floored + Duration::hours(1)
    }
}

/// Number of whole hours in `[t0, t1)`; zero when `t1 <= t0`.
pub fn hours_between(t0: DateTime<Utc>, t1: DateTime<Utc>) -> u32 {
    let secs = (t1 - t0).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs / 3600) as u32
    }
}

/// Signed whole minutes from a raster hour to an observation time.
///
/// Seconds of the observation are ignored, so 09:40:59 is 20 minutes
/// before 10:00.
pub fn minutes_from_hour(t: DateTime<Utc>, hour: DateTime<Utc>) -> i64 {
    let t = t.duration_trunc(Duration::minutes(1)).unwrap_or(t);
    (t - hour).num_minutes()
}

/// A time range for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Open-interval overlap: `other` ends after this range starts and
    /// starts before this range ends.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        other.end > self.start && other.start < self.end
    }
}

/// Row indices grouped by rounded hour within one reference day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourBuckets {
    pub reference_day: NaiveDate,
    buckets: BTreeMap<u32, Vec<usize>>,
    /// Rows whose rounded hour fell on another day.
    pub skipped: Vec<usize>,
}

impl HourBuckets {
    /// Rows rounded to `hour` (0-23).
    pub fn get(&self, hour: u32) -> &[usize] {
        self.buckets.get(&hour).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty buckets in ascending hour order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[usize])> {
        self.buckets.iter().map(|(h, rows)| (*h, rows.as_slice()))
    }

    /// The hourly timestamp a bucket stands for.
    pub fn hour_datetime(&self, hour: u32) -> Option<DateTime<Utc>> {
        self.reference_day
            .and_hms_opt(hour, 0, 0)
            .map(|ndt| ndt.and_utc())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Bucket rows by rounded hour, using the first row's calendar day as the
/// reference day.
pub fn bucket_by_hour<T, F>(rows: &[T], timestamp: F) -> Option<HourBuckets>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    let day = rows.first().map(|r| timestamp(r).date_naive())?;
    Some(bucket_by_hour_on(rows, timestamp, day))
}

/// Bucket rows by rounded hour; rows rounding onto another day are skipped.
pub fn bucket_by_hour_on<T, F>(rows: &[T], timestamp: F, reference_day: NaiveDate) -> HourBuckets
where
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut buckets: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let rounded = round_to_hour(timestamp(row));
        if rounded.date_naive() == reference_day {
            buckets.entry(rounded.hour()).or_default().push(idx);
        } else {
            skipped.push(idx);
        }
    }

    HourBuckets {
        reference_day,
        buckets,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_round_to_hour() {
        assert_eq!(round_to_hour(at(10, 29, 0)), at(10, 0, 0));
        assert_eq!(round_to_hour(at(10, 30, 0)), at(11, 0, 0));
        assert_eq!(round_to_hour(at(10, 29, 59)), at(10, 0, 0));
        assert_eq!(
            round_to_hour(at(23, 45, 0)),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_floor_and_ceil() {
        assert_eq!(floor_to_hour(at(7, 59, 59)), at(7, 0, 0));
        assert_eq!(ceil_to_hour(at(7, 0, 1)), at(8, 0, 0));
        assert_eq!(ceil_to_hour(at(7, 0, 0)), at(7, 0, 0));
    }

    #[test]
    fn test_hours_between() {
        assert_eq!(hours_between(at(0, 0, 0), at(6, 0, 0)), 6);
        assert_eq!(hours_between(at(0, 0, 0), at(5, 59, 0)), 5);
        assert_eq!(hours_between(at(6, 0, 0), at(0, 0, 0)), 0);
        let next_day = Utc.with_ymd_and_hms(2020, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(hours_between(at(0, 0, 0), next_day), 27);
    }

    #[test]
    fn test_minutes_from_hour() {
        assert_eq!(minutes_from_hour(at(10, 20, 0), at(10, 0, 0)), 20);
        assert_eq!(minutes_from_hour(at(9, 40, 0), at(10, 0, 0)), -20);
        assert_eq!(minutes_from_hour(at(9, 40, 59), at(10, 0, 0)), -20);
    }

    #[test]
    fn test_minutes_from_hour_across_midnight() {
        let midnight = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(minutes_from_hour(at(23, 40, 0), midnight), -20);
        assert_eq!(minutes_from_hour(at(0, 10, 0), at(0, 0, 0)), 10);
    }

    #[test]
    fn test_time_range_overlap_is_open() {
        let a = TimeRange::new(at(0, 0, 0), at(6, 0, 0));
        assert!(a.overlaps(&TimeRange::new(at(5, 0, 0), at(9, 0, 0))));
        assert!(!a.overlaps(&TimeRange::new(at(6, 0, 0), at(9, 0, 0))));
        assert!(a.contains(&at(6, 0, 0)));
    }

    #[test]
    fn test_bucket_by_hour_skips_next_day() {
        let times = vec![at(10, 10, 0), at(10, 40, 0), at(11, 5, 0), at(23, 50, 0)];
        let buckets = bucket_by_hour(&times, |t| *t).unwrap();

        assert_eq!(buckets.get(10), &[0]);
        assert_eq!(buckets.get(11), &[1, 2]);
        assert_eq!(buckets.get(5), &[] as &[usize]);
        assert_eq!(buckets.skipped, vec![3]);
        assert_eq!(buckets.hour_datetime(11), Some(at(11, 0, 0)));
    }

    #[test]
    fn test_bucket_by_hour_empty() {
        let times: Vec<DateTime<Utc>> = Vec::new();
        assert!(bucket_by_hour(&times, |t| *t).is_none());
    }
}
