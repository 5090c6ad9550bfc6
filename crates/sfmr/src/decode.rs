//! Decoding of raw SFMR variable arrays into track points.
//!
//! SFMR files use 0 as a missing-value marker for DATE, TIME, LAT and LON,
//! but 0 is also a legitimate TIME (midnight). A zero TIME is only treated
//! as missing at either end of the track or when a neighbour is zero too.
//! Zero DATE/LAT/LON values at such indices are masked; elsewhere they take
//! the previous value (or the next one at index 0).

use chrono::{NaiveDate, NaiveTime};
use tc_common::normalize_lon;
use tracing::debug;

use crate::error::{Result, SfmrError};
use crate::types::{Quantities, Quantity, TrackPoint};

/// Raw variable arrays of one SFMR file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfmrArrays {
    pub date: Vec<i64>,
    pub time: Vec<i64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    /// One array per quantity, in [`Quantity::ALL`] order.
    pub quantities: [Vec<f64>; 5],
    /// Non-zero entries mark records the instrument flagged as bad.
    pub flag: Option<Vec<i64>>,
}

/// Parse an SFMR TIME token of 1-6 digits (S, SS, MSS, MMSS, HMMSS, HHMMSS).
pub fn parse_time_token(token: i64) -> std::result::Result<NaiveTime, String> {
    if !(0..1_000_000).contains(&token) {
        return Err(format!("TIME token {} is not 1-6 digits", token));
    }
    let (h, m, s) = (token / 10_000, (token / 100) % 100, token % 100);
    NaiveTime::from_hms_opt(h as u32, m as u32, s as u32)
        .ok_or_else(|| format!("TIME token {} is not a valid time of day", token))
}

/// Parse an SFMR DATE token in `yyyymmdd` form.
pub fn parse_date_token(token: i64) -> std::result::Result<NaiveDate, String> {
    if !(10_000_000..100_000_000).contains(&token) {
        return Err(format!("DATE token {} is not yyyymmdd", token));
    }
    let (y, m, d) = (token / 10_000, (token / 100) % 100, token % 100);
    NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
        .ok_or_else(|| format!("DATE token {} is not a calendar date", token))
}

/// Indices whose zero TIME is a missing-value marker rather than midnight.
pub fn mask_time_sentinels(time: &[i64]) -> Vec<bool> {
    let n = time.len();
    (0..n)
        .map(|i| {
            if time[i] != 0 {
                return false;
            }
            if i == 0 || i == n - 1 {
                return true;
            }
            time[i - 1] == 0 || time[i + 1] == 0
        })
        .collect()
}

/// Resolve zero markers of DATE/LAT/LON against the TIME mask.
pub fn fill_zero_sentinels<T>(values: &[T], time_masked: &[bool]) -> Vec<Option<T>>
where
    T: Copy + PartialEq + Default,
{
    let zero = T::default();
    let mut out: Vec<Option<T>> = Vec::with_capacity(values.len());

    for (i, &v) in values.iter().enumerate() {
        let resolved = if v != zero {
            Some(v)
        } else if time_masked.get(i).copied().unwrap_or(false) {
            None
        } else if i >= 1 {
            out[i - 1]
        } else {
            values.get(1).copied()
        };
        out.push(resolved);
    }

    out
}

impl SfmrArrays {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn check_shapes(&self, file: &str) -> Result<()> {
        let expected = self.time.len();
        let mut lens: Vec<(&str, usize)> = vec![
            ("DATE", self.date.len()),
            ("LAT", self.lat.len()),
            ("LON", self.lon.len()),
        ];
        for q in Quantity::ALL {
            lens.push((q.nc_variable(), self.quantities[q as usize].len()));
        }
        if let Some(flag) = &self.flag {
            lens.push(("FLAG", flag.len()));
        }

        match lens.into_iter().find(|(_, n)| *n != expected) {
            Some((variable, found)) => Err(SfmrError::Shape {
                file: file.to_string(),
                variable: variable.to_string(),
                expected,
                found,
            }),
            None => Ok(()),
        }
    }

    /// Decode every valid record into a track point, in file order.
    ///
    /// Records with a masked TIME/DATE/LAT/LON or a raised FLAG are skipped.
    /// A malformed DATE or TIME token aborts the whole file with the
    /// offending index.
    pub fn decode(&self, file: &str) -> Result<Vec<TrackPoint>> {
        self.check_shapes(file)?;

        let time_masked = mask_time_sentinels(&self.time);
        let dates = fill_zero_sentinels(&self.date, &time_masked);
        let lats = fill_zero_sentinels(&self.lat, &time_masked);
        let lons = fill_zero_sentinels(&self.lon, &time_masked);

        let mut points = Vec::with_capacity(self.len());
        let mut skipped = 0usize;

        for i in 0..self.len() {
            let flagged = self.flag.as_ref().map(|f| f[i] != 0).unwrap_or(false);
            let (Some(date), Some(lat), Some(lon)) = (dates[i], lats[i], lons[i]) else {
                skipped += 1;
                continue;
            };
            if time_masked[i] || flagged {
                skipped += 1;
                continue;
            }

            let date = parse_date_token(date).map_err(|m| SfmrError::parse(file, i, m))?;
            let time = parse_time_token(self.time[i]).map_err(|m| SfmrError::parse(file, i, m))?;

            let mut quantities = Quantities::default();
            for q in Quantity::ALL {
                quantities[q] = self.quantities[q as usize][i];
            }

            points.push(TrackPoint {
                date_time: date.and_time(time).and_utc(),
                lon: normalize_lon(lon),
                lat,
                quantities,
            });
        }

        debug!(file, decoded = points.len(), skipped, "decoded SFMR records");
        Ok(points)
    }
}

/// Observation date encoded in an SFMR file name.
///
/// Names look like `NOAA43_SFMR20180912I1.nc`; older ones carry a two-digit
/// year (`USAF_SFMR0809221638.nc`). Returns the date and the file name with
/// a four-digit year.
pub fn date_from_file_name(name: &str) -> Option<(NaiveDate, String)> {
    let (head, tail) = name.split_once("SFMR")?;
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if tail.starts_with("20") || tail.starts_with("199") {
        let ds = tail.get(..8).filter(|s| digits(s))?;
        let date = NaiveDate::parse_from_str(ds, "%Y%m%d").ok()?;
        Some((date, name.to_string()))
    } else {
        let ds = tail.get(..6).filter(|s| digits(s))?;
        let date = NaiveDate::parse_from_str(&format!("20{}", ds), "%Y%m%d").ok()?;
        Some((date, format!("{}SFMR20{}", head, tail)))
    }
}
