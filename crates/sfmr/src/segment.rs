//! Splitting a track into fixed-size squares and averaging each square.
//!
//! Centres are elected along the track: the first point, then every point
//! that moves at least one square edge (on either axis) away from the last
//! centre. If trailing points drift at least half an edge beyond the last
//! centre, the final point becomes one more centre. Each point then joins
//! the nearest centre whose half-edge box contains it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Quantities, Quantity, TrackPoint};

/// Default square edge in degrees.
pub const DEFAULT_SQUARE_EDGE: f64 = 0.25;

/// Point indices assigned to each elected centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    /// Track indices of the elected centres, ascending.
    pub centers: Vec<usize>,
    /// `groups[k]` holds the track indices assigned to `centers[k]`.
    pub groups: Vec<Vec<usize>>,
}

impl Segmentation {
    /// Track indices that fit no square.
    pub fn dropped(&self, track_len: usize) -> Vec<usize> {
        let mut assigned = vec![false; track_len];
        for idx in self.groups.iter().flatten() {
            assigned[*idx] = true;
        }
        (0..track_len).filter(|i| !assigned[*i]).collect()
    }
}

/// Representative point of one square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareAverage {
    /// Track index of the square's centre.
    pub center_index: usize,
    pub center_lon: f64,
    pub center_lat: f64,
    /// Mean timestamp of the contributing points.
    pub date_time: DateTime<Utc>,
    /// Mean position of the contributing points.
    pub lon: f64,
    pub lat: f64,
    pub quantities: Quantities,
    pub point_count: usize,
}

impl SquareAverage {
    pub fn windspd(&self) -> f64 {
        self.quantities[Quantity::WindSpeed]
    }
}

/// Segments one file's worth of track points into squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegmenter {
    pub square_edge: f64,
}

impl Default for TrackSegmenter {
    fn default() -> Self {
        Self {
            square_edge: DEFAULT_SQUARE_EDGE,
        }
    }
}

impl TrackSegmenter {
    pub fn new(square_edge: f64) -> Self {
        Self { square_edge }
    }

    fn half_edge(&self) -> f64 {
        self.square_edge / 2.0
    }

    /// Elect square centres along the track.
    pub fn elect_centers(&self, points: &[TrackPoint]) -> Vec<usize> {
        let Some(first) = points.first() else {
            return Vec::new();
        };

        let mut centers = vec![0];
        let mut last = first;
        for (idx, pt) in points.iter().enumerate().skip(1) {
            if (pt.lon - last.lon).abs() >= self.square_edge
                || (pt.lat - last.lat).abs() >= self.square_edge
            {
                centers.push(idx);
                last = pt;
            }
        }

        let last_center = centers[centers.len() - 1];
        let half = self.half_edge();
        let tail_escapes = points[last_center + 1..]
            .iter()
            .any(|pt| (pt.lon - last.lon).abs() >= half || (pt.lat - last.lat).abs() >= half);
        if tail_escapes {
            centers.push(points.len() - 1);
        }

        centers
    }

    /// Assign every point to its nearest containing square.
    pub fn segment(&self, points: &[TrackPoint]) -> Segmentation {
        let centers = self.elect_centers(points);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); centers.len()];
        let half = self.half_edge();

        for (idx, pt) in points.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (k, &c) in centers.iter().enumerate() {
                let center = &points[c];
                let dlon = (pt.lon - center.lon).abs();
                let dlat = (pt.lat - center.lat).abs();
                if dlon > half || dlat > half {
                    continue;
                }
                let dist = dlon.hypot(dlat);
                if best.map_or(true, |(_, d)| dist < d) {
                    best = Some((k, dist));
                }
            }
            if let Some((k, _)) = best {
                groups[k].push(idx);
            }
        }

        Segmentation { centers, groups }
    }

    /// Square averages of a track, in centre order; empty squares are omitted.
    ///
    /// Timestamps are averaged as elapsed seconds from the first point.
    /// Each quantity sums only its strictly positive readings but divides by
    /// the full square size, so squares containing missing readings are
    /// biased towards zero.
    pub fn average(&self, points: &[TrackPoint]) -> Vec<SquareAverage> {
        let Some(first) = points.first() else {
            return Vec::new();
        };
        let start = first.date_time;
        let seg = self.segment(points);

        let averages: Vec<SquareAverage> = seg
            .centers
            .iter()
            .zip(&seg.groups)
            .filter(|(_, group)| !group.is_empty())
            .map(|(&center_index, group)| {
                let n = group.len() as f64;
                let mut elapsed = 0i64;
                let mut lon = 0.0;
                let mut lat = 0.0;
                let mut quantities = Quantities::default();

                for &i in group {
                    let pt = &points[i];
                    elapsed += (pt.date_time - start).num_seconds();
                    lon += pt.lon;
                    lat += pt.lat;
                    for (q, v) in pt.quantities.iter() {
                        if v > 0.0 {
                            quantities[q] += v;
                        }
                    }
                }
                for q in Quantity::ALL {
                    quantities[q] /= n;
                }

                let mean_micros = (elapsed as f64 / n * 1e6).round() as i64;
                let center = &points[center_index];

                SquareAverage {
                    center_index,
                    center_lon: center.lon,
                    center_lat: center.lat,
                    date_time: start + Duration::microseconds(mean_micros),
                    lon: lon / n,
                    lat: lat / n,
                    quantities,
                    point_count: group.len(),
                }
            })
            .collect();

        debug!(
            points = points.len(),
            centers = seg.centers.len(),
            squares = averages.len(),
            "averaged track squares"
        );
        averages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, utc};

    fn pt(sec: i64, lon: f64, lat: f64, windspd: f64) -> TrackPoint {
        let mut quantities = Quantities::default();
        quantities[Quantity::WindSpeed] = windspd;
        TrackPoint {
            date_time: utc(2018, 9, 12, 12, 0, 0) + Duration::seconds(sec),
            lon,
            lat,
            quantities,
        }
    }

    fn eastward(count: i64) -> Vec<TrackPoint> {
        (0..count).map(|i| pt(i, 280.0 + 0.0625 * i as f64, 25.0, 20.0)).collect()
    }

    #[test]
    fn test_centers_every_square_edge() {
        let seg = TrackSegmenter::default();
        assert_eq!(seg.elect_centers(&eastward(9)), vec![0, 4, 8]);
    }

    #[test]
    fn test_tail_becomes_center() {
        let seg = TrackSegmenter::default();
        // Last point is 0.0625 past the centre at index 4.
        assert_eq!(seg.elect_centers(&eastward(6)), vec![0, 4]);
        // Last point is half an edge past it.
        assert_eq!(seg.elect_centers(&eastward(7)), vec![0, 4, 6]);
    }

    #[test]
    fn test_ties_go_to_earlier_center() {
        let seg = TrackSegmenter::default().segment(&eastward(9));
        assert_eq!(seg.groups, vec![vec![0, 1, 2], vec![3, 4, 5, 6], vec![7, 8]]);
        assert!(seg.dropped(9).is_empty());
    }

    #[test]
    fn test_point_outside_every_box_is_dropped() {
        let pts = vec![pt(0, 280.0, 25.0, 20.0), pt(1, 280.2, 25.0, 20.0), pt(2, 280.0, 25.25, 20.0)];
        let seg = TrackSegmenter::default().segment(&pts);
        assert_eq!(seg.centers, vec![0, 2]);
        assert_eq!(seg.groups, vec![vec![0], vec![2]]);
        assert_eq!(seg.dropped(3), vec![1]);
    }

    #[test]
    fn test_excursion_forms_own_square() {
        let mut pts: Vec<_> = (0..4).map(|i| pt(i, 280.0 + 0.01 * i as f64, 25.0, 20.0)).collect();
        pts.push(pt(4, 280.04, 25.3, 20.0));
        pts.push(pt(5, 280.05, 25.0, 20.0));
        let seg = TrackSegmenter::default().segment(&pts);
        assert_eq!(seg.centers, vec![0, 4, 5]);
        assert_eq!(seg.groups, vec![vec![0, 1, 2], vec![4], vec![3, 5]]);
    }

    #[test]
    fn test_average_divides_by_full_group() {
        let pts = vec![
            pt(0, 280.00, 25.0, 30.0),
            pt(10, 280.01, 25.0, 0.0),
            pt(20, 280.02, 25.0, 36.0),
            pt(31, 280.03, 25.0, -1.0),
        ];
        let avgs = TrackSegmenter::default().average(&pts);
        assert_eq!(avgs.len(), 1);
        let a = &avgs[0];
        assert_eq!(a.point_count, 4);
        assert_approx_eq!(a.windspd(), 66.0 / 4.0, 1e-12);
        assert_approx_eq!(a.lon, 280.015, 1e-9);
        assert_eq!(a.center_lon, 280.0);
        // Mean elapsed = 61 / 4 = 15.25 s.
        assert_eq!(a.date_time, utc(2018, 9, 12, 12, 0, 15) + Duration::milliseconds(250));
    }

    #[test]
    fn test_empty_track() {
        let seg = TrackSegmenter::default();
        assert!(seg.average(&[]).is_empty());
        assert!(seg.segment(&[]).centers.is_empty());
    }

    #[test]
    fn test_every_point_in_at_most_one_box() {
        let pts: Vec<_> = (0..40)
            .map(|i| {
                let k = i as f64;
                pt(i, 280.0 + 0.03 * k, 25.0 + 0.02 * (k * 0.7).sin(), 20.0)
            })
            .collect();
        let seg = TrackSegmenter::default();
        let s = seg.segment(&pts);

        let mut seen = vec![0; pts.len()];
        for (k, group) in s.groups.iter().enumerate() {
            let c = &pts[s.centers[k]];
            for &i in group {
                seen[i] += 1;
                assert!((pts[i].lon - c.lon).abs() <= 0.125);
                assert!((pts[i].lat - c.lat).abs() <= 0.125);
            }
        }
        assert!(seen.iter().all(|&n| n <= 1));
    }
}
