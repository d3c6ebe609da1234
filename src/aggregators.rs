//! Ready-made range aggregators
//!
//! The engine itself is agnostic of what it aggregates: anything
//! implementing `Fn(&[Point]) -> f64` can be handed to
//! [`materialize`](crate::window::RangeWindowIterator::materialize). This
//! module provides the usual suspects so evaluators do not have to
//! re-derive them. All functions here are pure over the ordered point
//! slice and deterministic for a fixed input.
//!
//! The `*_over_time` names follow the query-language convention for
//! range-vector functions; `rate`/`sum_rate` normalize by the selector
//! range and therefore take it as a parameter, returning a closure.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use range_engine::aggregators::{rate, sum_over_time};
//! use range_engine::types::Point;
//!
//! let points = vec![Point::new(0, 1.0), Point::new(1_000_000_000, 2.0)];
//! assert_eq!(sum_over_time(&points), 3.0);
//!
//! let per_second = rate(Duration::from_secs(2));
//! assert_eq!(per_second(&points), 1.0); // 2 entries over 2 seconds
//! ```

use std::cmp::Ordering;
use std::time::Duration;

use crate::types::Point;

/// Sum of all values in the window
pub fn sum_over_time(points: &[Point]) -> f64 {
    points.iter().map(|p| p.value).sum()
}

/// Number of entries in the window
pub fn count_over_time(points: &[Point]) -> f64 {
    points.len() as f64
}

/// Arithmetic mean of the window
pub fn avg_over_time(points: &[Point]) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    sum_over_time(points) / points.len() as f64
}

/// Minimum value in the window
pub fn min_over_time(points: &[Point]) -> f64 {
    points
        .iter()
        .map(|p| p.value)
        .fold(f64::INFINITY, f64::min)
}

/// Maximum value in the window
pub fn max_over_time(points: &[Point]) -> f64 {
    points
        .iter()
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Earliest value in the window
pub fn first_over_time(points: &[Point]) -> f64 {
    points.first().map(|p| p.value).unwrap_or(f64::NAN)
}

/// Latest value in the window
pub fn last_over_time(points: &[Point]) -> f64 {
    points.last().map(|p| p.value).unwrap_or(f64::NAN)
}

/// Sample standard deviation of the window
///
/// Welford's online algorithm; returns 0.0 for fewer than two entries.
pub fn stddev_over_time(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (count, point) in points.iter().enumerate() {
        let delta = point.value - mean;
        mean += delta / (count + 1) as f64;
        m2 += delta * (point.value - mean);
    }
    (m2 / (points.len() - 1) as f64).sqrt()
}

/// Per-second entry rate over the selector range
///
/// Divides the entry count by the range width, which is the rate of a
/// log stream (each entry counts as one event). The range is a parameter
/// because the window may be only partially filled; normalizing by the
/// observed span instead would overestimate sparse streams.
pub fn rate(range: Duration) -> impl Fn(&[Point]) -> f64 {
    let seconds = range.as_secs_f64();
    move |points: &[Point]| {
        if seconds <= 0.0 {
            return f64::NAN;
        }
        points.len() as f64 / seconds
    }
}

/// Per-second sum over the selector range
///
/// The value-weighted counterpart of [`rate`]: total of the sample values
/// divided by the range width (e.g. bytes per second).
pub fn sum_rate(range: Duration) -> impl Fn(&[Point]) -> f64 {
    let seconds = range.as_secs_f64();
    move |points: &[Point]| {
        if seconds <= 0.0 {
            return f64::NAN;
        }
        sum_over_time(points) / seconds
    }
}

/// Per-second increase of a monotonic counter over the selector range
///
/// Sums consecutive deltas, treating a decrease as a counter reset (the
/// post-reset value counts as the increase since the reset), then
/// normalizes by the range width. Returns 0.0 for fewer than two entries,
/// where no increase is observable.
pub fn counter_rate(range: Duration) -> impl Fn(&[Point]) -> f64 {
    let seconds = range.as_secs_f64();
    move |points: &[Point]| {
        if seconds <= 0.0 {
            return f64::NAN;
        }
        if points.len() < 2 {
            return 0.0;
        }

        let mut increase = 0.0;
        let mut prev = points[0].value;
        for point in &points[1..] {
            if point.value < prev {
                // counter reset
                increase += point.value;
            } else {
                increase += point.value - prev;
            }
            prev = point.value;
        }
        increase / seconds
    }
}

/// Nearest-rank quantile of the window values
///
/// `q` is clamped to `[0, 1]`. NaN values sort as equal, matching the
/// behavior of the other comparison-based aggregators.
pub fn quantile_over_time(q: f64) -> impl Fn(&[Point]) -> f64 {
    let q = q.clamp(0.0, 1.0);
    move |points: &[Point]| {
        if points.is_empty() {
            return f64::NAN;
        }

        let mut values: Vec<f64> = points.iter().map(|p| p.value).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let idx = (q * (values.len() - 1) as f64).round() as usize;
        values[idx]
    }
}
