//! Pure statistics over ordered numeric samples
//!
//! All functions are stateless and take values in the caller's unit (the
//! harness uses µs for latency and jitter, MB/s for throughput). Percentiles
//! use the nearest-rank rule `sorted[floor(p/100 * n)]` with no
//! interpolation, so results line up exactly with earlier reports.

use super::StatsError;
use std::cmp::Ordering;

fn require(values: &[f64], required: usize) -> Result<(), StatsError> {
    if values.len() < required {
        return Err(StatsError::InsufficientData {
            required,
            actual: values.len(),
        });
    }
    Ok(())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    require(values, 1)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    require(values, 1)?;
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator)
pub fn stdev(values: &[f64]) -> Result<f64, StatsError> {
    require(values, 2)?;
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

pub fn min(values: &[f64]) -> Result<f64, StatsError> {
    require(values, 1)?;
    Ok(values.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn max(values: &[f64]) -> Result<f64, StatsError> {
    require(values, 1)?;
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Nearest-rank percentile for `p` in `(0, 100]`
///
/// # Example
/// ```
/// use accelbench_core::stats::engine::percentile;
///
/// let values = [5.0, 1.0, 4.0, 2.0, 3.0];
/// assert_eq!(percentile(&values, 50.0).unwrap(), 3.0);
/// assert_eq!(percentile(&values, 100.0).unwrap(), 5.0);
/// ```
pub fn percentile(values: &[f64], p: f64) -> Result<f64, StatsError> {
    if !p.is_finite() || p <= 0.0 || p > 100.0 {
        return Err(StatsError::InvalidPercentile(p));
    }
    require(values, 1)?;
    let sorted = sorted(values);
    Ok(sorted[rank_index(p, sorted.len())])
}

// Multiply before dividing: `p / 100.0` is inexact (29.0 / 100.0 * 100.0 < 29.0)
fn rank_index(p: f64, len: usize) -> usize {
    let index = (p * len as f64 / 100.0).floor() as usize;
    index.min(len - 1)
}

/// Absolute differences between consecutive values (length n - 1)
pub fn jitter_series(values: &[f64]) -> Result<Vec<f64>, StatsError> {
    require(values, 2)?;
    Ok(values.windows(2).map(|w| (w[1] - w[0]).abs()).collect())
}

/// How many times faster than `baseline` a mean latency is
pub fn speedup(mean_latency: f64, baseline: f64) -> Result<f64, StatsError> {
    if mean_latency == 0.0 {
        return Err(StatsError::DivisionByZero);
    }
    Ok(baseline / mean_latency)
}

/// Descriptive summary of one series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Summary {
    /// Summarize a series of at least two values
    pub fn from_values(values: &[f64]) -> Result<Self, StatsError> {
        require(values, 2)?;
        let sorted = sorted(values);
        let n = sorted.len();
        Ok(Self {
            count: n,
            mean: mean(&sorted)?,
            median: median(&sorted)?,
            stdev: stdev(&sorted)?,
            min: sorted[0],
            max: sorted[n - 1],
            p95: sorted[rank_index(95.0, n)],
            p99: sorted[rank_index(99.0, n)],
        })
    }

    /// Named statistics, for reports
    pub fn entries(&self) -> [(&'static str, f64); 7] {
        [
            ("mean", self.mean),
            ("median", self.median),
            ("stdev", self.stdev),
            ("p95", self.p95),
            ("p99", self.p99),
            ("min", self.min),
            ("max", self.max),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_rejected() {
        let empty: [f64; 0] = [];
        for result in [mean(&empty), median(&empty), min(&empty), max(&empty)] {
            assert_eq!(
                result,
                Err(StatsError::InsufficientData {
                    required: 1,
                    actual: 0
                })
            );
        }
        assert!(percentile(&empty, 50.0).is_err());
    }

    #[test]
    fn test_mean_median() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(mean(&values).unwrap(), 2.5);
        assert_relative_eq!(median(&values).unwrap(), 2.5);
        assert_relative_eq!(median(&[9.0, 1.0, 5.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_stdev_sample_denominator() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population stdev is 2.0; sample stdev uses n - 1
        assert_relative_eq!(stdev(&values).unwrap(), 2.138089935299395, epsilon = 1e-12);
    }

    #[test]
    fn test_stdev_needs_two_values() {
        assert_eq!(
            stdev(&[1.0]),
            Err(StatsError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_stdev_constant_is_zero() {
        assert_eq!(stdev(&[7.5; 20]).unwrap(), 0.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        // index = floor(0.95 * 100) = 95 -> value 96
        assert_eq!(percentile(&values, 95.0).unwrap(), 96.0);
        assert_eq!(percentile(&values, 99.0).unwrap(), 100.0);
        assert_eq!(percentile(&values, 1.0).unwrap(), 2.0);
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 50.0).unwrap(), 2.0);
    }

    #[test]
    fn test_percentile_whole_p_lands_on_exact_rank() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        // floor(29 / 100 * 100) = 29 -> value 30
        assert_eq!(percentile(&values, 29.0).unwrap(), 30.0);
        assert_eq!(percentile(&values, 57.0).unwrap(), 58.0);
        for p in 1..100u32 {
            assert_eq!(percentile(&values, f64::from(p)).unwrap(), f64::from(p + 1));
        }
    }

    #[test]
    fn test_percentile_100_is_max() {
        let values = [3.0, 9.0, 1.0];
        assert_eq!(percentile(&values, 100.0).unwrap(), max(&values).unwrap());
    }

    #[test]
    fn test_percentile_rejects_out_of_range() {
        let values = [1.0];
        assert_eq!(percentile(&values, 0.0), Err(StatsError::InvalidPercentile(0.0)));
        assert!(percentile(&values, 100.5).is_err());
        assert!(percentile(&values, f64::NAN).is_err());
    }

    #[test]
    fn test_jitter_series() {
        assert_eq!(jitter_series(&[5.0, 5.0]).unwrap(), vec![0.0]);
        assert_eq!(jitter_series(&[1.0, 4.0, 2.0]).unwrap(), vec![3.0, 2.0]);
        assert!(jitter_series(&[1.0]).is_err());
    }

    #[test]
    fn test_speedup() {
        assert_relative_eq!(speedup(50.0, 150.0).unwrap(), 3.0);
        assert_eq!(speedup(0.0, 150.0), Err(StatsError::DivisionByZero));
    }

    #[test]
    fn test_summary() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let summary = Summary::from_values(&values).unwrap();
        assert_eq!(summary.count, 100);
        assert_relative_eq!(summary.mean, 50.5);
        assert_relative_eq!(summary.median, 50.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.p95, 96.0);
        assert_eq!(summary.p99, 100.0);
        assert_eq!(summary.entries().len(), 7);
        assert!(Summary::from_values(&[1.0]).is_err());
    }

    proptest! {
        #[test]
        fn percentile_is_monotonic(
            values in prop::collection::vec(-1e6f64..1e6, 1..200),
            a in 0.01f64..100.0,
            b in 0.01f64..100.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(percentile(&values, lo).unwrap() <= percentile(&values, hi).unwrap());
        }

        #[test]
        fn mean_between_min_and_max(values in prop::collection::vec(-1e6f64..1e6, 1..200)) {
            let m = mean(&values).unwrap();
            prop_assert!(m >= min(&values).unwrap() - 1e-6);
            prop_assert!(m <= max(&values).unwrap() + 1e-6);
        }

        #[test]
        fn jitter_series_is_non_negative(values in prop::collection::vec(-1e6f64..1e6, 2..200)) {
            let series = jitter_series(&values).unwrap();
            prop_assert_eq!(series.len(), values.len() - 1);
            prop_assert!(series.iter().all(|j| *j >= 0.0));
        }
    }
}
