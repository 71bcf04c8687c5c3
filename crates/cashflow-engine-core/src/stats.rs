//! Numeric helpers shared by the forecasting, risk and insight modules.
//!
//! All functions are total: empty or degenerate input yields 0 rather than
//! NaN, which keeps divide-by-zero handling in one place.

use statrs::distribution::{ContinuousCDF, Normal};

/// Relative tolerance under which a sum of squares is treated as zero.
const VARIANCE_TOLERANCE: f64 = 1e-18;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    if is_negligible(ss, m, n) {
        return 0.0;
    }
    (ss / (n - 1) as f64).sqrt()
}

/// True when a sum of squares is indistinguishable from rounding noise.
pub fn is_negligible(sum_sq: f64, mean: f64, n: usize) -> bool {
    sum_sq <= VARIANCE_TOLERANCE * n as f64 * mean.abs().max(1.0).powi(2)
}

/// Percentile (0-100) of a **sorted** slice using linear interpolation.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let frac = rank - lower as f64;
                sorted[lower] * (1.0 - frac) + sorted[upper] * frac
            }
        }
    }
}

/// Ordinary least squares fit of `values` against their index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 when `values` has no variance.
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn linear_fit(values: &[f64]) -> LinearFit {
    let n = values.len();
    if n < 2 {
        return LinearFit {
            slope: 0.0,
            intercept: values.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if is_negligible(syy, y_mean, n) {
        0.0
    } else {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    };
    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}

/// Sample autocorrelation at `lag`. 0 when the lag is out of range or the
/// series has no variance.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag == 0 || n <= lag + 1 {
        return 0.0;
    }
    let m = mean(values);
    let denom: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    if is_negligible(denom, m, n) {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|t| (values[t] - m) * (values[t - lag] - m))
        .sum();
    num / denom
}

/// Sample standard deviation over each trailing window of `window` values.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values.windows(window).map(std_dev).collect()
}

/// Two-sided standard normal quantile for a confidence level, e.g. 1.96 for 0.95.
pub fn z_for_confidence(level: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|n| n.inverse_cdf(0.5 + level / 2.0))
        .ok()
        .filter(|z| z.is_finite())
        .unwrap_or(1.96)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < EPS);
        // sample stdev = sqrt(32 / 7)
        assert!((std_dev(&v) - (32.0f64 / 7.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn test_std_of_constant_is_exactly_zero() {
        assert_eq!(std_dev(&[0.1; 50]), 0.0);
        assert_eq!(std_dev(&[1500.0; 365]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile_sorted(&sorted, 50.0) - 3.0).abs() < EPS);
        assert!((percentile_sorted(&sorted, 25.0) - 2.0).abs() < EPS);
        assert!((percentile_sorted(&sorted, 10.0) - 1.4).abs() < EPS);
        assert_eq!(percentile_sorted(&[], 5.0), 0.0);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let v: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let fit = linear_fit(&v);
        assert!((fit.slope - 2.0).abs() < EPS);
        assert!((fit.intercept - 3.0).abs() < EPS);
        assert!((fit.r_squared - 1.0).abs() < EPS);
        assert!((fit.predict(10.0) - 23.0).abs() < EPS);
    }

    #[test]
    fn test_linear_fit_flat() {
        let fit = linear_fit(&[4.0; 20]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_autocorrelation_weekly_pattern() {
        let v: Vec<f64> = (0..84)
            .map(|i| if i % 7 == 0 { 100.0 } else { -10.0 })
            .collect();
        assert!(autocorrelation(&v, 7) > 0.8);
        assert!(autocorrelation(&v, 3) < 0.3);
        assert_eq!(autocorrelation(&[5.0; 40], 7), 0.0);
        assert_eq!(autocorrelation(&v[..5], 7), 0.0);
    }

    #[test]
    fn test_rolling_std_window_count() {
        let v: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let r = rolling_std(&v, 30);
        assert_eq!(r.len(), 11);
        assert!(rolling_std(&v[..10], 30).is_empty());
    }

    #[test]
    fn test_z_scores() {
        assert!((z_for_confidence(0.95) - 1.959964).abs() < 1e-5);
        assert!((z_for_confidence(0.99) - 2.575829).abs() < 1e-5);
    }
}
