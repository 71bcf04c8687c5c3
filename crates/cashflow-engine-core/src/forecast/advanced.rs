//! Seasonal-decomposition forecaster.
//!
//! Net flow is split into a linear trend, an optional periodic component and
//! a residual. The period is the candidate lag (weekly/monthly by default)
//! whose autocorrelation on the detrended flow is highest and above the
//! seasonality threshold. The band widens as `z * residual_std * sqrt(step)`.

use tracing::debug;

use crate::error::CashFlowError;
use crate::stats::{autocorrelation, linear_fit, mean, std_dev, LinearFit};
use crate::types::{CashFlowSeries, ForecastMethod};
use crate::CashFlowResult;

use super::{build_points, validate_horizon, ForecastModel, ModelForecast, HORIZON_CEILING_DAYS};

#[derive(Debug, Clone)]
pub struct AdvancedModel {
    min_history: usize,
    seasonal_lags: Vec<usize>,
    seasonality_threshold: f64,
    z: f64,
}

/// Fitted components of a net-flow series.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub trend: LinearFit,
    /// Detected period in days, if any.
    pub period: Option<usize>,
    /// Centred per-phase offsets; empty when no period was detected.
    pub seasonal: Vec<f64>,
    pub residual_std: f64,
}

impl Decomposition {
    fn seasonal_at(&self, t: usize) -> f64 {
        match self.period {
            Some(p) if !self.seasonal.is_empty() => self.seasonal[t % p],
            _ => 0.0,
        }
    }
}

impl AdvancedModel {
    pub fn new(
        min_history: usize,
        seasonal_lags: Vec<usize>,
        seasonality_threshold: f64,
        z: f64,
    ) -> Self {
        Self {
            min_history,
            seasonal_lags,
            seasonality_threshold,
            z,
        }
    }

    pub fn decompose(&self, nets: &[f64]) -> Decomposition {
        let trend = linear_fit(nets);
        let detrended: Vec<f64> = nets
            .iter()
            .enumerate()
            .map(|(t, y)| y - trend.predict(t as f64))
            .collect();

        let period = self
            .seasonal_lags
            .iter()
            .copied()
            .filter(|&lag| lag >= 2 && detrended.len() >= 2 * lag)
            .map(|lag| (lag, autocorrelation(&detrended, lag)))
            .filter(|&(_, acf)| acf > self.seasonality_threshold)
            .fold(None::<(usize, f64)>, |best, cand| match best {
                Some(b) if b.1 >= cand.1 => Some(b),
                _ => Some(cand),
            })
            .map(|(lag, _)| lag);

        let seasonal = match period {
            Some(p) => phase_offsets(&detrended, p),
            None => Vec::new(),
        };

        let residuals: Vec<f64> = detrended
            .iter()
            .enumerate()
            .map(|(t, d)| match period {
                Some(p) => d - seasonal[t % p],
                None => *d,
            })
            .collect();

        Decomposition {
            trend,
            period,
            seasonal,
            residual_std: std_dev(&residuals),
        }
    }
}

/// Mean detrended value per phase, centred so the offsets sum to zero.
fn phase_offsets(detrended: &[f64], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, d) in detrended.iter().enumerate() {
        sums[t % period] += d;
        counts[t % period] += 1;
    }
    let means: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .collect();
    let centre = mean(&means);
    means.iter().map(|m| m - centre).collect()
}

impl ForecastModel for AdvancedModel {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Advanced
    }

    fn forecast(&self, series: &CashFlowSeries, horizon: usize) -> CashFlowResult<ModelForecast> {
        validate_horizon(horizon, HORIZON_CEILING_DAYS)?;
        let n = series.len();
        if n < self.min_history {
            return Err(CashFlowError::InsufficientHistory {
                model: "advanced".into(),
                required: self.min_history,
                available: n,
            });
        }

        let decomposition = self.decompose(&series.net_flows());
        debug!(
            period = ?decomposition.period,
            slope = decomposition.trend.slope,
            residual_std = decomposition.residual_std,
            "advanced model fitted"
        );

        let mut nets = Vec::with_capacity(horizon);
        let mut half_widths = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let t = n - 1 + step;
            nets.push(decomposition.trend.predict(t as f64) + decomposition.seasonal_at(t));
            half_widths.push(self.z * decomposition.residual_std * (step as f64).sqrt());
        }

        Ok(ModelForecast {
            method: ForecastMethod::Advanced,
            points: build_points(series, &nets, Some(&half_widths))?,
            reduced_confidence: false,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::test_support::*;

    fn model() -> AdvancedModel {
        AdvancedModel::new(14, vec![7, 30], 0.3, 1.96)
    }

    #[test]
    fn test_detects_weekly_period() {
        let series = weekly_series(120);
        let d = model().decompose(&series.net_flows());
        assert_eq!(d.period, Some(7));
        assert_eq!(d.seasonal.len(), 7);
        assert!(d.seasonal.iter().sum::<f64>().abs() < 1e-6);
        // day 0 of each week carries the spike
        assert!(d.seasonal[0] > 3_000.0);
    }

    #[test]
    fn test_constant_series_has_no_period_and_zero_band() {
        let series = constant_series(60, 7500, 6000);
        let fc = model().forecast(&series, 5).unwrap();
        for p in &fc.points {
            assert!((p.net_cash_flow - 1500.0).abs() < 1e-6);
            assert_eq!(p.confidence_lower, Some(p.net_cash_flow));
            assert_eq!(p.confidence_upper, Some(p.net_cash_flow));
        }
        assert_eq!(model().decompose(&series.net_flows()).period, None);
    }

    #[test]
    fn test_band_widens_with_sqrt_step() {
        let series = weekly_series(90);
        let fc = model().forecast(&series, 16).unwrap();
        let width = |i: usize| {
            let p = &fc.points[i];
            p.confidence_upper.unwrap() - p.confidence_lower.unwrap()
        };
        assert!(width(0) > 0.0);
        assert!((width(3) / width(0) - 2.0).abs() < 1e-9);
        assert!((width(15) / width(0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_is_recoverable() {
        let series = constant_series(10, 100, 50);
        let err = model().forecast(&series, 5).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_cumulative_invariant_holds() {
        let series = weekly_series(100);
        let fc = model().forecast(&series, 30).unwrap();
        let first = &fc.points[0];
        assert!((first.cumulative_cash - series.ending_balance() - first.net_cash_flow).abs() < 1e-6);
        for w in fc.points.windows(2) {
            assert!((w[1].cumulative_cash - w[0].cumulative_cash - w[1].net_cash_flow).abs() < 1e-6);
        }
    }
}
