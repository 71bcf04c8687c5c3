//! Liquidity risk metrics over a daily net-flow series.
//!
//! - Historical VaR / CVaR at 95% and 99% (loss side, currency)
//! - Maximum drawdown of the cumulative balance, fractional and absolute
//! - Daily volatility and the trend of rolling volatility

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::sanitize::{ensure_finite, FiniteCheck};
use crate::stats::{linear_fit, mean, percentile_sorted, rolling_std, std_dev};
use crate::types::CashFlowSeries;
use crate::CashFlowResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Daily loss not exceeded on 95% of days (>= 0).
    pub var_95: f64,
    /// Daily loss not exceeded on 99% of days (>= var_95).
    pub var_99: f64,
    /// Mean daily loss on the worst 5% of days (>= 0).
    pub cvar_95: f64,
    /// Mean daily loss on the worst 1% of days (>= 0).
    pub cvar_99: f64,
    /// Worst fractional decline from a running peak (<= 0).
    pub max_drawdown: f64,
    /// Deepest absolute decline from a running peak (<= 0).
    pub max_drawdown_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawdown_peak_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawdown_trough_date: Option<NaiveDate>,
    /// Sample standard deviation of daily net flow.
    pub avg_volatility: f64,
    /// Slope of rolling volatility per day (positive = rising).
    pub volatility_trend: f64,
}

/// Drawdown profile of a cumulative balance path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    /// `min_t (c[t] - peak[t]) / |peak[t]|`, with zero peaks contributing 0.
    pub fraction: f64,
    /// Deepest `c[t] - peak[t]`.
    pub amount: f64,
    pub peak_index: Option<usize>,
    pub trough_index: Option<usize>,
}

pub fn calculate_risk_metrics(series: &CashFlowSeries, volatility_window: usize) -> RiskMetrics {
    let nets = series.net_flows();
    let mut sorted = nets.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (var_95, cvar_95) = tail_loss(&sorted, 5.0);
    let (var_99, cvar_99) = tail_loss(&sorted, 1.0);

    let dd = drawdown(&series.cumulative());
    let date_at = |idx: Option<usize>| idx.map(|i| series.days()[i].date);

    RiskMetrics {
        var_95,
        var_99,
        cvar_95,
        cvar_99,
        max_drawdown: dd.fraction,
        max_drawdown_amount: dd.amount,
        drawdown_peak_date: date_at(dd.peak_index),
        drawdown_trough_date: date_at(dd.trough_index),
        avg_volatility: std_dev(&nets),
        volatility_trend: volatility_trend(&nets, volatility_window),
    }
}

/// (VaR, CVaR) at the given lower-tail percentile, as non-negative losses.
fn tail_loss(sorted: &[f64], pct: f64) -> (f64, f64) {
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    let threshold = percentile_sorted(sorted, pct);
    let tail: Vec<f64> = sorted.iter().copied().filter(|v| *v <= threshold).collect();
    let tail_mean = if tail.is_empty() { threshold } else { mean(&tail) };
    ((-threshold).max(0.0), (-tail_mean).max(0.0))
}

pub fn drawdown(cumulative: &[f64]) -> Drawdown {
    let mut result = Drawdown {
        fraction: 0.0,
        amount: 0.0,
        peak_index: None,
        trough_index: None,
    };
    let Some(&first) = cumulative.first() else {
        return result;
    };

    let mut peak = first;
    let mut peak_idx = 0usize;
    for (t, &c) in cumulative.iter().enumerate() {
        if c > peak {
            peak = c;
            peak_idx = t;
        }
        let decline = c - peak;
        if peak != 0.0 {
            let frac = decline / peak.abs();
            if frac < result.fraction {
                result.fraction = frac;
            }
        }
        if decline < result.amount {
            result.amount = decline;
            result.peak_index = Some(peak_idx);
            result.trough_index = Some(t);
        }
    }
    result
}

/// OLS slope of rolling volatility. The window shrinks to the series length
/// for short series; fewer than two windows means no trend.
pub fn volatility_trend(nets: &[f64], window: usize) -> f64 {
    let w = window.min(nets.len());
    let rolling = rolling_std(nets, w);
    if rolling.len() < 2 {
        return 0.0;
    }
    linear_fit(&rolling).slope
}

impl FiniteCheck for RiskMetrics {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        for (name, value) in [
            ("var_95", self.var_95),
            ("var_99", self.var_99),
            ("cvar_95", self.cvar_95),
            ("cvar_99", self.cvar_99),
            ("max_drawdown", self.max_drawdown),
            ("max_drawdown_amount", self.max_drawdown_amount),
            ("avg_volatility", self.avg_volatility),
            ("volatility_trend", self.volatility_trend),
        ] {
            ensure_finite(&format!("{path}.{name}"), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::test_support::*;

    #[test]
    fn test_constant_series_has_no_risk() {
        let series = constant_series(365, 7500, 6000);
        let m = calculate_risk_metrics(&series, 30);
        assert_eq!(m.avg_volatility, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.var_95, 0.0);
        assert_eq!(m.var_99, 0.0);
        assert_eq!(m.volatility_trend, 0.0);
        assert!(m.drawdown_trough_date.is_none());
    }

    #[test]
    fn test_single_shock_is_the_trough() {
        let mut flows = vec![(0, 0); 30];
        flows[12] = (0, 100_000);
        let series = series_from(&flows);
        let m = calculate_risk_metrics(&series, 30);
        assert_eq!(m.drawdown_trough_date, Some(series.days()[12].date));
        assert_eq!(m.max_drawdown_amount, -100_000.0);
        // running max is zero, so the fractional term is guarded to 0
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn test_fractional_drawdown() {
        // balance 100 -> 150 -> 75 -> 120
        let dd = drawdown(&[100.0, 150.0, 75.0, 120.0]);
        assert!((dd.fraction - (-0.5)).abs() < 1e-12);
        assert_eq!(dd.amount, -75.0);
        assert_eq!(dd.peak_index, Some(1));
        assert_eq!(dd.trough_index, Some(2));
    }

    #[test]
    fn test_var_ordering_and_cvar() {
        // alternating +200 inflow days and 300..399 outflow days
        let flows: Vec<(i64, i64)> = (0..200)
            .map(|i| {
                if i % 2 == 0 {
                    (200, 0)
                } else {
                    (0, 300 + (i * 37) % 100)
                }
            })
            .collect();
        let series = series_from(&flows);
        let m = calculate_risk_metrics(&series, 30);
        assert!(m.var_99 >= m.var_95);
        assert!(m.cvar_95 >= m.var_95);
        assert!(m.cvar_99 >= m.var_99);
        assert!(m.var_95 > 300.0);
        assert!(m.var_99 > m.var_95);
        assert!(m.var_99 < 400.0);
    }

    #[test]
    fn test_tail_loss_values() {
        let sorted: Vec<f64> = (-50..50).map(|v| v as f64).collect();
        let (var, cvar) = tail_loss(&sorted, 5.0);
        // 5th percentile of -50..=49 with linear interpolation = -45.05
        assert!((var - 45.05).abs() < 1e-9);
        assert!(cvar > var);
    }

    #[test]
    fn test_rising_volatility_trend() {
        let nets: Vec<f64> = (0..120)
            .map(|i| if i % 2 == 0 { i as f64 } else { -(i as f64) })
            .collect();
        assert!(volatility_trend(&nets, 30) > 0.0);
        assert_eq!(volatility_trend(&nets[..1], 30), 0.0);
    }
}
