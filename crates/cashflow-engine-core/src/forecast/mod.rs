//! Forecasting models behind one shared contract.
//!
//! Every model turns a normalized [`CashFlowSeries`] into `horizon` daily
//! [`ProjectionPoint`]s starting the day after the last observation, with
//! the cumulative balance continuing from the series' ending balance.
//! Models are fitted per call; none keeps state between calls.

pub mod advanced;
pub mod ensemble;
pub mod ml;
pub mod simple;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CashFlowError;
use crate::types::{CashFlowSeries, ForecastMethod, ProjectionPoint};
use crate::CashFlowResult;

pub use advanced::AdvancedModel;
pub use ensemble::EnsembleModel;
pub use ml::MlModel;
pub use simple::SimpleModel;

/// Output of a single model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelForecast {
    /// The model that actually produced the points (Simple after a fallback).
    pub method: ForecastMethod,
    pub points: Vec<ProjectionPoint>,
    /// Set when the requested model could not run and a fallback was used.
    pub reduced_confidence: bool,
    pub warnings: Vec<String>,
}

pub trait ForecastModel {
    fn method(&self) -> ForecastMethod;

    fn forecast(&self, series: &CashFlowSeries, horizon: usize) -> CashFlowResult<ModelForecast>;
}

/// Hard ceiling on any projection, checked before points are allocated.
pub const HORIZON_CEILING_DAYS: usize = 36_500;

pub fn validate_horizon(horizon: usize, max_days: usize) -> CashFlowResult<()> {
    if horizon == 0 {
        return Err(CashFlowError::invalid_data(
            "horizon",
            "projection horizon must be at least 1 day",
        ));
    }
    let max_days = max_days.min(HORIZON_CEILING_DAYS);
    if horizon > max_days {
        return Err(CashFlowError::invalid_data(
            "horizon",
            format!("projection horizon {horizon} exceeds the {max_days}-day maximum"),
        ));
    }
    Ok(())
}

/// Run `model`, substituting the simple forecast when it fails recoverably.
pub fn forecast_or_fallback(
    model: &dyn ForecastModel,
    fallback: &SimpleModel,
    series: &CashFlowSeries,
    horizon: usize,
) -> CashFlowResult<ModelForecast> {
    match model.forecast(series, horizon) {
        Ok(fc) => Ok(fc),
        Err(e) if e.is_recoverable() => {
            warn!(model = %model.method(), error = %e, "forecast model fell back to simple");
            let mut fc = fallback.forecast(series, horizon)?;
            fc.reduced_confidence = true;
            fc.warnings.push(format!(
                "{} forecast unavailable ({e}); using simple moving average with reduced confidence",
                model.method()
            ));
            Ok(fc)
        }
        Err(e) => Err(e),
    }
}

/// Assemble projection points from per-step net flows and optional band
/// half-widths.
pub(crate) fn build_points(
    series: &CashFlowSeries,
    nets: &[f64],
    half_widths: Option<&[f64]>,
) -> CashFlowResult<Vec<ProjectionPoint>> {
    let last_date = series
        .last_date()
        .ok_or_else(|| CashFlowError::invalid_data("series", "series is empty"))?;
    let mut balance = series.ending_balance();
    nets.iter()
        .enumerate()
        .map(|(i, &net)| {
            balance += net;
            let band = half_widths.and_then(|hw| hw.get(i)).copied();
            Ok(ProjectionPoint {
                date: step_date(last_date, i + 1)?,
                net_cash_flow: net,
                cumulative_cash: balance,
                confidence_lower: band.map(|b| net - b),
                confidence_upper: band.map(|b| net + b),
            })
        })
        .collect()
}

pub(crate) fn step_date(last: NaiveDate, step: usize) -> CashFlowResult<NaiveDate> {
    last.checked_add_days(Days::new(step as u64)).ok_or_else(|| {
        CashFlowError::invalid_data("horizon", format!("date overflow {step} days after {last}"))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::config::GapFillPolicy;
    use crate::series::normalizer::normalize;
    use crate::types::{CashFlowRecord, CashFlowSeries};

    pub fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    /// Series built from whole-currency (cash_in, cash_out) pairs, one per day.
    pub fn series_from(flows: &[(i64, i64)]) -> CashFlowSeries {
        let records: Vec<CashFlowRecord> = flows
            .iter()
            .enumerate()
            .map(|(i, &(cin, cout))| {
                CashFlowRecord::new(
                    start() + chrono::Days::new(i as u64),
                    Decimal::from(cin),
                    Decimal::from(cout),
                )
            })
            .collect();
        normalize(&records, GapFillPolicy::ZeroFill).unwrap()
    }

    pub fn constant_series(days: usize, cash_in: i64, cash_out: i64) -> CashFlowSeries {
        series_from(&vec![(cash_in, cash_out); days])
    }

    /// Deterministic noisy series with an upward drift and a weekly cycle.
    pub fn weekly_series(days: usize) -> CashFlowSeries {
        let flows: Vec<(i64, i64)> = (0..days)
            .map(|i| {
                let weekly = if i % 7 == 0 { 4_000 } else { 0 };
                let noise = ((i * 7919) % 97) as i64 * 10;
                (5_000 + weekly + noise + i as i64 * 5, 5_200)
            })
            .collect();
        series_from(&flows)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    struct AlwaysFails {
        recoverable: bool,
    }

    impl ForecastModel for AlwaysFails {
        fn method(&self) -> ForecastMethod {
            ForecastMethod::Advanced
        }

        fn forecast(&self, _: &CashFlowSeries, _: usize) -> CashFlowResult<ModelForecast> {
            if self.recoverable {
                Err(CashFlowError::ModelFit {
                    model: "advanced".into(),
                    reason: "boom".into(),
                })
            } else {
                Err(CashFlowError::invalid_data("series", "bad"))
            }
        }
    }

    #[test]
    fn test_recoverable_error_falls_back() {
        let series = constant_series(40, 100, 80);
        let failing = AlwaysFails { recoverable: true };
        let fc = forecast_or_fallback(&failing, &SimpleModel::new(30), &series, 5).unwrap();
        assert_eq!(fc.method, ForecastMethod::Simple);
        assert!(fc.reduced_confidence);
        assert_eq!(fc.points.len(), 5);
        assert_eq!(fc.warnings.len(), 1);
    }

    #[test]
    fn test_unrecoverable_error_propagates() {
        let series = constant_series(40, 100, 80);
        let failing = AlwaysFails { recoverable: false };
        assert!(forecast_or_fallback(&failing, &SimpleModel::new(30), &series, 5).is_err());
    }

    #[test]
    fn test_build_points_dates_and_balance() {
        let series = constant_series(3, 10, 0);
        let pts = build_points(&series, &[1.0, 2.0], Some(&[0.5, 1.0])).unwrap();
        assert_eq!(pts[0].date, NaiveDate::from_ymd_opt(2023, 1, 4).unwrap());
        assert_eq!(pts[1].date, NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
        assert_eq!(pts[0].cumulative_cash, 31.0);
        assert_eq!(pts[1].cumulative_cash, 33.0);
        assert_eq!(pts[1].confidence_lower, Some(1.0));
        assert_eq!(pts[1].confidence_upper, Some(3.0));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        assert!(validate_horizon(0, 90).is_err());
        assert!(validate_horizon(1, 90).is_ok());
    }

    #[test]
    fn test_horizon_upper_bound() {
        assert!(validate_horizon(90, 90).is_ok());
        assert!(validate_horizon(91, 90).is_err());
        assert!(validate_horizon(usize::MAX, usize::MAX).is_err());
        let series = constant_series(10, 5, 1);
        let res = SimpleModel::new(5).forecast(&series, usize::MAX);
        assert!(matches!(res, Err(CashFlowError::InvalidData { .. })));
    }
}
