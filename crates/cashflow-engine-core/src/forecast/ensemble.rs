//! Composite forecaster: one instance of each model, blended.
//!
//! Point forecasts are a weighted average (equal weights, halved for any
//! contributor that fell back). The band takes the widest lower and upper
//! bound across interval-producing contributors and is stretched to contain
//! the blended point when the contributors disagree.

use crate::error::CashFlowError;
use crate::types::{CashFlowSeries, ForecastMethod, ProjectionPoint};
use crate::CashFlowResult;

use super::{
    forecast_or_fallback, AdvancedModel, ForecastModel, MlModel, ModelForecast, SimpleModel,
};

const FULL_WEIGHT: f64 = 1.0;
const REDUCED_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct EnsembleModel {
    pub simple: SimpleModel,
    pub advanced: AdvancedModel,
    pub ml: MlModel,
}

impl EnsembleModel {
    pub fn new(simple: SimpleModel, advanced: AdvancedModel, ml: MlModel) -> Self {
        Self {
            simple,
            advanced,
            ml,
        }
    }
}

impl ForecastModel for EnsembleModel {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Ensemble
    }

    fn forecast(&self, series: &CashFlowSeries, horizon: usize) -> CashFlowResult<ModelForecast> {
        let members = vec![
            self.simple.forecast(series, horizon)?,
            forecast_or_fallback(&self.advanced, &self.simple, series, horizon)?,
            forecast_or_fallback(&self.ml, &self.simple, series, horizon)?,
        ];
        combine(series, &members)
    }
}

/// Blend member forecasts of equal length into one ensemble forecast.
pub fn combine(series: &CashFlowSeries, members: &[ModelForecast]) -> CashFlowResult<ModelForecast> {
    let horizon = members.first().map(|m| m.points.len()).unwrap_or(0);
    if members.is_empty() || members.iter().any(|m| m.points.len() != horizon) {
        return Err(CashFlowError::invalid_data(
            "ensemble",
            "members must be non-empty and share one horizon",
        ));
    }

    let weights: Vec<f64> = members
        .iter()
        .map(|m| {
            if m.reduced_confidence {
                REDUCED_WEIGHT
            } else {
                FULL_WEIGHT
            }
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut balance = series.ending_balance();
    let mut points = Vec::with_capacity(horizon);
    for step in 0..horizon {
        let net = members
            .iter()
            .zip(weights.iter())
            .map(|(m, w)| m.points[step].net_cash_flow * w)
            .sum::<f64>()
            / total_weight;

        let lower = members
            .iter()
            .filter_map(|m| m.points[step].confidence_lower)
            .reduce(f64::min)
            .map(|lo| lo.min(net));
        let upper = members
            .iter()
            .filter_map(|m| m.points[step].confidence_upper)
            .reduce(f64::max)
            .map(|hi| hi.max(net));

        balance += net;
        points.push(ProjectionPoint {
            date: members[0].points[step].date,
            net_cash_flow: net,
            cumulative_cash: balance,
            confidence_lower: lower,
            confidence_upper: upper,
        });
    }

    let mut warnings: Vec<String> = members.iter().flat_map(|m| m.warnings.clone()).collect();
    // the simple member never falls back, so only the others count
    let all_degraded = members
        .iter()
        .skip(1)
        .all(|m| m.reduced_confidence);
    if all_degraded && members.len() > 1 {
        warnings.push("ensemble reduced to simple moving average only".to_string());
    }

    Ok(ModelForecast {
        method: ForecastMethod::Ensemble,
        points,
        reduced_confidence: all_degraded && members.len() > 1,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MlConfig;
    use crate::forecast::test_support::*;
    use chrono::NaiveDate;

    fn ensemble() -> EnsembleModel {
        EnsembleModel::new(
            SimpleModel::new(30),
            AdvancedModel::new(14, vec![7, 30], 0.3, 1.96),
            MlModel::new(MlConfig::default(), 60, 1.96),
        )
    }

    fn member(nets: &[f64], band: Option<f64>, reduced: bool) -> ModelForecast {
        ModelForecast {
            method: ForecastMethod::Simple,
            points: nets
                .iter()
                .enumerate()
                .map(|(i, &n)| ProjectionPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                    net_cash_flow: n,
                    cumulative_cash: 0.0,
                    confidence_lower: band.map(|b| n - b),
                    confidence_upper: band.map(|b| n + b),
                })
                .collect(),
            reduced_confidence: reduced,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_halves_weight_of_degraded_member() {
        let series = constant_series(5, 0, 0);
        let members = vec![
            member(&[100.0], None, false),
            member(&[200.0], Some(10.0), false),
            member(&[400.0], None, true),
        ];
        let fc = combine(&series, &members).unwrap();
        // (100 + 200 + 0.5 * 400) / 2.5
        assert!((fc.points[0].net_cash_flow - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_widest_band_encloses_point() {
        let series = constant_series(5, 0, 0);
        let members = vec![
            member(&[-1000.0], None, false),
            member(&[100.0], Some(10.0), false),
            member(&[120.0], Some(50.0), false),
        ];
        let fc = combine(&series, &members).unwrap();
        let p = &fc.points[0];
        // blended point (-260) sits below both member bands
        assert!((p.net_cash_flow - (-260.0)).abs() < 1e-9);
        assert_eq!(p.confidence_lower, Some(p.net_cash_flow));
        assert_eq!(p.confidence_upper, Some(170.0));
    }

    #[test]
    fn test_no_band_without_interval_members() {
        let series = constant_series(5, 0, 0);
        let members = vec![member(&[1.0, 2.0], None, false), member(&[3.0, 4.0], None, true)];
        let fc = combine(&series, &members).unwrap();
        assert!(fc.points.iter().all(|p| p.confidence_lower.is_none()));
        assert!(fc.reduced_confidence);
    }

    #[test]
    fn test_constant_series_does_not_fail() {
        let series = constant_series(365, 7500, 6000);
        let fc = ensemble().forecast(&series, 90).unwrap();
        assert_eq!(fc.points.len(), 90);
        // ml cannot fit a zero-variance target and falls back
        assert!(!fc.warnings.is_empty());
        for p in &fc.points {
            assert!((p.net_cash_flow - 1500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_series_degrades_to_simple() {
        let series = weekly_series(10);
        let fc = ensemble().forecast(&series, 7).unwrap();
        assert!(fc.reduced_confidence);
        assert_eq!(fc.warnings.len(), 3);
        let level = SimpleModel::new(30).level(&series);
        assert!(fc.points.iter().all(|p| (p.net_cash_flow - level).abs() < 1e-9));
    }

    #[test]
    fn test_full_ensemble_has_band() {
        let series = weekly_series(200);
        let fc = ensemble().forecast(&series, 30).unwrap();
        assert!(!fc.reduced_confidence);
        for p in &fc.points {
            let lo = p.confidence_lower.unwrap();
            let hi = p.confidence_upper.unwrap();
            assert!(lo <= p.net_cash_flow && p.net_cash_flow <= hi);
        }
    }
}
