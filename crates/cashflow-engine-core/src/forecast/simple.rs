use crate::stats::mean;
use crate::types::{CashFlowSeries, ForecastMethod};
use crate::CashFlowResult;

use super::{build_points, validate_horizon, ForecastModel, ModelForecast, HORIZON_CEILING_DAYS};

/// Trailing moving average of net flow, projected flat.
///
/// Needs no minimum history beyond the normalizer's two days, which makes it
/// the fallback for every other model. Produces no confidence band.
#[derive(Debug, Clone)]
pub struct SimpleModel {
    window: usize,
}

impl SimpleModel {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Average net flow over the trailing window (shorter series use all days).
    pub fn level(&self, series: &CashFlowSeries) -> f64 {
        let nets = series.net_flows();
        let start = nets.len().saturating_sub(self.window);
        mean(&nets[start..])
    }
}

impl ForecastModel for SimpleModel {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Simple
    }

    fn forecast(&self, series: &CashFlowSeries, horizon: usize) -> CashFlowResult<ModelForecast> {
        validate_horizon(horizon, HORIZON_CEILING_DAYS)?;
        let level = self.level(series);
        let nets = vec![level; horizon];
        Ok(ModelForecast {
            method: ForecastMethod::Simple,
            points: build_points(series, &nets, None)?,
            reduced_confidence: false,
            warnings: Vec::new(),
        })
    }
}
