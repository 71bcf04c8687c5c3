//! Regression forecaster over engineered features.
//!
//! Features per day: day-of-week indicators, lagged net flows and trailing
//! rolling means/stdevs. Columns and target are standardized, then fitted
//! with L2-regularized mini-batch gradient descent. Batch order comes from a
//! seeded `StdRng`, so a given seed always yields the same weights.
//!
//! Multi-day horizons are produced by one-step predictions fed back as lags,
//! so errors compound with the horizon.

use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::config::MlConfig;
use crate::error::CashFlowError;
use crate::stats::{mean, std_dev};
use crate::types::{CashFlowSeries, ForecastMethod};
use crate::CashFlowResult;

use super::{
    build_points, step_date, validate_horizon, ForecastModel, ModelForecast, HORIZON_CEILING_DAYS,
};

const MODEL_NAME: &str = "ml";

#[derive(Debug, Clone)]
pub struct MlModel {
    config: MlConfig,
    min_history: usize,
    z: f64,
    clock: Clock,
}

/// When the wall-clock limit on a run starts counting.
#[derive(Debug, Clone, Copy)]
enum Clock {
    Unbounded,
    Until(Instant),
    /// `time_budget_ms` from the moment a fit starts.
    Budget,
}

/// Column-wise standardization parameters.
#[derive(Debug, Clone)]
struct Scaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Scaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for j in 0..width {
            let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            means.push(mean(&col));
            let s = std_dev(&col);
            // constant columns contribute nothing once centred
            scales.push(if s > 0.0 { s } else { 1.0 });
        }
        Self { means, scales }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// A fitted linear model in standardized space.
#[derive(Debug, Clone)]
pub struct FittedRegression {
    weights: Vec<f64>,
    bias: f64,
    scaler: Scaler,
    target_mean: f64,
    target_std: f64,
    /// Training residual standard deviation in currency units.
    pub residual_std: f64,
    pub epochs_run: u32,
}

impl FittedRegression {
    fn predict(&self, raw_features: &[f64]) -> f64 {
        let x = self.scaler.transform(raw_features);
        let z: f64 = self.bias + dot(&self.weights, &x);
        z * self.target_std + self.target_mean
    }
}

impl MlModel {
    pub fn new(config: MlConfig, min_history: usize, z: f64) -> Self {
        Self {
            config,
            min_history,
            z,
            clock: Clock::Unbounded,
        }
    }

    /// Bound fitting and iterative prediction by a wall-clock budget.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.clock = Clock::Until(deadline);
        self
    }

    /// Bound each run by the configured budget, counted from the start of
    /// that run's fit rather than from construction.
    pub fn with_time_budget(mut self) -> Self {
        self.clock = Clock::Budget;
        self
    }

    fn start_clock(&self) -> Option<Instant> {
        match self.clock {
            Clock::Unbounded => None,
            Clock::Until(deadline) => Some(deadline),
            Clock::Budget => {
                Some(Instant::now() + Duration::from_millis(self.config.time_budget_ms))
            }
        }
    }

    fn check_deadline(&self, deadline: Option<Instant>) -> CashFlowResult<()> {
        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(CashFlowError::ComputationTimeout {
                    model: MODEL_NAME.into(),
                    budget_ms: self.config.time_budget_ms,
                })
            }
            _ => Ok(()),
        }
    }

    /// Raw feature vector for predicting index `t` of `history` (dated `date`).
    /// Requires `t >= max_lookback`.
    fn features(&self, history: &[f64], t: usize, date: NaiveDate) -> Vec<f64> {
        let mut row = Vec::with_capacity(6 + self.config.lags.len() + 2 * self.config.rolling_windows.len());
        // Monday is the baseline
        let dow = date.weekday().num_days_from_monday() as usize;
        for d in 1..7 {
            row.push(if dow == d { 1.0 } else { 0.0 });
        }
        for &lag in &self.config.lags {
            row.push(history[t - lag]);
        }
        for &w in &self.config.rolling_windows {
            let window = &history[t - w..t];
            row.push(mean(window));
            row.push(std_dev(window));
        }
        row
    }

    pub fn fit(&self, series: &CashFlowSeries) -> CashFlowResult<FittedRegression> {
        self.fit_until(series, self.start_clock())
    }

    fn fit_until(
        &self,
        series: &CashFlowSeries,
        deadline: Option<Instant>,
    ) -> CashFlowResult<FittedRegression> {
        let n = series.len();
        if n < self.min_history {
            return Err(CashFlowError::InsufficientHistory {
                model: MODEL_NAME.into(),
                required: self.min_history,
                available: n,
            });
        }

        let nets = series.net_flows();
        let lookback = self.config.max_lookback();
        if n < lookback + 2 {
            return Err(CashFlowError::InsufficientHistory {
                model: MODEL_NAME.into(),
                required: lookback + 2,
                available: n,
            });
        }

        let raw_rows: Vec<Vec<f64>> = (lookback..n)
            .map(|t| self.features(&nets, t, series.days()[t].date))
            .collect();
        let targets: Vec<f64> = nets[lookback..].to_vec();

        let target_mean = mean(&targets);
        let target_std = std_dev(&targets);
        if target_std == 0.0 {
            return Err(CashFlowError::ModelFit {
                model: MODEL_NAME.into(),
                reason: "target net flow has zero variance".into(),
            });
        }

        let scaler = Scaler::fit(&raw_rows);
        let rows: Vec<Vec<f64>> = raw_rows.iter().map(|r| scaler.transform(r)).collect();
        let ys: Vec<f64> = targets
            .iter()
            .map(|y| (y - target_mean) / target_std)
            .collect();

        let (weights, bias, epochs_run) = self.gradient_descent(&rows, &ys, deadline)?;

        let residuals: Vec<f64> = rows
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| (bias + dot(&weights, x) - y) * target_std)
            .collect();
        let residual_std = std_dev(&residuals);

        debug!(
            rows = rows.len(),
            features = weights.len(),
            epochs = epochs_run,
            residual_std,
            "ml model fitted"
        );

        Ok(FittedRegression {
            weights,
            bias,
            scaler,
            target_mean,
            target_std,
            residual_std,
            epochs_run,
        })
    }

    fn gradient_descent(
        &self,
        rows: &[Vec<f64>],
        ys: &[f64],
        deadline: Option<Instant>,
    ) -> CashFlowResult<(Vec<f64>, f64, u32)> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut weights = vec![0.0; width];
        let mut bias = 0.0;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let lr = self.config.learning_rate;
        let l2 = self.config.l2_penalty;

        let initial_loss = mse(rows, ys, &weights, bias);
        let mut loss = initial_loss;
        let mut epochs_run = 0;

        for _ in 0..self.config.epochs {
            self.check_deadline(deadline)?;
            order.shuffle(&mut rng);
            for batch in order.chunks(self.config.batch_size) {
                let mut grad_w = vec![0.0; width];
                let mut grad_b = 0.0;
                for &i in batch {
                    let err = bias + dot(&weights, &rows[i]) - ys[i];
                    for (g, x) in grad_w.iter_mut().zip(rows[i].iter()) {
                        *g += err * x;
                    }
                    grad_b += err;
                }
                let size = batch.len() as f64;
                for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                    *w -= lr * (g / size + l2 * *w);
                }
                bias -= lr * grad_b / size;
            }
            epochs_run += 1;
            loss = mse(rows, ys, &weights, bias);
            if !loss.is_finite() {
                return Err(CashFlowError::ModelFit {
                    model: MODEL_NAME.into(),
                    reason: format!("training loss diverged after {epochs_run} epochs"),
                });
            }
        }

        if loss > initial_loss {
            return Err(CashFlowError::ModelFit {
                model: MODEL_NAME.into(),
                reason: format!(
                    "training did not converge (loss {loss:.4} vs baseline {initial_loss:.4})"
                ),
            });
        }

        Ok((weights, bias, epochs_run))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn mse(rows: &[Vec<f64>], ys: &[f64], weights: &[f64], bias: f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = rows
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| {
            let e = bias + dot(weights, x) - y;
            e * e
        })
        .sum();
    sum / rows.len() as f64
}

impl ForecastModel for MlModel {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Ml
    }

    fn forecast(&self, series: &CashFlowSeries, horizon: usize) -> CashFlowResult<ModelForecast> {
        validate_horizon(horizon, HORIZON_CEILING_DAYS)?;
        let deadline = self.start_clock();
        let fitted = self.fit_until(series, deadline)?;
        let last_date = series
            .last_date()
            .ok_or_else(|| CashFlowError::invalid_data("series", "series is empty"))?;

        let mut history = series.net_flows();
        let mut nets = Vec::with_capacity(horizon);
        let mut half_widths = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            self.check_deadline(deadline)?;
            let t = history.len();
            let date = step_date(last_date, step)?;
            let y_hat = fitted.predict(&self.features(&history, t, date));
            if !y_hat.is_finite() {
                return Err(CashFlowError::ModelFit {
                    model: MODEL_NAME.into(),
                    reason: format!("non-finite prediction at step {step}"),
                });
            }
            history.push(y_hat);
            nets.push(y_hat);
            half_widths.push(self.z * fitted.residual_std * (step as f64).sqrt());
        }

        Ok(ModelForecast {
            method: ForecastMethod::Ml,
            points: build_points(series, &nets, Some(&half_widths))?,
            reduced_confidence: false,
            warnings: Vec::new(),
        })
    }
}
