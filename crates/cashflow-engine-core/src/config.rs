//! Engine configuration.
//!
//! Every field has a default so a partial YAML/JSON document (or none at
//! all) yields a usable configuration. `validate` is called when an
//! [`AnalysisEngine`](crate::engine::AnalysisEngine) is built.

use serde::{Deserialize, Serialize};

use crate::error::CashFlowError;
use crate::forecast::HORIZON_CEILING_DAYS;
use crate::CashFlowResult;

/// How calendar days with no observation are filled during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFillPolicy {
    /// Missing days carry zero inflow and zero outflow.
    #[default]
    ZeroFill,
    /// Missing days are linearly interpolated between neighbouring observations.
    Interpolate,
}

/// Hyperparameters of the regression forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub seed: u64,
    pub epochs: u32,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub batch_size: usize,
    /// Lagged net flows used as features (days).
    pub lags: Vec<usize>,
    /// Trailing windows for rolling mean/stdev features (days).
    pub rolling_windows: Vec<usize>,
    /// Wall-clock budget for a single fit, enforced at the engine boundary.
    pub time_budget_ms: u64,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            epochs: 150,
            learning_rate: 0.01,
            l2_penalty: 0.001,
            batch_size: 16,
            lags: vec![1, 2, 7],
            rolling_windows: vec![7, 14],
            time_budget_ms: 5_000,
        }
    }
}

impl MlConfig {
    /// Longest look-back any feature needs.
    pub fn max_lookback(&self) -> usize {
        self.lags
            .iter()
            .chain(self.rolling_windows.iter())
            .copied()
            .max()
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gap_fill: GapFillPolicy,
    pub default_horizon_days: usize,
    /// Longest projection a request may ask for.
    pub max_horizon_days: usize,
    pub simple_window_days: usize,
    pub advanced_min_history_days: usize,
    pub ml_min_history_days: usize,
    /// Two-sided confidence level for projection bands.
    pub confidence_level: f64,
    pub seasonality_threshold: f64,
    pub seasonal_lags: Vec<usize>,
    pub volatility_window_days: usize,
    /// Smallest amount worth opening an investment bucket for.
    pub min_investment_amount: f64,
    pub ml: MlConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gap_fill: GapFillPolicy::ZeroFill,
            default_horizon_days: 90,
            max_horizon_days: 3_650,
            simple_window_days: 30,
            advanced_min_history_days: 14,
            ml_min_history_days: 60,
            confidence_level: 0.95,
            seasonality_threshold: 0.3,
            seasonal_lags: vec![7, 30],
            volatility_window_days: 30,
            min_investment_amount: 1_000.0,
            ml: MlConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> CashFlowResult<()> {
        if self.default_horizon_days == 0 {
            return Err(invalid("default_horizon_days", "must be at least 1"));
        }
        if self.max_horizon_days < self.default_horizon_days
            || self.max_horizon_days > HORIZON_CEILING_DAYS
        {
            return Err(invalid(
                "max_horizon_days",
                format!("must be between default_horizon_days and {HORIZON_CEILING_DAYS}"),
            ));
        }
        if self.simple_window_days == 0 {
            return Err(invalid("simple_window_days", "must be at least 1"));
        }
        if self.advanced_min_history_days < 2 {
            return Err(invalid("advanced_min_history_days", "must be at least 2"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(invalid(
                "confidence_level",
                "must be between 0 and 1 (exclusive)",
            ));
        }
        if !(0.0..=1.0).contains(&self.seasonality_threshold) {
            return Err(invalid("seasonality_threshold", "must be within [0, 1]"));
        }
        if self.seasonal_lags.iter().any(|&l| l < 2) {
            return Err(invalid("seasonal_lags", "every lag must be at least 2"));
        }
        if self.volatility_window_days < 2 {
            return Err(invalid("volatility_window_days", "must be at least 2"));
        }
        if !self.min_investment_amount.is_finite() || self.min_investment_amount < 0.0 {
            return Err(invalid("min_investment_amount", "must be a finite amount >= 0"));
        }
        self.validate_ml()
    }

    fn validate_ml(&self) -> CashFlowResult<()> {
        let ml = &self.ml;
        if ml.epochs == 0 {
            return Err(invalid("ml.epochs", "must be at least 1"));
        }
        if !(ml.learning_rate > 0.0 && ml.learning_rate.is_finite()) {
            return Err(invalid("ml.learning_rate", "must be a positive finite number"));
        }
        if !(ml.l2_penalty >= 0.0 && ml.l2_penalty.is_finite()) {
            return Err(invalid("ml.l2_penalty", "must be a finite number >= 0"));
        }
        if ml.batch_size == 0 {
            return Err(invalid("ml.batch_size", "must be at least 1"));
        }
        if ml.lags.is_empty() || ml.lags.contains(&0) {
            return Err(invalid("ml.lags", "need at least one lag, all >= 1"));
        }
        if ml.rolling_windows.iter().any(|&w| w < 2) {
            return Err(invalid("ml.rolling_windows", "every window must be at least 2"));
        }
        if ml.time_budget_ms == 0 {
            return Err(invalid("ml.time_budget_ms", "must be at least 1"));
        }
        if self.ml_min_history_days <= ml.max_lookback() + 1 {
            return Err(invalid(
                "ml_min_history_days",
                format!(
                    "must exceed the longest feature look-back ({} days) by at least 2",
                    ml.max_lookback()
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> CashFlowError {
    CashFlowError::InvalidConfig {
        field: field.into(),
        reason: reason.into(),
    }
}
