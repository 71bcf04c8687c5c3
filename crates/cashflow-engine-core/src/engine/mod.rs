//! The analysis orchestrator.
//!
//! `AnalysisEngine` owns nothing but a validated [`EngineConfig`]. Every
//! operation normalizes its records, fits fresh models, and returns a
//! [`ComputationOutput`] whose warnings carry any fallback taken on the way.

pub mod requests;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::forecast::{
    forecast_or_fallback, validate_horizon, AdvancedModel, EnsembleModel, ForecastModel, MlModel,
    ModelForecast, SimpleModel,
};
use crate::insights::generator::{generate_insights, Insights};
use crate::optimization::{optimize_cash_flow, OptimizationResult};
use crate::sanitize::FiniteCheck;
use crate::series::normalizer::normalize;
use crate::stats::z_for_confidence;
use crate::types::{
    with_metadata, CashFlowRecord, CashFlowSeries, ComputationOutput, ForecastMethod,
    ProjectionPoint, ReserveStrategy, RiskLevel,
};
use crate::CashFlowResult;

use requests::{AnalysisRequest, InsightsRequest, OptimizationRequest, ProjectionRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub strategy: ReserveStrategy,
    pub risk_level: RiskLevel,
    pub method: ForecastMethod,
    pub projection_horizon: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub summary: AnalysisSummary,
    pub projection: Vec<ProjectionPoint>,
    pub optimization: OptimizationResult,
}

#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> CashFlowResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Project daily net flow and balance `horizon` days past the last record.
    pub fn project(
        &self,
        records: &[CashFlowRecord],
        method: ForecastMethod,
        horizon: Option<usize>,
    ) -> CashFlowResult<ComputationOutput<Vec<ProjectionPoint>>> {
        let horizon = horizon.unwrap_or(self.config.default_horizon_days);
        validate_horizon(horizon, self.config.max_horizon_days)?;
        let series = self.series(records)?;

        let forecast = self.forecast(&series, method, horizon)?;
        forecast.points.check_finite("projection")?;
        info!(
            %method,
            horizon,
            days = series.len(),
            reduced_confidence = forecast.reduced_confidence,
            "projection complete"
        );

        Ok(with_metadata(
            &format!("Liquidity projection ({method})"),
            &json!({
                "method": method,
                "horizon_days": horizon,
                "history_days": series.len(),
                "confidence_level": self.config.confidence_level,
                "reduced_confidence": forecast.reduced_confidence,
            }),
            forecast.warnings,
            forecast.points,
        ))
    }

    /// Size the cash reserve and allocate surplus above it.
    pub fn optimize(
        &self,
        records: &[CashFlowRecord],
        strategy: ReserveStrategy,
        risk_level: RiskLevel,
    ) -> CashFlowResult<ComputationOutput<OptimizationResult>> {
        let series = self.series(records)?;
        let mut warnings = Vec::new();

        let projection = if strategy == ReserveStrategy::Comprehensive {
            let fc = self.forecast(
                &series,
                ForecastMethod::Ensemble,
                self.config.default_horizon_days,
            )?;
            warnings.extend(fc.warnings);
            fc.points
        } else {
            Vec::new()
        };

        let result = optimize_cash_flow(&series, strategy, risk_level, &projection, &self.config)?;
        result.check_finite("optimization")?;
        info!(
            %strategy,
            %risk_level,
            minimum_reserve = result.minimum_reserve,
            "optimization complete"
        );

        Ok(with_metadata(
            "Reserve optimization and surplus allocation",
            &json!({
                "strategy": strategy,
                "risk_level": risk_level,
                "coverage_days": risk_level.coverage_days(),
                "buffer_multiplier": risk_level.buffer_multiplier(),
                "stress_horizon_days": (strategy == ReserveStrategy::Comprehensive)
                    .then_some(self.config.default_horizon_days),
                "min_investment_amount": self.config.min_investment_amount,
            }),
            warnings,
            result,
        ))
    }

    /// Projection and optimization over one normalized series.
    ///
    /// A comprehensive reserve is stressed along the projection produced by
    /// `method`, so the reported reserve matches the reported path.
    pub fn analyze(
        &self,
        records: &[CashFlowRecord],
        method: ForecastMethod,
        strategy: ReserveStrategy,
        risk_level: RiskLevel,
        horizon: Option<usize>,
    ) -> CashFlowResult<ComputationOutput<AnalysisOutput>> {
        let horizon = horizon.unwrap_or(self.config.default_horizon_days);
        validate_horizon(horizon, self.config.max_horizon_days)?;
        let series = self.series(records)?;

        let forecast = self.forecast(&series, method, horizon)?;
        let optimization =
            optimize_cash_flow(&series, strategy, risk_level, &forecast.points, &self.config)?;
        forecast.points.check_finite("projection")?;
        optimization.check_finite("optimization")?;
        info!(%method, %strategy, %risk_level, horizon, "analysis complete");

        let output = AnalysisOutput {
            summary: AnalysisSummary {
                strategy,
                risk_level,
                method,
                projection_horizon: horizon,
            },
            projection: forecast.points,
            optimization,
        };
        Ok(with_metadata(
            "Liquidity projection with reserve optimization",
            &json!({
                "method": method,
                "strategy": strategy,
                "risk_level": risk_level,
                "horizon_days": horizon,
                "history_days": series.len(),
                "reduced_confidence": forecast.reduced_confidence,
            }),
            forecast.warnings,
            output,
        ))
    }

    /// Trend, seasonality and risk indicators with recommendations.
    pub fn insights(&self, records: &[CashFlowRecord]) -> CashFlowResult<ComputationOutput<Insights>> {
        let series = self.series(records)?;
        let insights = generate_insights(&series, &self.config)?;
        insights.check_finite("insights")?;
        info!(
            days = series.len(),
            recommendations = insights.recommendations.len(),
            "insights complete"
        );

        Ok(with_metadata(
            "Cash-flow trend, seasonality and risk insights",
            &json!({
                "seasonal_lags": self.config.seasonal_lags,
                "seasonality_threshold": self.config.seasonality_threshold,
                "trend_fit": "ols_on_cumulative_cash",
            }),
            Vec::new(),
            insights,
        ))
    }

    pub fn project_request(
        &self,
        req: &ProjectionRequest,
    ) -> CashFlowResult<ComputationOutput<Vec<ProjectionPoint>>> {
        self.project(&req.records, req.method, req.horizon)
    }

    pub fn optimize_request(
        &self,
        req: &OptimizationRequest,
    ) -> CashFlowResult<ComputationOutput<OptimizationResult>> {
        self.optimize(&req.records, req.strategy, req.risk_level)
    }

    pub fn analyze_request(
        &self,
        req: &AnalysisRequest,
    ) -> CashFlowResult<ComputationOutput<AnalysisOutput>> {
        self.analyze(
            &req.records,
            req.projection_method,
            req.optimization_strategy,
            req.risk_level,
            req.horizon,
        )
    }

    pub fn insights_request(
        &self,
        req: &InsightsRequest,
    ) -> CashFlowResult<ComputationOutput<Insights>> {
        self.insights(&req.records)
    }

    fn series(&self, records: &[CashFlowRecord]) -> CashFlowResult<CashFlowSeries> {
        normalize(records, self.config.gap_fill)
    }

    fn forecast(
        &self,
        series: &CashFlowSeries,
        method: ForecastMethod,
        horizon: usize,
    ) -> CashFlowResult<ModelForecast> {
        let z = z_for_confidence(self.config.confidence_level);
        let simple = SimpleModel::new(self.config.simple_window_days);
        let advanced = AdvancedModel::new(
            self.config.advanced_min_history_days,
            self.config.seasonal_lags.clone(),
            self.config.seasonality_threshold,
            z,
        );
        // the budget starts when the ML fit does, not here
        let ml = MlModel::new(self.config.ml.clone(), self.config.ml_min_history_days, z)
            .with_time_budget();
        debug!(%method, horizon, days = series.len(), "fitting forecast model");

        match method {
            ForecastMethod::Simple => simple.forecast(series, horizon),
            ForecastMethod::Advanced => forecast_or_fallback(&advanced, &simple, series, horizon),
            ForecastMethod::Ml => forecast_or_fallback(&ml, &simple, series, horizon),
            ForecastMethod::Ensemble => {
                EnsembleModel::new(simple, advanced, ml).forecast(series, horizon)
            }
        }
    }
}
