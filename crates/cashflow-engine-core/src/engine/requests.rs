//! Serde request shapes for the four engine operations.
//!
//! Every parameter except `records` is optional; omitted values take the
//! engine defaults. `config` lets a caller without a config file (the
//! Node.js bindings) override engine settings inline.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::types::{CashFlowRecord, ForecastMethod, ReserveStrategy, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub records: Vec<CashFlowRecord>,
    #[serde(default)]
    pub method: ForecastMethod,
    /// Days to project; the configured default when absent.
    #[serde(default)]
    pub horizon: Option<usize>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub records: Vec<CashFlowRecord>,
    #[serde(default)]
    pub strategy: ReserveStrategy,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub records: Vec<CashFlowRecord>,
    #[serde(default, alias = "method")]
    pub projection_method: ForecastMethod,
    #[serde(default, alias = "strategy")]
    pub optimization_strategy: ReserveStrategy,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub horizon: Option<usize>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsRequest {
    pub records: Vec<CashFlowRecord>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_projection_request_defaults() {
        let req: ProjectionRequest = serde_json::from_str(
            r#"{"records": [{"date": "2024-01-01", "cash_in": "100.50", "cash_out": "20"}]}"#,
        )
        .unwrap();
        assert_eq!(req.method, ForecastMethod::Ensemble);
        assert_eq!(req.horizon, None);
        assert!(req.config.is_none());
        assert_eq!(req.records[0].cash_in, dec!(100.50));
    }

    #[test]
    fn test_analysis_request_aliases() {
        let req: AnalysisRequest = serde_json::from_str(
            r#"{
                "records": [],
                "method": "machine_learning",
                "strategy": "comprehensive",
                "risk_level": "aggressive",
                "horizon": 30
            }"#,
        )
        .unwrap();
        assert_eq!(req.projection_method, ForecastMethod::Ml);
        assert_eq!(req.optimization_strategy, ReserveStrategy::Comprehensive);
        assert_eq!(req.risk_level, RiskLevel::Aggressive);
        assert_eq!(req.horizon, Some(30));
    }

    #[test]
    fn test_inline_config_is_partial() {
        let req: InsightsRequest = serde_json::from_str(
            r#"{"records": [], "config": {"seasonality_threshold": 0.5}}"#,
        )
        .unwrap();
        let config = req.config.unwrap();
        assert_eq!(config.seasonality_threshold, 0.5);
        assert_eq!(config.default_horizon_days, 90);
    }

    #[test]
    fn test_bad_date_rejected() {
        let res: Result<OptimizationRequest, _> = serde_json::from_str(
            r#"{"records": [{"date": "2024-13-01", "cash_in": "1", "cash_out": "0"}]}"#,
        );
        assert!(res.is_err());
    }
}
