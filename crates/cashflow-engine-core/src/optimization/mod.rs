//! Reserve sizing, surplus allocation and the combined optimization result.

pub mod investment;
pub mod reserve;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::insights::rules::{evaluate, Rule};
use crate::risk::metrics::{calculate_risk_metrics, RiskMetrics};
use crate::sanitize::{ensure_finite, FiniteCheck};
use crate::stats::mean;
use crate::types::{CashFlowSeries, ProjectionPoint, ReserveStrategy, RiskLevel};
use crate::CashFlowResult;

use investment::{allocate_surplus, InvestmentAnalysis};
use reserve::plan_reserve;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub strategy: ReserveStrategy,
    pub risk_level: RiskLevel,
    pub minimum_reserve: f64,
    /// Daily net-flow volatility over the analysis window.
    pub cash_flow_volatility: f64,
    pub safety_buffer: f64,
    pub avg_daily_cash_out: f64,
    pub coverage_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_required_reserve: Option<f64>,
    pub risk_metrics: RiskMetrics,
    pub investment_analysis: InvestmentAnalysis,
    pub recommendations: Vec<String>,
}

/// Size the reserve, allocate surplus and derive recommendations.
///
/// `projection` is the forward balance path; only the comprehensive
/// strategy reads it.
pub fn optimize_cash_flow(
    series: &CashFlowSeries,
    strategy: ReserveStrategy,
    risk_level: RiskLevel,
    projection: &[ProjectionPoint],
    config: &EngineConfig,
) -> CashFlowResult<OptimizationResult> {
    let metrics = calculate_risk_metrics(series, config.volatility_window_days);
    let avg_daily_cash_out = mean(&series.cash_outs());

    let plan = plan_reserve(strategy, risk_level, avg_daily_cash_out, &metrics, projection)?;
    let investment = allocate_surplus(
        &series.cumulative(),
        plan.minimum_reserve,
        risk_level,
        config.min_investment_amount,
    );

    let mut result = OptimizationResult {
        strategy,
        risk_level,
        minimum_reserve: plan.minimum_reserve,
        cash_flow_volatility: metrics.avg_volatility,
        safety_buffer: plan.safety_buffer,
        avg_daily_cash_out,
        coverage_days: plan.coverage_days,
        stress_required_reserve: plan.stress_required_reserve,
        risk_metrics: metrics,
        investment_analysis: investment,
        recommendations: Vec::new(),
    };
    result.recommendations = evaluate(&recommendation_rules(), &result);
    Ok(result)
}

/// Ordered recommendation rules over a finished optimization result.
pub fn recommendation_rules() -> Vec<Rule<OptimizationResult>> {
    vec![
        Rule::new(
            "hold_minimum_reserve",
            |_: &OptimizationResult| true,
            |r: &OptimizationResult| {
                format!(
                    "Maintain a minimum reserve of {:.2} to avoid cash shortages ({} days of average outflow under a {} profile).",
                    r.minimum_reserve, r.coverage_days, r.risk_level
                )
            },
        ),
        Rule::new(
            "hold_safety_buffer",
            |r: &OptimizationResult| r.safety_buffer > 0.0,
            |r: &OptimizationResult| {
                format!(
                    "Keep an additional safety buffer of {:.2} above the reserve to absorb day-to-day volatility.",
                    r.safety_buffer
                )
            },
        ),
        Rule::new(
            "var_exceeds_coverage",
            |r: &OptimizationResult| r.risk_metrics.var_99 > r.avg_daily_cash_out * r.coverage_days as f64,
            |r: &OptimizationResult| {
                format!(
                    "A single bad day (99% VaR {:.2}) can exceed the outflow-coverage reserve; prefer the advanced or comprehensive strategy.",
                    r.risk_metrics.var_99
                )
            },
        ),
        Rule::new(
            "stress_binding",
            |r: &OptimizationResult| r.stress_required_reserve.is_some_and(|s| s >= r.minimum_reserve && s > 0.0),
            |r: &OptimizationResult| {
                format!(
                    "The drawdown stress test sets the reserve: a {:.1}% shock to the projected balance needs {:.2} on hand.",
                    r.risk_metrics.max_drawdown.abs() * 100.0,
                    r.minimum_reserve
                )
            },
        ),
        Rule::new(
            "rising_volatility",
            |r: &OptimizationResult| r.risk_metrics.volatility_trend > 0.0,
            |_: &OptimizationResult| {
                "Cash-flow volatility is rising; review the reserve more frequently.".to_string()
            },
        ),
        Rule::new(
            "deep_drawdown",
            |r: &OptimizationResult| r.risk_metrics.max_drawdown < -0.25,
            |r: &OptimizationResult| {
                format!(
                    "Historical peak-to-trough decline of {:.1}%; arrange a committed credit line as a backstop.",
                    r.risk_metrics.max_drawdown.abs() * 100.0
                )
            },
        ),
        Rule::new(
            "invest_surplus",
            |r: &OptimizationResult| r.investment_analysis.max_investment > 0.0,
            |r: &OptimizationResult| {
                format!(
                    "Average surplus of {:.2} sits above the reserve; up to {:.2} can go into the longest-dated bucket offered.",
                    r.investment_analysis.avg_surplus, r.investment_analysis.max_investment
                )
            },
        ),
        Rule::new(
            "no_surplus",
            |r: &OptimizationResult| r.investment_analysis.total_surplus <= 0.0,
            |_: &OptimizationResult| {
                "No cash above the reserve to invest; prioritise building liquidity before committing funds.".to_string()
            },
        ),
    ]
}

impl FiniteCheck for OptimizationResult {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        ensure_finite(&format!("{path}.minimum_reserve"), self.minimum_reserve)?;
        ensure_finite(&format!("{path}.cash_flow_volatility"), self.cash_flow_volatility)?;
        ensure_finite(&format!("{path}.safety_buffer"), self.safety_buffer)?;
        ensure_finite(&format!("{path}.avg_daily_cash_out"), self.avg_daily_cash_out)?;
        self.stress_required_reserve
            .check_finite(&format!("{path}.stress_required_reserve"))?;
        self.risk_metrics
            .check_finite(&format!("{path}.risk_metrics"))?;
        self.investment_analysis
            .check_finite(&format!("{path}.investment_analysis"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::test_support::*;
    use crate::insights::rules::fired;

    fn run(series: &CashFlowSeries, strategy: ReserveStrategy, risk: RiskLevel) -> OptimizationResult {
        optimize_cash_flow(series, strategy, risk, &[], &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_constant_series_basic_conservative() {
        let series = constant_series(365, 7500, 6000);
        let r = run(&series, ReserveStrategy::Basic, RiskLevel::Conservative);
        assert_eq!(r.minimum_reserve, 360_000.0);
        assert_eq!(r.cash_flow_volatility, 0.0);
        assert_eq!(r.safety_buffer, 0.0);
        assert_eq!(r.risk_metrics.max_drawdown, 0.0);
        assert!(r.investment_analysis.total_surplus > 0.0);
        assert!(r.recommendations[0].contains("360000.00"));
    }

    #[test]
    fn test_reserve_monotone_in_risk_level() {
        let series = weekly_series(120);
        for strategy in [ReserveStrategy::Basic, ReserveStrategy::Advanced] {
            let c = run(&series, strategy, RiskLevel::Conservative).minimum_reserve;
            let m = run(&series, strategy, RiskLevel::Moderate).minimum_reserve;
            let a = run(&series, strategy, RiskLevel::Aggressive).minimum_reserve;
            assert!(c >= m && m >= a, "{strategy}: {c} {m} {a}");
        }
    }

    #[test]
    fn test_rules_for_deficit_series() {
        // steady burn: no surplus ever
        let series = constant_series(60, 1000, 1500);
        let r = run(&series, ReserveStrategy::Basic, RiskLevel::Moderate);
        let names = fired(&recommendation_rules(), &r);
        assert!(names.contains(&"no_surplus"));
        assert!(!names.contains(&"invest_surplus"));
        assert_eq!(names[0], "hold_minimum_reserve");
    }

    #[test]
    fn test_result_is_finite() {
        let series = weekly_series(90);
        let r = run(&series, ReserveStrategy::Advanced, RiskLevel::Aggressive);
        assert!(r.check_finite("optimization").is_ok());
    }
}
