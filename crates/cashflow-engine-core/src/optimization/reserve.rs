//! Minimum cash reserve and safety buffer per strategy and risk level.
//!
//! - Basic: average daily outflow times the risk level's coverage days,
//!   plus a volatility-sized safety buffer.
//! - Advanced: basic, floored at the 99% daily VaR.
//! - Comprehensive: advanced, raised to whatever keeps the projected balance
//!   non-negative after a shock the size of the historical max drawdown.

use serde::{Deserialize, Serialize};

use crate::error::CashFlowError;
use crate::risk::metrics::RiskMetrics;
use crate::types::{ProjectionPoint, ReserveStrategy, RiskLevel};
use crate::CashFlowResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservePlan {
    pub minimum_reserve: f64,
    pub safety_buffer: f64,
    pub coverage_days: u32,
    /// Reserve from outflow coverage alone.
    pub basic_reserve: f64,
    /// Reserve the stressed projection requires (comprehensive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_required_reserve: Option<f64>,
}

pub fn plan_reserve(
    strategy: ReserveStrategy,
    risk_level: RiskLevel,
    avg_daily_cash_out: f64,
    metrics: &RiskMetrics,
    projection: &[ProjectionPoint],
) -> CashFlowResult<ReservePlan> {
    let coverage_days = risk_level.coverage_days();
    let basic_reserve = (avg_daily_cash_out * coverage_days as f64).max(0.0);
    let safety_buffer = (metrics.avg_volatility * risk_level.buffer_multiplier()).max(0.0);

    let (minimum_reserve, stress_required_reserve) = match strategy {
        ReserveStrategy::Basic => (basic_reserve, None),
        ReserveStrategy::Advanced => (basic_reserve.max(metrics.var_99.abs()), None),
        ReserveStrategy::Comprehensive => {
            if projection.is_empty() {
                return Err(CashFlowError::invalid_data(
                    "projection",
                    "comprehensive strategy needs a projected balance path",
                ));
            }
            let advanced = basic_reserve.max(metrics.var_99.abs());
            let required = stressed_shortfall(projection, metrics.max_drawdown);
            (advanced.max(required), Some(required))
        }
    };

    Ok(ReservePlan {
        minimum_reserve,
        safety_buffer,
        coverage_days,
        basic_reserve,
        stress_required_reserve,
    })
}

/// Cash needed to keep `B[t] - |dd| * |B[t]|` non-negative over the path.
pub fn stressed_shortfall(projection: &[ProjectionPoint], max_drawdown: f64) -> f64 {
    let shock = max_drawdown.abs();
    projection
        .iter()
        .map(|p| p.cumulative_cash - shock * p.cumulative_cash.abs())
        .fold(0.0_f64, |worst, stressed| worst.max(-stressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn metrics(vol: f64, var_99: f64, max_dd: f64) -> RiskMetrics {
        RiskMetrics {
            var_95: var_99 / 2.0,
            var_99,
            cvar_95: var_99,
            cvar_99: var_99,
            max_drawdown: max_dd,
            max_drawdown_amount: 0.0,
            drawdown_peak_date: None,
            drawdown_trough_date: None,
            avg_volatility: vol,
            volatility_trend: 0.0,
        }
    }

    fn path(balances: &[f64]) -> Vec<ProjectionPoint> {
        balances
            .iter()
            .enumerate()
            .map(|(i, &b)| ProjectionPoint {
                date: NaiveDate::from_ymd_opt(2024, 6, 1 + i as u32).unwrap(),
                net_cash_flow: 0.0,
                cumulative_cash: b,
                confidence_lower: None,
                confidence_upper: None,
            })
            .collect()
    }

    #[test]
    fn test_basic_conservative_coverage() {
        let plan = plan_reserve(
            ReserveStrategy::Basic,
            RiskLevel::Conservative,
            6000.0,
            &metrics(0.0, 0.0, 0.0),
            &[],
        )
        .unwrap();
        assert_eq!(plan.minimum_reserve, 360_000.0);
        assert_eq!(plan.safety_buffer, 0.0);
        assert_eq!(plan.coverage_days, 60);
    }

    #[test]
    fn test_safety_buffer_multipliers() {
        let m = metrics(1000.0, 0.0, 0.0);
        let buffer = |risk| {
            plan_reserve(ReserveStrategy::Basic, risk, 10.0, &m, &[])
                .unwrap()
                .safety_buffer
        };
        assert_eq!(buffer(RiskLevel::Conservative), 2000.0);
        assert_eq!(buffer(RiskLevel::Moderate), 1500.0);
        assert_eq!(buffer(RiskLevel::Aggressive), 1000.0);
    }

    #[test]
    fn test_advanced_var_floor() {
        let m = metrics(100.0, 50_000.0, 0.0);
        let plan =
            plan_reserve(ReserveStrategy::Advanced, RiskLevel::Aggressive, 100.0, &m, &[]).unwrap();
        // basic would be 1,400
        assert_eq!(plan.basic_reserve, 1_400.0);
        assert_eq!(plan.minimum_reserve, 50_000.0);
    }

    #[test]
    fn test_comprehensive_stress() {
        // 40% drawdown shock on a path that ends at -1,000
        let m = metrics(0.0, 0.0, -0.4);
        let projection = path(&[5_000.0, 2_000.0, -1_000.0]);
        let plan = plan_reserve(
            ReserveStrategy::Comprehensive,
            RiskLevel::Aggressive,
            10.0,
            &m,
            &projection,
        )
        .unwrap();
        assert_eq!(plan.stress_required_reserve, Some(1_400.0));
        assert_eq!(plan.minimum_reserve, 1_400.0);
    }

    #[test]
    fn test_comprehensive_never_below_advanced() {
        let m = metrics(0.0, 9_000.0, -0.1);
        let projection = path(&[100_000.0, 120_000.0]);
        let plan = plan_reserve(
            ReserveStrategy::Comprehensive,
            RiskLevel::Moderate,
            100.0,
            &m,
            &projection,
        )
        .unwrap();
        assert_eq!(plan.stress_required_reserve, Some(0.0));
        assert_eq!(plan.minimum_reserve, 9_000.0);
    }

    #[test]
    fn test_comprehensive_requires_projection() {
        let m = metrics(0.0, 0.0, 0.0);
        assert!(plan_reserve(
            ReserveStrategy::Comprehensive,
            RiskLevel::Moderate,
            1.0,
            &m,
            &[]
        )
        .is_err());
    }
}
