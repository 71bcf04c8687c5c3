//! Trend, seasonality and risk indicators with rule-based recommendations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::risk::metrics::drawdown;
use crate::sanitize::{ensure_finite, FiniteCheck};
use crate::stats::{autocorrelation, linear_fit, mean, std_dev};
use crate::types::CashFlowSeries;
use crate::CashFlowResult;

use super::rules::{evaluate_or, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAmount {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net_cash_flow: f64,
    pub average_daily_net: f64,
    pub ending_balance: f64,
    pub positive_days: usize,
    pub largest_inflow_day: DayAmount,
    pub largest_outflow_day: DayAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub trend_direction: TrendDirection,
    /// R² of the cumulative-cash fit in [0, 1]; 0 for degenerate series.
    pub trend_strength: f64,
    /// Fitted change in cumulative cash per day.
    pub trend_slope: f64,
    pub seasonality_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_period: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskIndicators {
    pub negative_cash_flow_days: usize,
    pub cash_flow_volatility_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub cash_flow_summary: CashFlowSummary,
    pub trends: Trends,
    pub risk_indicators: RiskIndicators,
    pub recommendations: Vec<String>,
}

const STABLE_FALLBACK: &str =
    "Cash-flow profile is stable with no warning signs; continue monitoring.";

pub fn generate_insights(series: &CashFlowSeries, config: &EngineConfig) -> CashFlowResult<Insights> {
    let mut insights = Insights {
        cash_flow_summary: summarize(series)?,
        trends: analyze_trends(series, config),
        risk_indicators: risk_indicators(series),
        recommendations: Vec::new(),
    };
    insights.recommendations = evaluate_or(&recommendation_rules(), &insights, STABLE_FALLBACK);
    Ok(insights)
}

fn summarize(series: &CashFlowSeries) -> CashFlowResult<CashFlowSummary> {
    let days = series.days();
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return Err(crate::error::CashFlowError::invalid_data(
            "series",
            "series is empty",
        ));
    };

    let mut largest_inflow_day = DayAmount {
        date: first.date,
        amount: first.cash_in,
    };
    let mut largest_outflow_day = DayAmount {
        date: first.date,
        amount: first.cash_out,
    };
    for d in days {
        if d.cash_in > largest_inflow_day.amount {
            largest_inflow_day = DayAmount {
                date: d.date,
                amount: d.cash_in,
            };
        }
        if d.cash_out > largest_outflow_day.amount {
            largest_outflow_day = DayAmount {
                date: d.date,
                amount: d.cash_out,
            };
        }
    }

    let total_inflow: f64 = days.iter().map(|d| d.cash_in).sum();
    let total_outflow: f64 = days.iter().map(|d| d.cash_out).sum();
    let nets = series.net_flows();

    Ok(CashFlowSummary {
        start_date: first.date,
        end_date: last.date,
        days: days.len(),
        total_inflow,
        total_outflow,
        net_cash_flow: total_inflow - total_outflow,
        average_daily_net: mean(&nets),
        ending_balance: last.cumulative_cash,
        positive_days: nets.iter().filter(|n| **n > 0.0).count(),
        largest_inflow_day,
        largest_outflow_day,
    })
}

pub fn analyze_trends(series: &CashFlowSeries, config: &EngineConfig) -> Trends {
    let nets = series.net_flows();
    let fit = linear_fit(&series.cumulative());

    let tolerance = 1e-9 * mean(&nets.iter().map(|n| n.abs()).collect::<Vec<_>>()).max(1.0);
    let trend_direction = if fit.slope > tolerance {
        TrendDirection::Increasing
    } else if fit.slope < -tolerance {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    // a zero-variance flow makes the cumulative line trivially exact
    let trend_strength = if std_dev(&nets) == 0.0 {
        0.0
    } else {
        fit.r_squared.clamp(0.0, 1.0)
    };

    let seasonal_period = config
        .seasonal_lags
        .iter()
        .copied()
        .map(|lag| (lag, autocorrelation(&nets, lag)))
        .filter(|&(_, acf)| acf > config.seasonality_threshold)
        .fold(None::<(usize, f64)>, |best, cand| match best {
            Some(b) if b.1 >= cand.1 => Some(b),
            _ => Some(cand),
        })
        .map(|(lag, _)| lag);

    Trends {
        trend_direction,
        trend_strength,
        trend_slope: fit.slope,
        seasonality_detected: seasonal_period.is_some(),
        seasonal_period,
    }
}

pub fn risk_indicators(series: &CashFlowSeries) -> RiskIndicators {
    let nets = series.net_flows();
    let mean_abs = mean(&nets.iter().map(|n| n.abs()).collect::<Vec<_>>());
    let volatility = std_dev(&nets);
    RiskIndicators {
        negative_cash_flow_days: nets.iter().filter(|n| **n < 0.0).count(),
        cash_flow_volatility_ratio: if mean_abs > 0.0 {
            volatility / mean_abs
        } else {
            0.0
        },
        max_drawdown: drawdown(&series.cumulative()).fraction,
    }
}

fn negative_share(i: &Insights) -> f64 {
    if i.cash_flow_summary.days == 0 {
        0.0
    } else {
        i.risk_indicators.negative_cash_flow_days as f64 / i.cash_flow_summary.days as f64
    }
}

/// Ordered insight rules; the first matching rules lead the list.
pub fn recommendation_rules() -> Vec<Rule<Insights>> {
    vec![
        Rule::new(
            "negative_balance",
            |i: &Insights| i.cash_flow_summary.ending_balance < 0.0,
            |i: &Insights| {
                format!(
                    "Cumulative cash ends at {:.2}; secure external funding to cover the shortfall.",
                    i.cash_flow_summary.ending_balance
                )
            },
        ),
        Rule::new(
            "frequent_deficits",
            |i: &Insights| negative_share(i) > 0.3,
            |i: &Insights| {
                format!(
                    "Outflows exceed inflows on {:.0}% of days; align payment terms with collection cycles.",
                    negative_share(i) * 100.0
                )
            },
        ),
        Rule::new(
            "high_volatility",
            |i: &Insights| i.risk_indicators.cash_flow_volatility_ratio > 1.0,
            |i: &Insights| {
                format!(
                    "Daily swings exceed the typical flow size (volatility ratio {:.2}); hold a larger liquidity buffer.",
                    i.risk_indicators.cash_flow_volatility_ratio
                )
            },
        ),
        Rule::new(
            "declining_trend",
            |i: &Insights| i.trends.trend_direction == TrendDirection::Decreasing && i.trends.trend_strength >= 0.5,
            |i: &Insights| {
                format!(
                    "Cumulative cash is in a sustained decline (R² {:.2}); review cost structure and revenue timing.",
                    i.trends.trend_strength
                )
            },
        ),
        Rule::new(
            "growing_trend",
            |i: &Insights| i.trends.trend_direction == TrendDirection::Increasing && i.trends.trend_strength >= 0.5,
            |_: &Insights| {
                "Cumulative cash is growing steadily; consider investing surplus above the reserve.".to_string()
            },
        ),
        Rule::new(
            "seasonality",
            |i: &Insights| i.trends.seasonality_detected,
            |i: &Insights| {
                format!(
                    "A recurring {}-day cycle is present; schedule reserves and investments around it.",
                    i.trends.seasonal_period.unwrap_or_default()
                )
            },
        ),
        Rule::new(
            "deep_drawdown",
            |i: &Insights| i.risk_indicators.max_drawdown < -0.2,
            |i: &Insights| {
                format!(
                    "Balance fell {:.1}% from a prior peak; stress-test the reserve against a repeat.",
                    i.risk_indicators.max_drawdown.abs() * 100.0
                )
            },
        ),
    ]
}

impl FiniteCheck for Insights {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        let s = &self.cash_flow_summary;
        for (name, value) in [
            ("cash_flow_summary.total_inflow", s.total_inflow),
            ("cash_flow_summary.total_outflow", s.total_outflow),
            ("cash_flow_summary.net_cash_flow", s.net_cash_flow),
            ("cash_flow_summary.average_daily_net", s.average_daily_net),
            ("cash_flow_summary.ending_balance", s.ending_balance),
            ("trends.trend_strength", self.trends.trend_strength),
            ("trends.trend_slope", self.trends.trend_slope),
            (
                "risk_indicators.cash_flow_volatility_ratio",
                self.risk_indicators.cash_flow_volatility_ratio,
            ),
            ("risk_indicators.max_drawdown", self.risk_indicators.max_drawdown),
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
    use crate::insights::rules::fired;

    fn insights(series: &CashFlowSeries) -> Insights {
        generate_insights(series, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let i = insights(&constant_series(365, 7500, 6000));
        assert!(!i.trends.seasonality_detected);
        assert_eq!(i.trends.trend_strength, 0.0);
        assert_eq!(i.trends.trend_direction, TrendDirection::Increasing);
        assert_eq!(i.risk_indicators.negative_cash_flow_days, 0);
        assert_eq!(i.risk_indicators.cash_flow_volatility_ratio, 0.0);
        assert_eq!(i.cash_flow_summary.ending_balance, 365.0 * 1500.0);
    }

    #[test]
    fn test_flat_zero_series() {
        let i = insights(&constant_series(60, 500, 500));
        assert_eq!(i.trends.trend_direction, TrendDirection::Stable);
        assert_eq!(i.trends.trend_strength, 0.0);
        assert_eq!(i.risk_indicators.cash_flow_volatility_ratio, 0.0);
        assert_eq!(i.recommendations, vec![STABLE_FALLBACK.to_string()]);
    }

    #[test]
    fn test_single_outflow_shock() {
        let mut flows = vec![(0, 0); 45];
        flows[20] = (0, 100_000);
        let series = series_from(&flows);
        let i = insights(&series);
        assert_eq!(i.risk_indicators.negative_cash_flow_days, 1);
        assert_eq!(i.cash_flow_summary.largest_outflow_day.date, series.days()[20].date);
        assert_eq!(i.cash_flow_summary.largest_outflow_day.amount, 100_000.0);
        let names = fired(&recommendation_rules(), &i);
        assert_eq!(names[0], "negative_balance");
    }

    #[test]
    fn test_weekly_seasonality_detected() {
        let i = insights(&weekly_series(140));
        assert!(i.trends.seasonality_detected);
        assert_eq!(i.trends.seasonal_period, Some(7));
        assert!(i.recommendations.iter().any(|r| r.contains("7-day cycle")));
    }

    #[test]
    fn test_volatility_ratio() {
        // alternating +100 / -100: mean |flow| = 100
        let flows: Vec<(i64, i64)> = (0..20)
            .map(|i| if i % 2 == 0 { (100, 0) } else { (0, 100) })
            .collect();
        let series = series_from(&flows);
        let r = risk_indicators(&series);
        let expected = std_dev(&series.net_flows()) / 100.0;
        assert!((r.cash_flow_volatility_ratio - expected).abs() < 1e-12);
        assert_eq!(r.negative_cash_flow_days, 10);
    }

    #[test]
    fn test_declining_trend() {
        let flows: Vec<(i64, i64)> = (0..90)
            .map(|i| (1_000 + (i * 37 % 50), 1_400 + (i * 53 % 70)))
            .collect();
        let i = insights(&series_from(&flows));
        assert_eq!(i.trends.trend_direction, TrendDirection::Decreasing);
        assert!(i.trends.trend_strength > 0.9);
        assert!(fired(&recommendation_rules(), &i).contains(&"declining_trend"));
    }
}
