use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CashFlowError;

/// Monetary amounts at the ingestion boundary. Kept as Decimal so that
/// same-day aggregation is exact before the series moves to `f64`.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// One raw cash-flow observation as supplied by the dataset service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub date: NaiveDate,
    pub cash_in: Money,
    pub cash_out: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CashFlowRecord {
    pub fn new(date: NaiveDate, cash_in: Money, cash_out: Money) -> Self {
        Self {
            date,
            cash_in,
            cash_out,
            category: None,
            description: None,
        }
    }

    pub fn net_flow(&self) -> Money {
        self.cash_in - self.cash_out
    }
}

/// A single calendar day of a normalized series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCashFlow {
    pub date: NaiveDate,
    pub cash_in: f64,
    pub cash_out: f64,
    pub net_flow: f64,
    pub cumulative_cash: f64,
    /// True when the day had no observation and was produced by gap filling.
    pub filled: bool,
}

/// Gapless, ascending, one-row-per-day series. Only constructed by the
/// normalizer, so the invariants hold for every instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSeries {
    days: Vec<DailyCashFlow>,
}

impl CashFlowSeries {
    pub(crate) fn from_days(days: Vec<DailyCashFlow>) -> Self {
        Self { days }
    }

    pub fn days(&self) -> &[DailyCashFlow] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn net_flows(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.net_flow).collect()
    }

    pub fn cumulative(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.cumulative_cash).collect()
    }

    pub fn cash_outs(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.cash_out).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }

    /// Cumulative balance at the end of the series (0 when empty).
    pub fn ending_balance(&self) -> f64 {
        self.days.last().map(|d| d.cumulative_cash).unwrap_or(0.0)
    }
}

/// One projected day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub date: NaiveDate,
    pub net_cash_flow: f64,
    pub cumulative_cash: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_upper: Option<f64>,
}

/// Projection method selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Simple,
    Advanced,
    #[default]
    Ensemble,
    #[serde(alias = "machine_learning")]
    Ml,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ForecastMethod::Simple => "simple",
            ForecastMethod::Advanced => "advanced",
            ForecastMethod::Ensemble => "ensemble",
            ForecastMethod::Ml => "ml",
        };
        f.write_str(s)
    }
}

impl FromStr for ForecastMethod {
    type Err = CashFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ForecastMethod::Simple),
            "advanced" => Ok(ForecastMethod::Advanced),
            "ensemble" => Ok(ForecastMethod::Ensemble),
            "ml" | "machine_learning" => Ok(ForecastMethod::Ml),
            other => Err(CashFlowError::invalid_data(
                "method",
                format!("unknown projection method '{other}' (simple, advanced, ensemble, ml)"),
            )),
        }
    }
}

/// Reserve optimization strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveStrategy {
    #[default]
    Basic,
    Advanced,
    Comprehensive,
}

impl fmt::Display for ReserveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReserveStrategy::Basic => "basic",
            ReserveStrategy::Advanced => "advanced",
            ReserveStrategy::Comprehensive => "comprehensive",
        };
        f.write_str(s)
    }
}

impl FromStr for ReserveStrategy {
    type Err = CashFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ReserveStrategy::Basic),
            "advanced" => Ok(ReserveStrategy::Advanced),
            "comprehensive" => Ok(ReserveStrategy::Comprehensive),
            other => Err(CashFlowError::invalid_data(
                "strategy",
                format!("unknown optimization strategy '{other}' (basic, advanced, comprehensive)"),
            )),
        }
    }
}

/// Risk appetite driving reserve coverage and allocation shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskLevel {
    /// Days of average outflow the basic reserve must cover.
    pub fn coverage_days(&self) -> u32 {
        match self {
            RiskLevel::Conservative => 60,
            RiskLevel::Moderate => 30,
            RiskLevel::Aggressive => 14,
        }
    }

    /// Multiple of daily volatility held as a safety buffer.
    pub fn buffer_multiplier(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 2.0,
            RiskLevel::Moderate => 1.5,
            RiskLevel::Aggressive => 1.0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Conservative => "conservative",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}

impl FromStr for RiskLevel {
    type Err = CashFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskLevel::Conservative),
            "moderate" => Ok(RiskLevel::Moderate),
            "aggressive" => Ok(RiskLevel::Aggressive),
            other => Err(CashFlowError::invalid_data(
                "risk_level",
                format!("unknown risk level '{other}' (conservative, moderate, aggressive)"),
            )),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Carries no timing so that identical
/// inputs produce identical envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "ieee754_f64".to_string(),
        },
    }
}
