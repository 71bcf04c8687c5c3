//! Tiered allocation of cash held above the minimum reserve.

use serde::{Deserialize, Serialize};

use crate::sanitize::{ensure_finite, FiniteCheck};
use crate::types::{Rate, RiskLevel};
use crate::CashFlowResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTier {
    pub amount: f64,
    /// Holding period in days.
    pub duration: u32,
    pub risk: String,
    /// Annualised expected return.
    pub expected_return: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentStrategies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term: Option<InvestmentTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_term: Option<InvestmentTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term: Option<InvestmentTier>,
}

impl InvestmentStrategies {
    pub fn total(&self) -> f64 {
        [&self.short_term, &self.medium_term, &self.long_term]
            .into_iter()
            .flatten()
            .map(|t| t.amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    /// Sum over days of the balance held above the reserve.
    pub total_surplus: f64,
    /// Average daily balance above the reserve; the investable pool.
    pub avg_surplus: f64,
    /// Amount in the most aggressive bucket produced (0 when none).
    pub max_investment: f64,
    pub strategies: InvestmentStrategies,
}

struct TierProfile {
    duration: u32,
    risk: &'static str,
    expected_return: Rate,
}

const SHORT_TERM: TierProfile = TierProfile {
    duration: 30,
    risk: "low",
    expected_return: 0.02,
};

const MEDIUM_TERM: TierProfile = TierProfile {
    duration: 90,
    risk: "medium",
    expected_return: 0.035,
};

fn long_term_profile(risk_level: RiskLevel) -> TierProfile {
    match risk_level {
        RiskLevel::Conservative => TierProfile {
            duration: 180,
            risk: "medium",
            expected_return: 0.045,
        },
        RiskLevel::Moderate => TierProfile {
            duration: 270,
            risk: "medium-high",
            expected_return: 0.06,
        },
        RiskLevel::Aggressive => TierProfile {
            duration: 365,
            risk: "high",
            expected_return: 0.08,
        },
    }
}

/// (short, medium, long) shares of the investable pool.
fn tier_shares(risk_level: RiskLevel) -> (f64, f64, f64) {
    match risk_level {
        RiskLevel::Conservative => (0.60, 0.30, 0.10),
        RiskLevel::Moderate => (0.40, 0.35, 0.25),
        RiskLevel::Aggressive => (0.20, 0.30, 0.50),
    }
}

/// Allocate surplus above `minimum_reserve` across the balance path.
pub fn allocate_surplus(
    cumulative: &[f64],
    minimum_reserve: f64,
    risk_level: RiskLevel,
    min_investment_amount: f64,
) -> InvestmentAnalysis {
    let total_surplus: f64 = cumulative
        .iter()
        .map(|c| (c - minimum_reserve).max(0.0))
        .sum();

    if total_surplus <= 0.0 || cumulative.is_empty() {
        return InvestmentAnalysis {
            total_surplus: 0.0,
            avg_surplus: 0.0,
            max_investment: 0.0,
            strategies: InvestmentStrategies::default(),
        };
    }

    let avg_surplus = total_surplus / cumulative.len() as f64;
    let (short_share, medium_share, long_share) = tier_shares(risk_level);
    let tier = |share: f64, profile: TierProfile| {
        let amount = avg_surplus * share;
        (amount > 0.0 && amount >= min_investment_amount).then(|| InvestmentTier {
            amount,
            duration: profile.duration,
            risk: profile.risk.to_string(),
            expected_return: profile.expected_return,
        })
    };

    let strategies = InvestmentStrategies {
        short_term: tier(short_share, SHORT_TERM),
        medium_term: tier(medium_share, MEDIUM_TERM),
        long_term: tier(long_share, long_term_profile(risk_level)),
    };

    let max_investment = [
        &strategies.long_term,
        &strategies.medium_term,
        &strategies.short_term,
    ]
    .into_iter()
    .flatten()
    .next()
    .map(|t| t.amount)
    .unwrap_or(0.0);

    InvestmentAnalysis {
        total_surplus,
        avg_surplus,
        max_investment,
        strategies,
    }
}

impl FiniteCheck for InvestmentAnalysis {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        ensure_finite(&format!("{path}.total_surplus"), self.total_surplus)?;
        ensure_finite(&format!("{path}.avg_surplus"), self.avg_surplus)?;
        ensure_finite(&format!("{path}.max_investment"), self.max_investment)?;
        for (name, tier) in [
            ("short_term", &self.strategies.short_term),
            ("medium_term", &self.strategies.medium_term),
            ("long_term", &self.strategies.long_term),
        ] {
            if let Some(t) = tier {
                ensure_finite(&format!("{path}.strategies.{name}.amount"), t.amount)?;
            }
        }
        Ok(())
    }
}
