//! Turns raw cash-flow records into a gapless daily series.
//!
//! Same-day records are summed in Decimal, missing calendar days are filled
//! according to [`GapFillPolicy`], and the running balance is accumulated.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::GapFillPolicy;
use crate::error::CashFlowError;
use crate::types::{CashFlowRecord, CashFlowSeries, DailyCashFlow, Money};
use crate::CashFlowResult;

/// Normalize records into one row per calendar day, ascending.
pub fn normalize(
    records: &[CashFlowRecord],
    policy: GapFillPolicy,
) -> CashFlowResult<CashFlowSeries> {
    let by_day = aggregate(records)?;

    if by_day.len() < 2 {
        return Err(CashFlowError::invalid_data(
            "records",
            format!(
                "at least 2 distinct days are required, got {}",
                by_day.len()
            ),
        ));
    }

    let observed: Vec<(NaiveDate, f64, f64)> = by_day
        .into_iter()
        .map(|(date, (cash_in, cash_out))| {
            Ok((
                date,
                to_f64(cash_in, date, "cash_in")?,
                to_f64(cash_out, date, "cash_out")?,
            ))
        })
        .collect::<CashFlowResult<_>>()?;

    let mut days: Vec<DailyCashFlow> = Vec::with_capacity(observed.len());
    let mut balance = 0.0;
    let mut filled_count = 0usize;

    let mut push = |date: NaiveDate, cash_in: f64, cash_out: f64, filled: bool| {
        let net_flow = cash_in - cash_out;
        balance += net_flow;
        days.push(DailyCashFlow {
            date,
            cash_in,
            cash_out,
            net_flow,
            cumulative_cash: balance,
            filled,
        });
    };

    for (i, &(date, cash_in, cash_out)) in observed.iter().enumerate() {
        push(date, cash_in, cash_out, false);

        let Some(&(next_date, next_in, next_out)) = observed.get(i + 1) else {
            break;
        };
        let gap = (next_date - date).num_days();
        let mut current = date;
        for k in 1..gap {
            current = current.succ_opt().ok_or_else(|| {
                CashFlowError::invalid_data("date", format!("date overflow after {current}"))
            })?;
            let (fill_in, fill_out) = match policy {
                GapFillPolicy::ZeroFill => (0.0, 0.0),
                GapFillPolicy::Interpolate => {
                    let frac = k as f64 / gap as f64;
                    (
                        cash_in + (next_in - cash_in) * frac,
                        cash_out + (next_out - cash_out) * frac,
                    )
                }
            };
            push(current, fill_in, fill_out, true);
            filled_count += 1;
        }
    }

    debug!(
        observed = observed.len(),
        filled = filled_count,
        ?policy,
        "normalized cash-flow series"
    );

    Ok(CashFlowSeries::from_days(days))
}

/// Validate amounts and sum same-day records. BTreeMap keeps dates ordered.
fn aggregate(records: &[CashFlowRecord]) -> CashFlowResult<BTreeMap<NaiveDate, (Money, Money)>> {
    let mut by_day: BTreeMap<NaiveDate, (Money, Money)> = BTreeMap::new();
    for (i, rec) in records.iter().enumerate() {
        if rec.cash_in < Decimal::ZERO {
            return Err(CashFlowError::invalid_data(
                format!("records[{i}].cash_in"),
                format!("amount must be non-negative, got {}", rec.cash_in),
            ));
        }
        if rec.cash_out < Decimal::ZERO {
            return Err(CashFlowError::invalid_data(
                format!("records[{i}].cash_out"),
                format!("amount must be non-negative, got {}", rec.cash_out),
            ));
        }
        let entry = by_day
            .entry(rec.date)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 = checked_sum(entry.0, rec.cash_in, rec.date, "cash_in")?;
        entry.1 = checked_sum(entry.1, rec.cash_out, rec.date, "cash_out")?;
    }
    Ok(by_day)
}

fn checked_sum(total: Money, amount: Money, date: NaiveDate, field: &str) -> CashFlowResult<Money> {
    total.checked_add(amount).ok_or_else(|| {
        CashFlowError::invalid_data(format!("{date}.{field}"), "same-day total overflows")
    })
}

fn to_f64(amount: Money, date: NaiveDate, field: &str) -> CashFlowResult<f64> {
    amount
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            CashFlowError::invalid_data(
                format!("{date}.{field}"),
                format!("amount {amount} cannot be represented as a finite double"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(date: NaiveDate, cash_in: Money, cash_out: Money) -> CashFlowRecord {
        CashFlowRecord::new(date, cash_in, cash_out)
    }

    #[test]
    fn test_aggregates_duplicates_and_sorts() {
        let records = vec![
            rec(d(2024, 1, 2), dec!(50), dec!(10)),
            rec(d(2024, 1, 1), dec!(100), dec!(40)),
            rec(d(2024, 1, 1), dec!(25), dec!(5)),
        ];
        let series = normalize(&records, GapFillPolicy::ZeroFill).unwrap();
        assert_eq!(series.len(), 2);
        let first = &series.days()[0];
        assert_eq!(first.date, d(2024, 1, 1));
        assert_eq!(first.cash_in, 125.0);
        assert_eq!(first.cash_out, 45.0);
        assert_eq!(first.net_flow, 80.0);
        assert_eq!(series.cumulative(), vec![80.0, 120.0]);
    }

    #[test]
    fn test_zero_fills_gaps() {
        let records = vec![
            rec(d(2024, 1, 1), dec!(100), dec!(0)),
            rec(d(2024, 1, 4), dec!(0), dec!(30)),
        ];
        let series = normalize(&records, GapFillPolicy::ZeroFill).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.net_flows(), vec![100.0, 0.0, 0.0, -30.0]);
        assert!(series.days()[1].filled);
        assert!(series.days()[2].filled);
        assert!(!series.days()[3].filled);
        assert_eq!(series.ending_balance(), 70.0);
    }

    #[test]
    fn test_interpolates_gaps() {
        let records = vec![
            rec(d(2024, 1, 1), dec!(100), dec!(0)),
            rec(d(2024, 1, 5), dec!(300), dec!(40)),
        ];
        let series = normalize(&records, GapFillPolicy::Interpolate).unwrap();
        let ins: Vec<f64> = series.days().iter().map(|x| x.cash_in).collect();
        let outs: Vec<f64> = series.days().iter().map(|x| x.cash_out).collect();
        assert_eq!(ins, vec![100.0, 150.0, 200.0, 250.0, 300.0]);
        assert_eq!(outs, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_cumulative_invariant() {
        let records: Vec<CashFlowRecord> = (0..20)
            .map(|i| {
                rec(
                    d(2024, 2, 1 + i),
                    Decimal::from(100 + (i * 37) % 11),
                    Decimal::from(90 + (i * 13) % 17),
                )
            })
            .collect();
        let series = normalize(&records, GapFillPolicy::ZeroFill).unwrap();
        let days = series.days();
        assert_eq!(days[0].cumulative_cash, days[0].net_flow);
        for t in 1..days.len() {
            let diff = days[t].cumulative_cash - days[t - 1].cumulative_cash;
            assert!((diff - days[t].net_flow).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_single_day() {
        let records = vec![
            rec(d(2024, 1, 1), dec!(1), dec!(0)),
            rec(d(2024, 1, 1), dec!(2), dec!(0)),
        ];
        assert!(matches!(
            normalize(&records, GapFillPolicy::ZeroFill),
            Err(CashFlowError::InvalidData { .. })
        ));
        assert!(normalize(&[], GapFillPolicy::ZeroFill).is_err());
    }

    #[test]
    fn test_rejects_negative_amount() {
        let records = vec![
            rec(d(2024, 1, 1), dec!(1), dec!(0)),
            rec(d(2024, 1, 2), dec!(1), dec!(-5)),
        ];
        match normalize(&records, GapFillPolicy::ZeroFill) {
            Err(CashFlowError::InvalidData { field, .. }) => {
                assert_eq!(field, "records[1].cash_out");
            }
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn test_same_day_overflow_is_invalid_data() {
        let records = vec![
            rec(d(2024, 1, 1), Decimal::MAX, dec!(0)),
            rec(d(2024, 1, 1), Decimal::MAX, dec!(0)),
            rec(d(2024, 1, 2), dec!(1), dec!(0)),
        ];
        match normalize(&records, GapFillPolicy::ZeroFill) {
            Err(CashFlowError::InvalidData { field, reason }) => {
                assert_eq!(field, "2024-01-01.cash_in");
                assert_eq!(reason, "same-day total overflows");
            }
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }
}
