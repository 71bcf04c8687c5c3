//! Post-hoc finite-output check.
//!
//! Every value leaving the engine passes through [`FiniteCheck`]; a NaN or
//! infinity is reported as invalid data naming the offending field instead
//! of being serialized (serde_json would silently turn it into `null`).

use crate::error::CashFlowError;
use crate::types::ProjectionPoint;
use crate::CashFlowResult;

pub trait FiniteCheck {
    /// `path` names the value for error messages, e.g. `projection[3].cumulative_cash`.
    fn check_finite(&self, path: &str) -> CashFlowResult<()>;
}

pub fn ensure_finite(path: &str, value: f64) -> CashFlowResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CashFlowError::InvalidData {
            field: path.to_string(),
            reason: format!("computed value is not finite ({value})"),
        })
    }
}

impl FiniteCheck for f64 {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        ensure_finite(path, *self)
    }
}

impl<T: FiniteCheck> FiniteCheck for Option<T> {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        match self {
            Some(v) => v.check_finite(path),
            None => Ok(()),
        }
    }
}

impl<T: FiniteCheck> FiniteCheck for [T] {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        for (i, item) in self.iter().enumerate() {
            item.check_finite(&format!("{path}[{i}]"))?;
        }
        Ok(())
    }
}

impl<T: FiniteCheck> FiniteCheck for Vec<T> {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        self.as_slice().check_finite(path)
    }
}

impl FiniteCheck for ProjectionPoint {
    fn check_finite(&self, path: &str) -> CashFlowResult<()> {
        ensure_finite(&format!("{path}.net_cash_flow"), self.net_cash_flow)?;
        ensure_finite(&format!("{path}.cumulative_cash"), self.cumulative_cash)?;
        self.confidence_lower
            .check_finite(&format!("{path}.confidence_lower"))?;
        self.confidence_upper
            .check_finite(&format!("{path}.confidence_upper"))
    }
}
