use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashFlowError {
    #[error("Invalid data: {field} — {reason}")]
    InvalidData { field: String, reason: String },

    #[error("Invalid configuration: {field} — {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Model fit failure: {model} — {reason}")]
    ModelFit { model: String, reason: String },

    #[error("Computation timeout: {model} exceeded its {budget_ms} ms budget")]
    ComputationTimeout { model: String, budget_ms: u64 },

    #[error("Insufficient history: {model} needs {required} days, series has {available}")]
    InsufficientHistory {
        model: String,
        required: usize,
        available: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CashFlowError {
    /// Errors a forecast fallback may absorb instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CashFlowError::ModelFit { .. }
                | CashFlowError::ComputationTimeout { .. }
                | CashFlowError::InsufficientHistory { .. }
        )
    }

    pub(crate) fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CashFlowError::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CashFlowError {
    fn from(e: serde_json::Error) -> Self {
        CashFlowError::Serialization(e.to_string())
    }
}
