pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod insights;
pub mod optimization;
pub mod risk;
pub mod sanitize;
pub mod series;
pub mod stats;
pub mod types;

pub use config::EngineConfig;
pub use engine::AnalysisEngine;
pub use error::CashFlowError;
pub use types::*;

/// Standard result type for all cash-flow engine operations
pub type CashFlowResult<T> = Result<T, CashFlowError>;
