use napi::Result as NapiResult;
use napi_derive::napi;

use cashflow_engine_core::engine::requests::{
    AnalysisRequest, InsightsRequest, OptimizationRequest, ProjectionRequest,
};
use cashflow_engine_core::{AnalysisEngine, EngineConfig};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine for one call; a config embedded in the request replaces the defaults.
fn engine(config: Option<EngineConfig>) -> NapiResult<AnalysisEngine> {
    AnalysisEngine::new(config.unwrap_or_default()).map_err(to_napi_error)
}

#[napi]
pub fn project_liquidity(input_json: String) -> NapiResult<String> {
    let mut req: ProjectionRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine(req.config.take())?
        .project_request(&req)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn optimize_reserves(input_json: String) -> NapiResult<String> {
    let mut req: OptimizationRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine(req.config.take())?
        .optimize_request(&req)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_cash_flow(input_json: String) -> NapiResult<String> {
    let mut req: AnalysisRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine(req.config.take())?
        .analyze_request(&req)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_insights(input_json: String) -> NapiResult<String> {
    let mut req: InsightsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine(req.config.take())?
        .insights_request(&req)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
