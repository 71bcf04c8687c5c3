use clap::Args;
use serde_json::Value;
use tracing::debug;

use cashflow_engine_core::engine::requests::{
    AnalysisRequest, InsightsRequest, OptimizationRequest, ProjectionRequest,
};
use cashflow_engine_core::{
    AnalysisEngine, EngineConfig, ForecastMethod, ReserveStrategy, RiskLevel,
};

use crate::commands::config::load_config;
use crate::input;

/// Arguments for a liquidity projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON request file
    #[arg(long)]
    pub input: Option<String>,
    /// Forecast method (simple, advanced, ensemble, ml); overrides the request
    #[arg(long)]
    pub method: Option<ForecastMethod>,
    /// Days to project; overrides the request
    #[arg(long)]
    pub horizon: Option<usize>,
}

/// Arguments for reserve optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON request file
    #[arg(long)]
    pub input: Option<String>,
    /// Reserve strategy (basic, advanced, comprehensive); overrides the request
    #[arg(long)]
    pub strategy: Option<ReserveStrategy>,
    /// Risk level (conservative, moderate, aggressive); overrides the request
    #[arg(long)]
    pub risk_level: Option<RiskLevel>,
}

/// Arguments for a combined projection and optimization
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON request file
    #[arg(long)]
    pub input: Option<String>,
    #[arg(long)]
    pub method: Option<ForecastMethod>,
    #[arg(long)]
    pub strategy: Option<ReserveStrategy>,
    #[arg(long)]
    pub risk_level: Option<RiskLevel>,
    #[arg(long)]
    pub horizon: Option<usize>,
}

/// Arguments for cash-flow insights
#[derive(Args)]
pub struct InsightsArgs {
    /// Path to JSON request file
    #[arg(long)]
    pub input: Option<String>,
}

/// `--config` wins over a config embedded in the request.
fn engine_for(
    config_path: Option<&str>,
    inline: Option<EngineConfig>,
) -> Result<AnalysisEngine, Box<dyn std::error::Error>> {
    let config = match load_config(config_path)? {
        Some(config) => config,
        None => inline.unwrap_or_default(),
    };
    Ok(AnalysisEngine::new(config)?)
}

pub fn run_project(args: ProjectArgs, config_path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: ProjectionRequest = input::read_request(args.input.as_deref(), "projection")?;
    if let Some(method) = args.method {
        req.method = method;
    }
    if args.horizon.is_some() {
        req.horizon = args.horizon;
    }
    debug!(records = req.records.len(), method = %req.method, "running projection");
    let engine = engine_for(config_path, req.config.take())?;
    let result = engine.project_request(&req)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_optimize(args: OptimizeArgs, config_path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: OptimizationRequest = input::read_request(args.input.as_deref(), "reserve optimization")?;
    if let Some(strategy) = args.strategy {
        req.strategy = strategy;
    }
    if let Some(risk_level) = args.risk_level {
        req.risk_level = risk_level;
    }
    let engine = engine_for(config_path, req.config.take())?;
    let result = engine.optimize_request(&req)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: AnalyzeArgs, config_path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: AnalysisRequest = input::read_request(args.input.as_deref(), "cash-flow analysis")?;
    if let Some(method) = args.method {
        req.projection_method = method;
    }
    if let Some(strategy) = args.strategy {
        req.optimization_strategy = strategy;
    }
    if let Some(risk_level) = args.risk_level {
        req.risk_level = risk_level;
    }
    if args.horizon.is_some() {
        req.horizon = args.horizon;
    }
    let engine = engine_for(config_path, req.config.take())?;
    let result = engine.analyze_request(&req)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_insights(args: InsightsArgs, config_path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut req: InsightsRequest = input::read_request(args.input.as_deref(), "cash-flow insights")?;
    let engine = engine_for(config_path, req.config.take())?;
    let result = engine.insights_request(&req)?;
    Ok(serde_json::to_value(result)?)
}
