use clap::Args;
use serde_json::Value;

use cashflow_engine_core::EngineConfig;

use crate::input;

/// Arguments for printing the effective engine configuration
#[derive(Args)]
pub struct ConfigArgs {
    /// Ignore --config and print the built-in defaults
    #[arg(long)]
    pub defaults: bool,
}

/// Engine configuration from `--config`, if one was given.
pub fn load_config(path: Option<&str>) -> Result<Option<EngineConfig>, Box<dyn std::error::Error>> {
    path.map(input::file::read_yaml_or_json::<EngineConfig>)
        .transpose()
}

pub fn run_config(args: ConfigArgs, config_path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let config = if args.defaults {
        EngineConfig::default()
    } else {
        load_config(config_path)?.unwrap_or_default()
    };
    config.validate()?;
    Ok(serde_json::to_value(config)?)
}
