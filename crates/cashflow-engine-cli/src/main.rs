mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analysis::{AnalyzeArgs, InsightsArgs, OptimizeArgs, ProjectArgs};
use commands::config::ConfigArgs;

/// Cash-flow projection, reserve optimization and liquidity insights
#[derive(Parser)]
#[command(
    name = "cfe",
    version,
    about = "Cash-flow projection, reserve optimization and liquidity insights",
    long_about = "A CLI over the cash-flow engine. Reads a JSON request of daily \
                  cash-flow records from --input or stdin and projects liquidity, \
                  sizes cash reserves, allocates surplus and reports trend, \
                  seasonality and risk insights."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project daily net flow and cash balance
    Project(ProjectArgs),
    /// Size the cash reserve and allocate surplus
    Optimize(OptimizeArgs),
    /// Projection and reserve optimization in one pass
    Analyze(AnalyzeArgs),
    /// Trend, seasonality and risk insights
    Insights(InsightsArgs),
    /// Print the effective engine configuration
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashflow_engine_core=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.as_deref();
    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::analysis::run_project(args, config_path),
        Commands::Optimize(args) => commands::analysis::run_optimize(args, config_path),
        Commands::Analyze(args) => commands::analysis::run_analyze(args, config_path),
        Commands::Insights(args) => commands::analysis::run_insights(args, config_path),
        Commands::Config(args) => commands::config::run_config(args, config_path),
        Commands::Version => {
            println!("cfe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
