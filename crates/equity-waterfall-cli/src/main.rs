mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::monte_carlo::MonteCarloArgs;
use commands::returns::IrrArgs;
use commands::sensitivity::SensitivityArgs;
use commands::waterfall::WaterfallArgs;

/// Multi-tier equity distribution waterfalls
#[derive(Parser)]
#[command(
    name = "ewf",
    version,
    about = "Multi-tier equity distribution waterfalls",
    long_about = "Distributes an owner cash-flow series to equity partners through \
                  return of capital, preferred return and promote tiers with catch-up \
                  and clawback, using decimal precision. Also runs sensitivity grids \
                  and Monte Carlo simulations over the waterfall."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the equity waterfall over an owner cash-flow series
    Waterfall(WaterfallArgs),
    /// IRR and equity multiple of a single cash-flow series
    Irr(IrrArgs),
    /// 2-way sensitivity grid over waterfall parameters
    Sensitivity(SensitivityArgs),
    /// Monte Carlo simulation of partner returns
    MonteCarlo(MonteCarloArgs),
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

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Irr(args) => commands::returns::run_irr(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Version => {
            println!("ewf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
