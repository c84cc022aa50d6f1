use clap::Args;
use serde_json::Value;

use equity_waterfall_core::batch::CancellationToken;
use equity_waterfall_core::monte_carlo::simulation::{self, McWaterfallInput};

use crate::input;

/// Arguments for a Monte Carlo waterfall simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to a JSON/YAML simulation document
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of simulation paths
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: McWaterfallInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required for Monte Carlo simulation".into());
    };
    if let Some(n) = args.simulations {
        mc_input.num_simulations = n;
    }
    if args.seed.is_some() {
        mc_input.seed = args.seed;
    }

    let result = simulation::run_waterfall_monte_carlo(&mc_input, &CancellationToken::new())?;
    Ok(serde_json::to_value(result)?)
}
