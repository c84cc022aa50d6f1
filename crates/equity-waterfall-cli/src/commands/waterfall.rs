use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use equity_waterfall_core::batch::WaterfallScenario;
use equity_waterfall_core::waterfall::{self, WaterfallConfig};

use crate::input;

/// Arguments for a waterfall run
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to a JSON/YAML document with `owner_cash_flows` and `config`
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON/YAML waterfall configuration (use with --cash-flows)
    #[arg(long)]
    pub config: Option<String>,

    /// Owner cash flows (comma-separated, e.g. "-1000,200,300,900")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: WaterfallScenario = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(cash_flows) = args.cash_flows {
        let config: WaterfallConfig = match args.config {
            Some(ref path) => input::file::read_document(path)?,
            None => WaterfallConfig::default(),
        };
        WaterfallScenario {
            owner_cash_flows: cash_flows,
            config,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file>, --cash-flows or stdin required for a waterfall".into());
    };

    let result = waterfall::apply_equity_waterfall(&scenario.owner_cash_flows, &scenario.config)?;
    Ok(serde_json::to_value(result)?)
}
