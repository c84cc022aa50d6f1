use clap::Args;
use serde_json::Value;

use equity_waterfall_core::batch::CancellationToken;
use equity_waterfall_core::scenarios::sensitivity::{self, WaterfallSensitivityInput};

use crate::input;

/// Arguments for a 2-way waterfall sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON/YAML sensitivity document
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: WaterfallSensitivityInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required for sensitivity analysis".into());
    };

    let result = sensitivity::run_waterfall_sensitivity(&sens_input, &CancellationToken::new())?;
    Ok(serde_json::to_value(result)?)
}
