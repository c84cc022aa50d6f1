use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use equity_waterfall_core::time_value;
use equity_waterfall_core::types::with_metadata;

use crate::input;

/// Arguments for IRR / equity multiple of a single series
#[derive(Args)]
pub struct IrrArgs {
    /// Path to a JSON/YAML document with `cash_flows`
    #[arg(long)]
    pub input: Option<String>,

    /// Periodic cash flows (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

#[derive(Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
}

#[derive(Serialize)]
struct IrrOutput {
    irr: Option<Decimal>,
    moic: Option<Decimal>,
    npv_at_irr: Option<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let cash_flows = if let Some(ref path) = args.input {
        input::file::read_document::<IrrInput>(path)?.cash_flows
    } else if let Some(flows) = args.cash_flows {
        flows
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value::<IrrInput>(data)?.cash_flows
    } else {
        return Err("--cash-flows is required (or provide --input)".into());
    };

    let irr = time_value::irr(&cash_flows);
    let npv_at_irr = match irr {
        Some(rate) => Some(time_value::npv(rate, &cash_flows)?),
        None => None,
    };
    let mut warnings = Vec::new();
    if irr.is_none() {
        warnings.push("No IRR: the series needs both contributions and distributions with an NPV sign change".into());
    }

    let output = IrrOutput {
        irr,
        moic: time_value::equity_multiple(&cash_flows),
        npv_at_irr,
    };
    let result = with_metadata(
        "IRR (bisection over [-99%, 1000%]) and equity multiple",
        &serde_json::json!({ "periods": cash_flows.len() }),
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
