use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal, Triangular, Uniform};
use std::time::Instant;

use crate::batch::{evaluate_batch, CancellationToken, WaterfallScenario};
use crate::error::WaterfallError;
use crate::types::{ComputationMetadata, ComputationOutput, Money, PartnerId};
use crate::waterfall::{evaluate_waterfall, WaterfallConfig};
use crate::WaterfallResult;

const MIN_SIMULATIONS: u32 = 100;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Probability distribution of the per-period distribution shock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McDistribution {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

/// Monte Carlo over the owner cash-flow series of one waterfall.
///
/// Every positive owner flow is multiplied by an independent draw from
/// `distribution_shock` (floored at zero); capital calls are left as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McWaterfallInput {
    pub owner_cash_flows: Vec<Money>,
    pub config: WaterfallConfig,
    pub distribution_shock: McDistribution,
    /// Number of simulation paths (minimum 100).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
}

fn default_num_simulations() -> u32 {
    1_000
}

/// Percentile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: McPercentiles,
}

/// Simulated return distribution for one partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McPartnerResult {
    pub partner_id: PartnerId,
    /// Over the paths with a defined IRR; `None` if there were none
    pub irr: Option<McStatistics>,
    /// Over the paths with a bounded multiple
    pub moic: Option<McStatistics>,
    pub undefined_irr_paths: u32,
    pub unbounded_moic_paths: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McWaterfallOutput {
    pub num_simulations: u32,
    pub partners: Vec<McPartnerResult>,
    /// Paths whose evaluation returned an error
    pub failed_paths: u32,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Sample a single value from the given distribution using the provided RNG.
fn sample(rng: &mut StdRng, dist: &McDistribution) -> WaterfallResult<f64> {
    match dist {
        McDistribution::Normal { mean, std_dev } => {
            let n = Normal::new(*mean, *std_dev).map_err(|e| WaterfallError::InvalidInput {
                field: "distribution_shock".into(),
                reason: format!("Invalid Normal parameters: {e}"),
            })?;
            Ok(rng.sample(n))
        }
        McDistribution::LogNormal { mu, sigma } => {
            let ln = LogNormal::new(*mu, *sigma).map_err(|e| WaterfallError::InvalidInput {
                field: "distribution_shock".into(),
                reason: format!("Invalid LogNormal parameters: {e}"),
            })?;
            Ok(rng.sample(ln))
        }
        McDistribution::Triangular { min, mode, max } => {
            let t = Triangular::new(*min, *max, *mode).map_err(|e| WaterfallError::InvalidInput {
                field: "distribution_shock".into(),
                reason: format!("Invalid Triangular parameters: {e}"),
            })?;
            Ok(rng.sample(t))
        }
        McDistribution::Uniform { min, max } => {
            let u = Uniform::new(*min, *max).map_err(|e| WaterfallError::InvalidInput {
                field: "distribution_shock".into(),
                reason: format!("Invalid Uniform parameters: {e}"),
            })?;
            Ok(rng.sample(u))
        }
    }
}

/// One shocked copy of the owner flows.
fn shocked_flows(
    rng: &mut StdRng,
    owner_cash_flows: &[Money],
    shock: &McDistribution,
) -> WaterfallResult<Vec<Money>> {
    owner_cash_flows
        .iter()
        .map(|flow| {
            if *flow <= Decimal::ZERO {
                return Ok(*flow);
            }
            let factor = sample(rng, shock)?.max(0.0);
            let factor = Decimal::from_f64(factor).ok_or_else(|| WaterfallError::NumericOverflow {
                context: format!("distribution shock factor {factor}"),
            })?;
            Ok(flow * factor)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Compute the percentile value from a **sorted**, non-empty slice using
/// linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Descriptive statistics; sorts `values` in place. `None` when empty.
fn compute_statistics(values: &mut [f64]) -> Option<McStatistics> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len() as f64;

    let mean = values.iter().sum::<f64>() / n;

    let median = if values.len() % 2 == 0 {
        let mid = values.len() / 2;
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[values.len() / 2]
    };

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(McStatistics {
        mean,
        median,
        std_dev: variance.sqrt(),
        min: values[0],
        max: values[values.len() - 1],
        percentiles: McPercentiles {
            p5: percentile_sorted(values, 5.0),
            p10: percentile_sorted(values, 10.0),
            p25: percentile_sorted(values, 25.0),
            p50: percentile_sorted(values, 50.0),
            p75: percentile_sorted(values, 75.0),
            p90: percentile_sorted(values, 90.0),
            p95: percentile_sorted(values, 95.0),
        },
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the waterfall over `num_simulations` shocked copies of the owner
/// flows and summarize each partner's IRR and MOIC.
///
/// Shocks are drawn sequentially from one seeded RNG so a seed reproduces
/// the run exactly; the evaluations themselves go through the batch runner.
pub fn run_waterfall_monte_carlo(
    input: &McWaterfallInput,
    cancel: &CancellationToken,
) -> WaterfallResult<ComputationOutput<McWaterfallOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.num_simulations < MIN_SIMULATIONS {
        return Err(WaterfallError::InvalidInput {
            field: "num_simulations".into(),
            reason: format!("Must be at least {MIN_SIMULATIONS}"),
        });
    }

    // Surface configuration errors once instead of on every path
    let base = evaluate_waterfall(&input.owner_cash_flows, &input.config, &mut warnings)?;
    let partner_ids: Vec<PartnerId> = base.partners.iter().map(|p| p.partner_id.clone()).collect();
    if partner_ids.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "Owner cash flows produce no partner series".into(),
        ));
    }

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n = input.num_simulations as usize;
    let mut scenarios = Vec::with_capacity(n);
    for _ in 0..n {
        scenarios.push(WaterfallScenario {
            owner_cash_flows: shocked_flows(&mut rng, &input.owner_cash_flows, &input.distribution_shock)?,
            config: input.config.clone(),
        });
    }

    let outcomes = evaluate_batch(&scenarios, cancel)?;

    let mut irr_samples = vec![Vec::with_capacity(n); partner_ids.len()];
    let mut moic_samples = vec![Vec::with_capacity(n); partner_ids.len()];
    let mut undefined_irr = vec![0u32; partner_ids.len()];
    let mut unbounded_moic = vec![0u32; partner_ids.len()];
    let mut failed_paths = 0u32;

    for outcome in outcomes {
        let output = match outcome.outcome {
            Ok(output) => output,
            Err(e) => {
                failed_paths += 1;
                log::debug!("monte carlo path {} failed: {e}", outcome.index);
                continue;
            }
        };
        for (k, series) in output.partners.iter().enumerate().take(partner_ids.len()) {
            match series.irr.and_then(|r| r.to_f64()) {
                Some(r) => irr_samples[k].push(r),
                None => undefined_irr[k] += 1,
            }
            match series.moic.and_then(|m| m.to_f64()) {
                Some(m) => moic_samples[k].push(m),
                None => unbounded_moic[k] += 1,
            }
        }
    }

    if failed_paths > 0 {
        warnings.push(format!("{failed_paths} of {n} paths failed to evaluate"));
    }

    let partners = partner_ids
        .into_iter()
        .enumerate()
        .map(|(k, partner_id)| McPartnerResult {
            partner_id,
            irr: compute_statistics(&mut irr_samples[k]),
            moic: compute_statistics(&mut moic_samples[k]),
            undefined_irr_paths: undefined_irr[k],
            unbounded_moic_paths: unbounded_moic[k],
        })
        .collect();

    let output = McWaterfallOutput {
        num_simulations: input.num_simulations,
        partners,
        failed_paths,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Equity Waterfall",
        &serde_json::json!({
            "num_simulations": input.num_simulations,
            "seed": input.seed,
            "periods": input.owner_cash_flows.len(),
            "distribution_shock": input.distribution_shock,
        }),
        warnings,
        elapsed,
        output,
    ))
}
