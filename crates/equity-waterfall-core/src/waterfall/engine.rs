use std::time::Instant;

use super::clawback::apply_clawbacks;
use super::config::WaterfallConfig;
use super::multi_tier::{run_tiers, PeriodCash};
use super::plan::WaterfallPlan;
use super::push_warning;
use super::result::{build_result, ResultParts, WaterfallMode, WaterfallOutput};
use super::single_tier::allocate_single_tier;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::WaterfallResult;

/// Distribute an owner cash-flow series to the configured equity classes.
///
/// Pure and deterministic: the same flows and configuration always produce
/// the same output. Configuration errors fail before any cash is allocated;
/// numerical diagnostics are returned as warnings alongside the result.
pub fn apply_equity_waterfall(
    owner_cash_flows: &[Money],
    config: &WaterfallConfig,
) -> WaterfallResult<ComputationOutput<WaterfallOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = evaluate_waterfall(owner_cash_flows, config, &mut warnings)?;

    let methodology = match output.mode {
        WaterfallMode::SingleTier => "Equity Waterfall (single-tier pro-rata)",
        WaterfallMode::MultiTier => "Equity Waterfall (multi-tier)",
    };
    let elapsed = start.elapsed().as_micros() as u64;
    log::debug!(
        "waterfall periods={} partners={} clawbacks={} warnings={} in {elapsed}us",
        owner_cash_flows.len(),
        output.partners.len(),
        output.clawbacks.len(),
        warnings.len()
    );

    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "periods": owner_cash_flows.len(),
            "equity_classes": config.equity_classes.len(),
            "tiers": config.tiers.as_ref().map_or(0, Vec::len),
            "pref_accrual": "per period, compounding on unpaid balance",
            "hurdle_test": "first partner trailing IRR, period-granular",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// The waterfall without the metadata envelope; warnings are appended to
/// `warnings`. Batch runners call this directly.
pub fn evaluate_waterfall(
    owner_cash_flows: &[Money],
    config: &WaterfallConfig,
    warnings: &mut Vec<String>,
) -> WaterfallResult<WaterfallOutput> {
    let mode = if config.is_multi_tier() {
        WaterfallMode::MultiTier
    } else {
        WaterfallMode::SingleTier
    };

    if owner_cash_flows.len() < 2 {
        push_warning(
            warnings,
            format!(
                "At least 2 cash-flow periods are required, got {}; nothing allocated",
                owner_cash_flows.len()
            ),
        );
        return Ok(WaterfallOutput {
            owner_cash_flows: owner_cash_flows.to_vec(),
            mode,
            partners: Vec::new(),
            annual_rows: Vec::new(),
            clawbacks: Vec::new(),
        });
    }

    let parts = match mode {
        WaterfallMode::SingleTier => {
            let plan = WaterfallPlan::single_tier(config, warnings)?;
            let partner_flows = allocate_single_tier(owner_cash_flows, &plan);
            (plan, partner_flows, Vec::new(), Vec::new())
        }
        WaterfallMode::MultiTier => {
            let plan = WaterfallPlan::multi_tier(config, warnings)?;
            let mut run = run_tiers(&plan, &PeriodCash::from_owner_flows(owner_cash_flows));
            for message in run.diagnostics.drain(..) {
                push_warning(warnings, message);
            }
            let clawbacks =
                apply_clawbacks(&plan, owner_cash_flows, &mut run.partner_flows, warnings);
            (plan, run.partner_flows, run.tier_payments, clawbacks)
        }
    };
    let (plan, partner_flows, tier_payments, clawbacks) = parts;

    Ok(build_result(
        ResultParts {
            plan: &plan,
            mode,
            owner_cash_flows,
            partner_flows,
            tier_payments,
            clawbacks,
        },
        warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterfall::config::{EquityClass, SplitMap, WaterfallTier};
    use crate::WaterfallError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_period_is_degenerate() {
        let out = apply_equity_waterfall(&[dec!(100)], &WaterfallConfig::default()).unwrap();
        assert!(out.result.partners.is_empty());
        assert!(out.result.annual_rows.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_empty_config_uses_owner() {
        let out =
            apply_equity_waterfall(&[dec!(-100), dec!(150)], &WaterfallConfig::default()).unwrap();
        assert_eq!(out.result.partners.len(), 1);
        assert_eq!(out.result.partners[0].partner_id, "owner");
        assert_eq!(out.result.partners[0].cash_flows, vec![dec!(-100), dec!(150)]);
        assert_eq!(out.result.mode, WaterfallMode::SingleTier);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_config_error_propagates() {
        let config = WaterfallConfig {
            equity_classes: vec![
                EquityClass {
                    id: "lp".into(),
                    name: "Investor".into(),
                    contribution_pct: dec!(1),
                    distribution_pct: None,
                },
                EquityClass {
                    id: "gp".into(),
                    name: "Sponsor".into(),
                    contribution_pct: dec!(0),
                    distribution_pct: None,
                },
            ],
            tiers: None,
        };
        let err = apply_equity_waterfall(&[dec!(-1), dec!(2)], &config).unwrap_err();
        match err {
            WaterfallError::InvalidPercentage { class_id, .. } => assert_eq!(class_id, "gp"),
            other => panic!("Expected InvalidPercentage, got: {other:?}"),
        }
    }

    #[test]
    fn test_runaway_pref_accrual_warns_instead_of_panicking() {
        let config = WaterfallConfig {
            equity_classes: vec![EquityClass {
                id: "lp".into(),
                name: "Investor".into(),
                contribution_pct: dec!(1),
                distribution_pct: None,
            }],
            tiers: Some(vec![WaterfallTier::PreferredReturn {
                id: "pref".into(),
                distribution_splits: SplitMap::new(),
                hurdle_irr: None,
                compound_pref: true,
                pref_rate: Some(dec!(100)),
            }]),
        };
        let mut flows = vec![dec!(-1000000)];
        flows.extend(std::iter::repeat(Decimal::ZERO).take(15));
        flows.push(dec!(1));

        let out = apply_equity_waterfall(&flows, &config).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("overflowed")));
        assert_eq!(out.result.partners[0].cash_flows, flows);
    }
}
