use equity_waterfall_core::time_value::{irr, npv};
use equity_waterfall_core::waterfall::{
    apply_equity_waterfall, normalize_percentages, ClawbackMethod, ClawbackTrigger, EquityClass,
    SplitMap, WaterfallConfig, WaterfallMode, WaterfallOutput, WaterfallTier,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn class(id: &str, contribution: Decimal) -> EquityClass {
    EquityClass {
        id: id.into(),
        name: id.to_uppercase(),
        contribution_pct: contribution,
        distribution_pct: None,
    }
}

fn splits(pairs: &[(&str, Decimal)]) -> SplitMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn roc() -> WaterfallTier {
    WaterfallTier::ReturnOfCapital {
        id: "roc".into(),
        distribution_splits: SplitMap::new(),
    }
}

fn compound_pref(rate: Decimal, split: SplitMap) -> WaterfallTier {
    WaterfallTier::PreferredReturn {
        id: "pref".into(),
        distribution_splits: split,
        hurdle_irr: None,
        compound_pref: true,
        pref_rate: Some(rate),
    }
}

fn promote(
    split: SplitMap,
    catch_up: Option<SplitMap>,
    clawback: Option<ClawbackTrigger>,
) -> WaterfallTier {
    WaterfallTier::Promote {
        id: "promote".into(),
        distribution_splits: split,
        enable_catch_up: catch_up.is_some(),
        catch_up_target_split: catch_up,
        enable_clawback: clawback.is_some(),
        clawback_method: ClawbackMethod::HypotheticalLiquidation,
        clawback_trigger: clawback.unwrap_or_default(),
    }
}

/// Three partners, every tier kind, catch-up and annual clawback.
fn full_config() -> WaterfallConfig {
    let target = splits(&[("lp1", dec!(0.5)), ("lp2", dec!(0.3)), ("gp", dec!(0.2))]);
    WaterfallConfig {
        equity_classes: vec![
            class("lp1", dec!(0.6)),
            class("lp2", dec!(0.35)),
            class("gp", dec!(0.05)),
        ],
        tiers: Some(vec![
            roc(),
            compound_pref(
                dec!(0.08),
                splits(&[("lp1", dec!(0.6)), ("lp2", dec!(0.35)), ("gp", dec!(0.05))]),
            ),
            promote(target.clone(), Some(target), Some(ClawbackTrigger::Annual)),
        ]),
    }
}

fn full_flows() -> Vec<Decimal> {
    vec![
        dec!(-1000000),
        dec!(-250000),
        dec!(100000),
        dec!(180000),
        dec!(0),
        dec!(400000),
        dec!(1500000),
    ]
}

fn assert_conserves(out: &WaterfallOutput) {
    for (t, flow) in out.owner_cash_flows.iter().enumerate() {
        let total: Decimal = out.partners.iter().map(|p| p.cash_flows[t]).sum();
        assert!(
            (total - flow).abs() < dec!(0.000000001),
            "period {t}: partners {total} vs owner {flow}"
        );
    }
}

// ===========================================================================
// Conservation of cash
// ===========================================================================

#[test]
fn test_conservation_multi_tier_with_clawback() {
    let out = apply_equity_waterfall(&full_flows(), &full_config()).unwrap();
    assert_eq!(out.result.mode, WaterfallMode::MultiTier);
    assert_eq!(out.result.partners.len(), 3);
    assert_eq!(out.result.annual_rows.len(), 7);
    assert_conserves(&out.result);
    for row in &out.result.annual_rows {
        assert!(row.conservation_gap.abs() < dec!(0.000000001));
    }
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);
}

#[test]
fn test_conservation_single_tier_awkward_shares() {
    let config = WaterfallConfig {
        equity_classes: vec![class("a", dec!(1)), class("b", dec!(1)), class("c", dec!(1))],
        tiers: None,
    };
    let flows = [dec!(-1000), dec!(333.33), dec!(0.01), dec!(1000000.07)];
    let out = apply_equity_waterfall(&flows, &config).unwrap();
    assert_conserves(&out.result);
}

// ===========================================================================
// Normalization
// ===========================================================================

#[test]
fn test_normalization_idempotent_and_zero_fallback() {
    let once = normalize_percentages(&[dec!(3), dec!(1)]);
    assert_eq!(normalize_percentages(&once), once);
    assert_eq!(once, vec![dec!(0.75), dec!(0.25)]);

    let uniform = normalize_percentages(&[dec!(0), dec!(0)]);
    assert_eq!(uniform, vec![dec!(0.5), dec!(0.5)]);
}

// ===========================================================================
// Single tier
// ===========================================================================

#[test]
fn test_single_tier_ninety_ten() {
    let config = WaterfallConfig {
        equity_classes: vec![class("lp", dec!(0.9)), class("gp", dec!(0.1))],
        tiers: None,
    };
    let flows = [dec!(-1000), dec!(500), dec!(600), dec!(700)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    assert_eq!(out.mode, WaterfallMode::SingleTier);
    let lp = out.partner("lp").unwrap();
    let gp = out.partner("gp").unwrap();
    assert_eq!(lp.cash_flows, vec![dec!(-900), dec!(450), dec!(540), dec!(630)]);
    assert_eq!(gp.cash_flows, vec![dec!(-100), dec!(50), dec!(60), dec!(70)]);
    assert_eq!(lp.moic, Some(dec!(1.8)));
    assert_eq!(out.annual_rows[2].partner_distributions["gp"], dec!(60));
}

// ===========================================================================
// Return of capital
// ===========================================================================

#[test]
fn test_return_of_capital_bounded_by_unreturned() {
    let config = WaterfallConfig {
        equity_classes: vec![class("lp", dec!(0.7)), class("gp", dec!(0.3))],
        tiers: Some(vec![
            roc(),
            promote(splits(&[("lp", dec!(0.5)), ("gp", dec!(0.5))]), None, None),
        ]),
    };
    let flows = [dec!(-500), dec!(200), dec!(-300), dec!(900), dec!(50)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    let ids = ["lp", "gp"];
    let mut unreturned = [Decimal::ZERO; 2];
    for row in &out.annual_rows {
        if row.owner_cash_flow < Decimal::ZERO {
            for (k, id) in ids.iter().enumerate() {
                unreturned[k] -= row.partner_distributions[*id];
            }
            continue;
        }
        for allocation in row.tier_allocations.iter().filter(|a| a.tier_id == "roc") {
            for (k, id) in ids.iter().enumerate() {
                let paid = allocation.by_partner[*id];
                assert!(paid <= unreturned[k], "period {}: {id} paid {paid}", row.year_index);
                unreturned[k] -= paid;
            }
        }
    }
    assert_eq!(unreturned, [Decimal::ZERO; 2]);
    assert_conserves(&out);
}

// ===========================================================================
// Compound preferred return
// ===========================================================================

#[test]
fn test_compound_pref_balance_after_three_periods() {
    let config = WaterfallConfig {
        equity_classes: vec![class("lp", dec!(1))],
        tiers: Some(vec![
            compound_pref(dec!(0.08), splits(&[("lp", dec!(1))])),
            promote(splits(&[("lp", dec!(1))]), None, None),
        ]),
    };
    let flows = [dec!(-1000000), dec!(0), dec!(0), dec!(5000000)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    let pref = out.annual_rows[3]
        .tier_allocations
        .iter()
        .find(|a| a.tier_id == "pref")
        .unwrap();
    assert_eq!(pref.amount, dec!(1259712));
}

// ===========================================================================
// Catch-up
// ===========================================================================

/// Return of capital followed by a promote tier whose split and catch-up
/// target are the same weights.
fn roc_then_catch_up(classes: Vec<EquityClass>, target: SplitMap) -> WaterfallConfig {
    WaterfallConfig {
        equity_classes: classes,
        tiers: Some(vec![roc(), promote(target.clone(), Some(target), None)]),
    }
}

fn promote_paid(out: &WaterfallOutput, t: usize, partner_id: &str) -> Decimal {
    out.annual_rows[t]
        .tier_allocations
        .iter()
        .find(|a| a.tier_id == "promote")
        .map_or(Decimal::ZERO, |a| a.by_partner[partner_id])
}

#[test]
fn test_catch_up_with_gp_first_in_class_order() {
    let config = roc_then_catch_up(
        vec![class("gp", dec!(0.1)), class("lp", dec!(0.9))],
        splits(&[("gp", dec!(0.2)), ("lp", dec!(0.8))]),
    );
    let flows = [dec!(-1000), dec!(1500)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    // After capital comes back (100 / 900) the promote pool is 500. GP cap
    // 0.2 x 1500 - 100 = 200, LP cap 0.8 x 1500 - 900 = 300. GP takes its
    // 20% target share (100), LP 80% capped at 300, and the last 100 splits
    // 20/80.
    assert_eq!(promote_paid(&out, 1, "gp"), dec!(120));
    assert_eq!(promote_paid(&out, 1, "lp"), dec!(380));
    assert_eq!(out.partner("gp").unwrap().cash_flows, vec![dec!(-100), dec!(220)]);
    assert_eq!(out.partner("lp").unwrap().cash_flows, vec![dec!(-900), dec!(1280)]);
    assert_conserves(&out);
}

#[test]
fn test_catch_up_skips_partner_already_above_target() {
    let config = WaterfallConfig {
        equity_classes: vec![class("lp", dec!(0.9)), class("gp", dec!(0.1))],
        tiers: Some(vec![
            roc(),
            promote(
                splits(&[("lp", dec!(0.8)), ("gp", dec!(0.2))]),
                Some(splits(&[("lp", dec!(0.95)), ("gp", dec!(0.05))])),
                None,
            ),
        ]),
    };
    let flows = [dec!(-1000), dec!(1200)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    // GP holds 100 of 1000 returned, above its 5% target of 1200: zero cap.
    // LP catches up 95% of the 200 pool (190); the 10 the GP cannot take
    // falls through to the 80/20 split.
    assert_eq!(promote_paid(&out, 1, "lp"), dec!(198));
    assert_eq!(promote_paid(&out, 1, "gp"), dec!(2));
    assert_eq!(out.partner("lp").unwrap().cash_flows[1], dec!(1098));
    assert_eq!(out.partner("gp").unwrap().cash_flows[1], dec!(102));
    assert_conserves(&out);
}

#[test]
fn test_three_partner_catch_up_amounts() {
    let config = roc_then_catch_up(
        vec![
            class("lp1", dec!(0.3)),
            class("lp2", dec!(0.3)),
            class("gp", dec!(0.4)),
        ],
        splits(&[("lp1", dec!(0.4)), ("lp2", dec!(0.3)), ("gp", dec!(0.3))]),
    );
    let flows = [dec!(-1000), dec!(1500)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    // Pool 500 over a final total of 1500. Caps: lp1 300, lp2 150, gp 50.
    // Catch-up pays 200 / 150 / 50; the remaining 100 splits 40/30/30.
    assert_eq!(promote_paid(&out, 1, "lp1"), dec!(240));
    assert_eq!(promote_paid(&out, 1, "lp2"), dec!(180));
    assert_eq!(promote_paid(&out, 1, "gp"), dec!(80));
    assert_conserves(&out);
}

// ===========================================================================
// Clawback
// ===========================================================================

#[test]
fn test_clawback_recovers_promote_when_performance_falls_short() {
    let config = WaterfallConfig {
        equity_classes: vec![class("lp", dec!(0.99)), class("gp", dec!(0.01))],
        tiers: Some(vec![
            compound_pref(dec!(0.2), splits(&[("lp", dec!(1))])),
            promote(
                splits(&[("lp", dec!(0.5)), ("gp", dec!(0.5))]),
                None,
                Some(ClawbackTrigger::FinalPeriod),
            ),
        ]),
    };
    let flows = [dec!(-100000), dec!(150000), dec!(-40000), dec!(0)];
    let out = apply_equity_waterfall(&flows, &config).unwrap().result;

    assert_eq!(out.clawbacks.len(), 1);
    assert_eq!(out.clawbacks[0].amount, dec!(16200));
    let gp = out.partner("gp").unwrap();
    let gp_net: Decimal = gp.cash_flows.iter().sum();
    // Only the GP's own 1,400 of capital calls remain; all promote is back
    assert_eq!(gp_net, dec!(-1400));
    assert_eq!(gp.total_distributed, dec!(16200));
    assert_eq!(gp.cash_flows[3], dec!(-16200));
    assert_conserves(&out);
}

// ===========================================================================
// IRR / MOIC
// ===========================================================================

#[test]
fn test_partner_irr_round_trips_through_npv() {
    let out = apply_equity_waterfall(&full_flows(), &full_config()).unwrap().result;
    for partner in &out.partners {
        if let Some(rate) = partner.irr {
            assert_eq!(irr(&partner.cash_flows), Some(rate));
            let residual = npv(rate, &partner.cash_flows).unwrap();
            assert!(residual.abs() < dec!(0.001), "{}: npv {residual}", partner.partner_id);
        }
        assert!(partner.moic.is_some());
    }
}

// ===========================================================================
// Degenerate input and configuration
// ===========================================================================

#[test]
fn test_single_period_returns_no_partners() {
    let out = apply_equity_waterfall(&[dec!(-500)], &full_config()).unwrap();
    assert!(out.result.partners.is_empty());
    assert!(out.result.annual_rows.is_empty());
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_config_from_json_runs() {
    let config = WaterfallConfig::from_json(
        r#"{
            "equity_classes": [
                {"id": "lp", "name": "Investor", "contribution_pct": "0.9"},
                {"id": "gp", "name": "Sponsor", "contribution_pct": "0.1"}
            ],
            "tiers": [
                {"type": "return_of_capital", "id": "roc"},
                {"type": "preferred_return", "id": "pref", "hurdle_irr": "0.08",
                 "distribution_splits": {"lp": "0.9", "gp": "0.1"}},
                {"type": "promote", "id": "promote",
                 "distribution_splits": {"lp": "0.7", "gp": "0.3"}}
            ]
        }"#,
    )
    .unwrap();
    let out = apply_equity_waterfall(&[dec!(-1000), dec!(500), dec!(800), dec!(900)], &config)
        .unwrap();
    assert_eq!(out.methodology, "Equity Waterfall (multi-tier)");
    assert_conserves(&out.result);
}
