use rust_decimal::Decimal;

use super::allocation::allocate_with_remainder;
use super::plan::WaterfallPlan;
use crate::types::Money;

/// Pro-rata allocation: capital calls by contribution share, distributions
/// by distribution share. Returns partner-major cash flows.
pub(crate) fn allocate_single_tier(owner_cash_flows: &[Money], plan: &WaterfallPlan) -> Vec<Vec<Money>> {
    let mut partner_flows = vec![vec![Decimal::ZERO; owner_cash_flows.len()]; plan.num_partners()];

    for (t, flow) in owner_cash_flows.iter().enumerate() {
        let pcts = if *flow < Decimal::ZERO {
            &plan.contribution
        } else {
            &plan.distribution
        };
        for (partner, share) in allocate_with_remainder(*flow, pcts).into_iter().enumerate() {
            partner_flows[partner][t] = share;
        }
    }

    partner_flows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterfall::config::{EquityClass, WaterfallConfig};
    use rust_decimal_macros::dec;

    fn plan(classes: &[(&str, Decimal, Option<Decimal>)]) -> WaterfallPlan {
        let config = WaterfallConfig {
            equity_classes: classes
                .iter()
                .map(|(id, c, d)| EquityClass {
                    id: id.to_string(),
                    name: id.to_string(),
                    contribution_pct: *c,
                    distribution_pct: *d,
                })
                .collect(),
            tiers: None,
        };
        WaterfallPlan::single_tier(&config, &mut Vec::new()).unwrap()
    }

    #[test]
    fn test_ninety_ten_split() {
        let plan = plan(&[("lp", dec!(0.9), None), ("gp", dec!(0.1), None)]);
        let flows = [dec!(-1000), dec!(500), dec!(600), dec!(700)];
        let out = allocate_single_tier(&flows, &plan);

        for (t, flow) in flows.iter().enumerate() {
            assert_eq!(out[0][t], flow * dec!(0.9));
            assert_eq!(out[1][t], flow - flow * dec!(0.9));
            assert_eq!(out[0][t] + out[1][t], *flow);
        }
        assert_eq!(out[1][0], dec!(-100));
        assert_eq!(out[1][3], dec!(70));
    }

    #[test]
    fn test_calls_and_distributions_use_different_shares() {
        let plan = plan(&[("lp", dec!(0.95), Some(dec!(0.8))), ("gp", dec!(0.05), Some(dec!(0.2)))]);
        let out = allocate_single_tier(&[dec!(-200), dec!(0), dec!(300)], &plan);

        assert_eq!(out[0][0], dec!(-190));
        assert_eq!(out[1][0], dec!(-10));
        assert_eq!(out[0][1], Decimal::ZERO);
        assert_eq!(out[1][1], Decimal::ZERO);
        assert_eq!(out[0][2], dec!(240));
        assert_eq!(out[1][2], dec!(60));
    }

    #[test]
    fn test_three_way_conservation_with_repeating_shares() {
        let plan = plan(&[
            ("a", dec!(1), None),
            ("b", dec!(1), None),
            ("c", dec!(1), None),
        ]);
        let flows = [dec!(-1000), dec!(333.33), dec!(1000.01)];
        let out = allocate_single_tier(&flows, &plan);
        for (t, flow) in flows.iter().enumerate() {
            let total: Decimal = out.iter().map(|p| p[t]).sum();
            assert_eq!(total, *flow);
        }
    }
}
