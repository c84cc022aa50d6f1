//! Clawback by hypothetical liquidation.
//!
//! At each evaluation period `e` the vehicle is liquidated on paper: capital
//! calls through `e` keep their periods and every distribution through `e` is
//! deferred to `e`, so preferred returns accrue on capital that has not yet
//! been repaid. The tier chain runs once on that series (with no clawback of
//! its own), and whatever the GP netted above the hypothetical through `e` is
//! moved to the other partners within period `e`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::allocation::{allocate_with_remainder, normalize_percentages};
use super::config::{ClawbackMethod, ClawbackTrigger};
use super::multi_tier::{run_tiers, PeriodCash};
use super::plan::{TierRule, WaterfallPlan};
use super::push_warning;
use crate::types::{Money, PartnerId};

/// Adjustments must net to zero within this many currency units.
const ADJUSTMENT_TOLERANCE: Decimal = dec!(0.01);

/// A transfer from the GP to the other partners applied in one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClawbackAdjustment {
    pub tier_id: String,
    pub period: usize,
    pub gp_id: PartnerId,
    /// Amount taken from the GP (positive)
    pub amount: Money,
    pub recipients: BTreeMap<PartnerId, Money>,
}

/// Apply every clawback configured on the plan's promote tiers to
/// `partner_flows` in place.
pub(crate) fn apply_clawbacks(
    plan: &WaterfallPlan,
    owner_cash_flows: &[Money],
    partner_flows: &mut [Vec<Money>],
    warnings: &mut Vec<String>,
) -> Vec<ClawbackAdjustment> {
    let mut adjustments = Vec::new();
    let Some(last_period) = owner_cash_flows.len().checked_sub(1) else {
        return adjustments;
    };

    for tier in &plan.tiers {
        let TierRule::Promote {
            clawback: Some((ClawbackMethod::HypotheticalLiquidation, trigger)),
            ..
        } = &tier.rule
        else {
            continue;
        };

        let periods = match trigger {
            ClawbackTrigger::FinalPeriod => last_period..=last_period,
            ClawbackTrigger::Annual => 1..=last_period,
        };
        for e in periods {
            if let Some(adjustment) =
                evaluate_at(plan, &tier.id, owner_cash_flows, partner_flows, e, warnings)
            {
                adjustments.push(adjustment);
            }
        }
    }

    adjustments
}

/// Owner flows through `e` with calls in place and distributions moved to `e`.
pub(crate) fn hypothetical_liquidation(owner_cash_flows: &[Money], e: usize) -> Vec<PeriodCash> {
    let truncated = &owner_cash_flows[..=e];
    let deferred: Money = truncated.iter().filter(|f| **f > Decimal::ZERO).sum();

    let mut periods: Vec<PeriodCash> = truncated
        .iter()
        .map(|flow| PeriodCash {
            call: (*flow).min(Decimal::ZERO),
            distribution: Decimal::ZERO,
        })
        .collect();
    periods[e].distribution = deferred;
    periods
}

fn evaluate_at(
    plan: &WaterfallPlan,
    tier_id: &str,
    owner_cash_flows: &[Money],
    partner_flows: &mut [Vec<Money>],
    e: usize,
    warnings: &mut Vec<String>,
) -> Option<ClawbackAdjustment> {
    let gp = plan.gp_index();
    let hypothetical = run_tiers(plan, &hypothetical_liquidation(owner_cash_flows, e));

    let required: Money = hypothetical.partner_flows[gp].iter().sum();
    let actual: Money = partner_flows[gp][..=e].iter().sum();
    let excess = actual - required;
    if excess <= Decimal::ZERO {
        return None;
    }

    let others: Vec<usize> = (0..plan.num_partners()).filter(|i| *i != gp).collect();
    if others.is_empty() {
        push_warning(
            warnings,
            format!("Clawback on tier '{tier_id}' at period {e} has no recipient besides the GP; skipped"),
        );
        return None;
    }

    let shares = normalize_percentages(
        &others.iter().map(|i| plan.contribution[*i]).collect::<Vec<_>>(),
    );
    let transfers = allocate_with_remainder(excess, &shares);

    partner_flows[gp][e] -= excess;
    let mut recipients = BTreeMap::new();
    for (i, amount) in others.iter().zip(&transfers) {
        partner_flows[*i][e] += amount;
        recipients.insert(plan.partners[*i].id.clone(), *amount);
    }

    let net = transfers.iter().sum::<Money>() - excess;
    if net.abs() > ADJUSTMENT_TOLERANCE {
        push_warning(
            warnings,
            format!("Clawback adjustments on tier '{tier_id}' at period {e} do not net to zero ({net})"),
        );
    }

    log::debug!(
        "clawback tier={tier_id} period={e} gp={} actual={actual} required={required} amount={excess}",
        plan.partners[gp].id
    );

    Some(ClawbackAdjustment {
        tier_id: tier_id.to_string(),
        period: e,
        gp_id: plan.partners[gp].id.clone(),
        amount: excess,
        recipients,
    })
}
