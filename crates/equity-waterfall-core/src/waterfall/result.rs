use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::clawback::ClawbackAdjustment;
use super::multi_tier::TierPayment;
use super::plan::WaterfallPlan;
use super::push_warning;
use crate::time_value::{equity_multiple, irr};
use crate::types::{Money, Multiple, PartnerId, Rate};

/// Per-period conservation gaps above this many currency units are reported.
const CONSERVATION_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterfallMode {
    SingleTier,
    MultiTier,
}

/// Result of one waterfall evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallOutput {
    pub owner_cash_flows: Vec<Money>,
    pub mode: WaterfallMode,
    /// One series per equity class, in class order
    pub partners: Vec<PartnerDistributionSeries>,
    pub annual_rows: Vec<AnnualWaterfallRow>,
    /// Clawback transfers already folded into the partner series
    pub clawbacks: Vec<ClawbackAdjustment>,
}

impl WaterfallOutput {
    pub fn partner(&self, partner_id: &str) -> Option<&PartnerDistributionSeries> {
        self.partners.iter().find(|p| p.partner_id == partner_id)
    }
}

/// A partner's cash flows with summary returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerDistributionSeries {
    pub partner_id: PartnerId,
    pub name: String,
    pub cash_flows: Vec<Money>,
    pub cumulative_cash_flows: Vec<Money>,
    /// `None` when the series has no defined IRR
    pub irr: Option<Rate>,
    /// `None` when the multiple is unbounded (distributions, no contributions)
    pub moic: Option<Multiple>,
    /// Sum of capital calls, as a positive amount
    pub total_contributed: Money,
    pub total_distributed: Money,
}

/// What one tier paid out in one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAllocation {
    pub tier_id: String,
    pub amount: Money,
    pub by_partner: BTreeMap<PartnerId, Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualWaterfallRow {
    pub year_index: usize,
    pub owner_cash_flow: Money,
    pub partner_distributions: BTreeMap<PartnerId, Money>,
    /// Tier breakdown of the period's distribution (multi-tier mode only)
    pub tier_allocations: Vec<TierAllocation>,
    /// Sum of partner flows minus the owner flow
    pub conservation_gap: Money,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub(crate) struct ResultParts<'a> {
    pub plan: &'a WaterfallPlan,
    pub mode: WaterfallMode,
    pub owner_cash_flows: &'a [Money],
    pub partner_flows: Vec<Vec<Money>>,
    pub tier_payments: Vec<Vec<TierPayment>>,
    pub clawbacks: Vec<ClawbackAdjustment>,
}

/// Assemble partner series and period rows. Conservation is checked per
/// period; a gap is reported as a warning and the result still returned.
pub(crate) fn build_result(parts: ResultParts<'_>, warnings: &mut Vec<String>) -> WaterfallOutput {
    let ResultParts {
        plan,
        mode,
        owner_cash_flows,
        partner_flows,
        mut tier_payments,
        clawbacks,
    } = parts;

    let partners: Vec<PartnerDistributionSeries> = plan
        .partners
        .iter()
        .zip(partner_flows)
        .map(|(partner, cash_flows)| {
            let cumulative_cash_flows = cash_flows
                .iter()
                .scan(Decimal::ZERO, |running, cf| {
                    *running += cf;
                    Some(*running)
                })
                .collect();
            let total_contributed = -cash_flows
                .iter()
                .filter(|cf| **cf < Decimal::ZERO)
                .sum::<Money>();
            let total_distributed = cash_flows.iter().filter(|cf| **cf > Decimal::ZERO).sum();
            PartnerDistributionSeries {
                partner_id: partner.id.clone(),
                name: partner.name.clone(),
                irr: irr(&cash_flows),
                moic: equity_multiple(&cash_flows),
                cash_flows,
                cumulative_cash_flows,
                total_contributed,
                total_distributed,
            }
        })
        .collect();

    tier_payments.resize_with(owner_cash_flows.len(), Vec::new);
    let annual_rows = owner_cash_flows
        .iter()
        .zip(tier_payments)
        .enumerate()
        .map(|(t, (owner_cash_flow, payments))| {
            let partner_distributions: BTreeMap<PartnerId, Money> = partners
                .iter()
                .map(|p| (p.partner_id.clone(), p.cash_flows[t]))
                .collect();
            let conservation_gap = partner_distributions.values().sum::<Money>() - owner_cash_flow;
            if conservation_gap.abs() > CONSERVATION_TOLERANCE {
                push_warning(
                    warnings,
                    format!(
                        "Period {t}: partner flows miss owner flow {owner_cash_flow} by {conservation_gap}"
                    ),
                );
            }

            let tier_allocations = payments
                .into_iter()
                .map(|payment| TierAllocation {
                    tier_id: plan.tiers[payment.tier].id.clone(),
                    amount: payment.by_partner.iter().sum(),
                    by_partner: plan
                        .partners
                        .iter()
                        .map(|p| p.id.clone())
                        .zip(payment.by_partner)
                        .collect(),
                })
                .collect();

            AnnualWaterfallRow {
                year_index: t,
                owner_cash_flow: *owner_cash_flow,
                partner_distributions,
                tier_allocations,
                conservation_gap,
            }
        })
        .collect();

    WaterfallOutput {
        owner_cash_flows: owner_cash_flows.to_vec(),
        mode,
        partners,
        annual_rows,
        clawbacks,
    }
}
