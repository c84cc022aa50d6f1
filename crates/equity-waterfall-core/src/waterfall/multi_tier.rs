use rust_decimal::Decimal;

use super::allocation::allocate_with_remainder;
use super::ledger::CapitalLedger;
use super::plan::{TierRule, WaterfallPlan};
use super::preferred::{pay_compound_pref, pay_hurdle_pref};
use super::promote::pay_promote;
use crate::types::Money;

/// Cash entering the waterfall in one period: a capital call (<= 0) settled
/// before a distribution (>= 0). Owner cash flows map to one or the other;
/// a hypothetical liquidation can carry both in its final period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PeriodCash {
    pub call: Money,
    pub distribution: Money,
}

impl PeriodCash {
    pub fn from_owner_flows(owner_cash_flows: &[Money]) -> Vec<Self> {
        owner_cash_flows
            .iter()
            .map(|flow| {
                if *flow < Decimal::ZERO {
                    Self {
                        call: *flow,
                        distribution: Decimal::ZERO,
                    }
                } else {
                    Self {
                        call: Decimal::ZERO,
                        distribution: *flow,
                    }
                }
            })
            .collect()
    }
}

/// What one tier paid in one period.
#[derive(Debug, Clone)]
pub(crate) struct TierPayment {
    pub tier: usize,
    pub by_partner: Vec<Money>,
}

/// Raw output of one orchestration pass.
#[derive(Debug, Clone)]
pub(crate) struct TierRun {
    /// Partner-major cash flows
    pub partner_flows: Vec<Vec<Money>>,
    /// Per period, the tiers that paid anything, in tier order
    pub tier_payments: Vec<Vec<TierPayment>>,
    /// Numerical diagnostics raised during the pass
    pub diagnostics: Vec<String>,
}

/// Run the tier chain over every period. Never applies clawback; the
/// corrector calls this again on hypothetical input.
pub(crate) fn run_tiers(plan: &WaterfallPlan, periods: &[PeriodCash]) -> TierRun {
    let n = plan.num_partners();
    let mut ledger = CapitalLedger::new(n);
    let mut partner_flows = vec![vec![Decimal::ZERO; periods.len()]; n];
    let mut tier_payments = Vec::with_capacity(periods.len());
    let mut diagnostics = Vec::new();

    for (t, cash) in periods.iter().enumerate() {
        if t > 0 {
            accrue_pref_accounts(plan, &mut ledger, t, &mut diagnostics);
        }

        if cash.call < Decimal::ZERO {
            let allocations = allocate_with_remainder(cash.call, &plan.contribution);
            ledger.record_capital_call(&allocations);
            for (flows, amount) in partner_flows.iter_mut().zip(&allocations) {
                flows[t] += amount;
            }
        }

        let mut payments = Vec::new();
        if cash.distribution > Decimal::ZERO {
            let period_paid =
                distribute(plan, &mut ledger, &partner_flows, t, cash.distribution, &mut payments);
            for (flows, amount) in partner_flows.iter_mut().zip(&period_paid) {
                flows[t] += amount;
            }
            ledger.record_distributions(&period_paid);
        }
        tier_payments.push(payments);

        if t == 0 {
            open_pref_accounts(plan, &mut ledger);
        }
    }

    TierRun {
        partner_flows,
        tier_payments,
        diagnostics,
    }
}

fn accrue_pref_accounts(
    plan: &WaterfallPlan,
    ledger: &mut CapitalLedger,
    t: usize,
    diagnostics: &mut Vec<String>,
) {
    for (index, tier) in plan.tiers.iter().enumerate() {
        if let TierRule::CompoundPreferred { pref_rate, .. } = &tier.rule {
            if ledger.accrue_pref(index, *pref_rate) {
                diagnostics.push(format!(
                    "Period {t}: preference account on tier '{}' overflowed and is held at the maximum",
                    tier.id
                ));
            }
        }
    }
}

fn open_pref_accounts(plan: &WaterfallPlan, ledger: &mut CapitalLedger) {
    for (index, tier) in plan.tiers.iter().enumerate() {
        if matches!(tier.rule, TierRule::CompoundPreferred { .. }) {
            ledger.open_pref_account(index);
        }
    }
}

/// Push one period's distributable cash through the tiers in order until it
/// is exhausted. Returns each partner's total for the period.
fn distribute(
    plan: &WaterfallPlan,
    ledger: &mut CapitalLedger,
    partner_flows: &[Vec<Money>],
    t: usize,
    flow: Money,
    payments: &mut Vec<TierPayment>,
) -> Vec<Money> {
    let n = plan.num_partners();
    let mut remaining = flow;
    let mut period_paid = vec![Decimal::ZERO; n];

    for (index, tier) in plan.tiers.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }

        let paid = match &tier.rule {
            TierRule::ReturnOfCapital => pay_return_of_capital(&mut remaining, ledger),
            TierRule::CompoundPreferred { splits, .. } => match ledger.pref_account_mut(index) {
                Some(balances) => pay_compound_pref(&mut remaining, balances, splits),
                // Distributions in period 0 precede the account
                None => vec![Decimal::ZERO; n],
            },
            TierRule::HurdlePreferred { splits, hurdle_irr } => {
                let history = partner_flows.first().map_or(&[][..], |flows| &flows[..t]);
                pay_hurdle_pref(&mut remaining, splits, *hurdle_irr, history)
            }
            TierRule::Promote {
                splits, catch_up, ..
            } => {
                let cumulative: Vec<Money> = ledger
                    .cumulative_distributions
                    .iter()
                    .zip(&period_paid)
                    .map(|(prior, so_far)| prior + so_far)
                    .collect();
                pay_promote(&mut remaining, &cumulative, splits, catch_up.as_ref())
            }
        };

        if paid.iter().any(|p| !p.is_zero()) {
            for (total, amount) in period_paid.iter_mut().zip(&paid) {
                *total += amount;
            }
            payments.push(TierPayment {
                tier: index,
                by_partner: paid,
            });
        }
    }

    // Cash no tier claimed stays with the partners by contribution share so
    // the period still conserves.
    if remaining > Decimal::ZERO {
        for (total, amount) in period_paid
            .iter_mut()
            .zip(allocate_with_remainder(remaining, &plan.contribution))
        {
            *total += amount;
        }
    }

    period_paid
}

/// Pay down unreturned capital pro-rata to each partner's balance, never
/// more than a partner is owed.
fn pay_return_of_capital(remaining: &mut Money, ledger: &mut CapitalLedger) -> Vec<Money> {
    let balances = ledger.unreturned_capital.clone();
    let mut paid = vec![Decimal::ZERO; balances.len()];
    let total = ledger.total_unreturned();
    if total <= Decimal::ZERO || *remaining <= Decimal::ZERO {
        return paid;
    }

    let available = (*remaining).min(total);
    let Some(last) = balances.iter().rposition(|b| *b > Decimal::ZERO) else {
        return paid;
    };

    let mut allocated = Decimal::ZERO;
    for (i, balance) in balances.iter().enumerate().take(last) {
        if *balance <= Decimal::ZERO {
            continue;
        }
        let amount = (available * balance / total)
            .min(*balance)
            .min(available - allocated);
        paid[i] = amount;
        allocated += amount;
    }
    paid[last] = (available - allocated).min(balances[last]).max(Decimal::ZERO);
    allocated += paid[last];

    for (i, amount) in paid.iter().enumerate() {
        if !amount.is_zero() {
            ledger.return_capital(i, *amount);
        }
    }
    *remaining -= allocated;
    paid
}
