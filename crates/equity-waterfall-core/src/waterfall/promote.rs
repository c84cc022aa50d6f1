use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::allocation::allocate_with_remainder;
use super::plan::CatchUpTerms;
use crate::types::{Money, Rate};

/// Ratio deviation above which a catch-up is still owed.
const CATCH_UP_TOLERANCE: Decimal = dec!(0.000000001);

/// Promote tier: optional catch-up toward a target cumulative split, then
/// the residual by `splits`. Always consumes all of `remaining`.
///
/// `cumulative` holds each partner's prior-period distributions plus what
/// earlier tiers have already paid this period.
pub(crate) fn pay_promote(
    remaining: &mut Money,
    cumulative: &[Money],
    splits: &[Rate],
    catch_up: Option<&CatchUpTerms>,
) -> Vec<Money> {
    let mut paid = vec![Decimal::ZERO; splits.len()];
    if *remaining <= Decimal::ZERO {
        return paid;
    }

    if let Some(terms) = catch_up {
        if catch_up_needed(cumulative, &terms.target) {
            let caught_up = pay_catch_up(*remaining, cumulative, terms);
            for (total, amount) in paid.iter_mut().zip(&caught_up) {
                *total += amount;
            }
            *remaining -= caught_up.iter().sum::<Money>();
        }
    }

    if *remaining > Decimal::ZERO {
        for (total, amount) in paid.iter_mut().zip(allocate_with_remainder(*remaining, splits)) {
            *total += amount;
        }
        *remaining = Decimal::ZERO;
    }

    paid
}

fn catch_up_needed(cumulative: &[Money], target: &[Rate]) -> bool {
    let total: Money = cumulative.iter().sum();
    cumulative.iter().zip(target).any(|(current, target_pct)| {
        let ratio = if total.is_zero() {
            Decimal::ZERO
        } else {
            current / total
        };
        (ratio - target_pct).abs() > CATCH_UP_TOLERANCE
    })
}

/// Catch-up sub-phase. Each partner takes its target share of the pool in
/// class order, hard-capped at the amount that brings it to its target share
/// of the post-allocation total; the last partner takes the residual under
/// the same cap. Whatever the caps leave unpaid falls through to the
/// promote split.
fn pay_catch_up(pool: Money, cumulative: &[Money], terms: &CatchUpTerms) -> Vec<Money> {
    let n = cumulative.len();
    let mut paid = vec![Decimal::ZERO; n];
    let Some(last) = n.checked_sub(1) else {
        return paid;
    };

    let final_total = cumulative.iter().sum::<Money>() + pool;
    let caps: Vec<Money> = cumulative
        .iter()
        .zip(&terms.target)
        .map(|(current, target_pct)| (final_total * target_pct - current).max(Decimal::ZERO))
        .collect();

    let mut allocated = Decimal::ZERO;
    for i in 0..last {
        let amount = (pool * terms.target[i])
            .min(caps[i])
            .min(pool - allocated)
            .max(Decimal::ZERO);
        paid[i] = amount;
        allocated += amount;
    }
    paid[last] = (pool - allocated).min(caps[last]).max(Decimal::ZERO);
    paid
}
