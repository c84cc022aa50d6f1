//! Preferred-return tier strategies.
//!
//! Two mutually exclusive forms share a tier type:
//! - **Compound accrual**: each partner carries a preference balance that
//!   compounds every period and is paid down from distributable cash.
//! - **IRR hurdle**: the tier takes all remaining cash while the first
//!   partner's trailing IRR is below the hurdle, and nothing once it is met.
//!   The test is period-granular: the tier never pays just the fraction of a
//!   period's cash needed to land exactly on the hurdle.

use rust_decimal::Decimal;

use super::allocation::allocate_with_remainder;
use crate::time_value::irr;
use crate::types::{Money, Rate};

/// Pay down compounding preference balances from `remaining`.
///
/// All partners but the last take their split of the cash available to the
/// tier, capped at their balance; the last takes what is left, capped at its
/// own balance. Balances and `remaining` are reduced by what is paid.
pub(crate) fn pay_compound_pref(
    remaining: &mut Money,
    balances: &mut [Money],
    splits: &[Rate],
) -> Vec<Money> {
    let mut paid = vec![Decimal::ZERO; balances.len()];
    let Some(last) = balances.len().checked_sub(1) else {
        return paid;
    };
    let available = *remaining;
    if available <= Decimal::ZERO {
        return paid;
    }

    let mut allocated = Decimal::ZERO;
    for i in 0..last {
        let owed = balances[i].max(Decimal::ZERO);
        let amount = (available * splits[i])
            .min(owed)
            .min(available - allocated)
            .max(Decimal::ZERO);
        paid[i] = amount;
        allocated += amount;
    }
    paid[last] = (available - allocated)
        .min(balances[last].max(Decimal::ZERO))
        .max(Decimal::ZERO);
    allocated += paid[last];

    for (balance, amount) in balances.iter_mut().zip(&paid) {
        *balance -= amount;
    }
    *remaining -= allocated;
    paid
}

/// IRR-hurdle gate. `hurdle_history` is the hurdle partner's cash flows for
/// the periods before the current one.
pub(crate) fn pay_hurdle_pref(
    remaining: &mut Money,
    splits: &[Rate],
    hurdle_irr: Rate,
    hurdle_history: &[Money],
) -> Vec<Money> {
    let hurdle_met = matches!(irr(hurdle_history), Some(r) if r >= hurdle_irr);
    if hurdle_met || *remaining <= Decimal::ZERO {
        return vec![Decimal::ZERO; splits.len()];
    }

    let paid = allocate_with_remainder(*remaining, splits);
    *remaining = Decimal::ZERO;
    paid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compound_pay_down_partial() {
        let mut remaining = dec!(50000);
        let mut balances = vec![dec!(108000), dec!(12000)];
        let paid = pay_compound_pref(&mut remaining, &mut balances, &[dec!(0.9), dec!(0.1)]);

        assert_eq!(paid, vec![dec!(45000), dec!(5000)]);
        assert_eq!(balances, vec![dec!(63000), dec!(7000)]);
        assert_eq!(remaining, Decimal::ZERO);
    }

    #[test]
    fn test_compound_pay_down_caps_at_balance() {
        let mut remaining = dec!(200000);
        let mut balances = vec![dec!(108000), dec!(12000)];
        let paid = pay_compound_pref(&mut remaining, &mut balances, &[dec!(0.9), dec!(0.1)]);

        assert_eq!(paid, vec![dec!(108000), dec!(12000)]);
        assert_eq!(balances, vec![Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(remaining, dec!(80000));
    }

    #[test]
    fn test_compound_last_partner_takes_residual_up_to_balance() {
        let mut remaining = dec!(150000);
        let mut balances = vec![dec!(118800), dec!(1200)];
        let paid = pay_compound_pref(&mut remaining, &mut balances, &[dec!(1), dec!(0)]);

        assert_eq!(paid, vec![dec!(118800), dec!(1200)]);
        assert_eq!(remaining, dec!(30000));
    }

    #[test]
    fn test_compound_settled_accounts_pay_nothing() {
        let mut remaining = dec!(100);
        let mut balances = vec![Decimal::ZERO, Decimal::ZERO];
        let paid = pay_compound_pref(&mut remaining, &mut balances, &[dec!(0.5), dec!(0.5)]);
        assert_eq!(paid, vec![Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(remaining, dec!(100));
    }

    #[test]
    fn test_hurdle_not_met_takes_everything() {
        let mut remaining = dec!(1000);
        // Only the contribution observed so far: IRR undefined
        let paid = pay_hurdle_pref(&mut remaining, &[dec!(0.8), dec!(0.2)], dec!(0.08), &[dec!(-900)]);
        assert_eq!(paid, vec![dec!(800), dec!(200)]);
        assert_eq!(remaining, Decimal::ZERO);
    }

    #[test]
    fn test_hurdle_met_passes_cash_through() {
        let mut remaining = dec!(1000);
        // -100 then +120: trailing IRR 20% >= 8%
        let paid = pay_hurdle_pref(
            &mut remaining,
            &[dec!(0.8), dec!(0.2)],
            dec!(0.08),
            &[dec!(-100), dec!(120)],
        );
        assert_eq!(paid, vec![Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(remaining, dec!(1000));
    }

    #[test]
    fn test_hurdle_below_target_allocates() {
        let mut remaining = dec!(500);
        // -100 then +105: trailing IRR 5% < 8%
        let paid = pay_hurdle_pref(
            &mut remaining,
            &[dec!(1), dec!(0)],
            dec!(0.08),
            &[dec!(-100), dec!(105)],
        );
        assert_eq!(paid, vec![dec!(500), Decimal::ZERO]);
        assert_eq!(remaining, Decimal::ZERO);
    }
}
