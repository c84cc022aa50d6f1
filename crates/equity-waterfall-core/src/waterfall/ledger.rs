use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::{Money, Rate};

/// Running per-partner capital accounts for a single waterfall evaluation.
///
/// Vectors are indexed by partner position (equity class order). Preference
/// accounts are kept per compound preferred-return tier, keyed by tier index.
#[derive(Debug, Clone)]
pub struct CapitalLedger {
    /// Contributed capital not yet returned (non-negative)
    pub unreturned_capital: Vec<Money>,
    /// Running total of positive allocations from prior periods
    pub cumulative_distributions: Vec<Money>,
    pref_accounts: BTreeMap<usize, Vec<Money>>,
}

impl CapitalLedger {
    pub fn new(num_partners: usize) -> Self {
        Self {
            unreturned_capital: vec![Decimal::ZERO; num_partners],
            cumulative_distributions: vec![Decimal::ZERO; num_partners],
            pref_accounts: BTreeMap::new(),
        }
    }

    /// Record a capital call; `allocations` are the (negative) partner shares.
    pub fn record_capital_call(&mut self, allocations: &[Money]) {
        for (balance, amount) in self.unreturned_capital.iter_mut().zip(allocations) {
            *balance += amount.abs();
        }
    }

    pub fn total_unreturned(&self) -> Money {
        self.unreturned_capital.iter().sum()
    }

    /// Reduce a partner's unreturned balance after a return-of-capital payment.
    pub fn return_capital(&mut self, partner: usize, amount: Money) {
        self.unreturned_capital[partner] -= amount;
    }

    /// Fold a period's distributions into the cumulative totals; only
    /// positive allocations count.
    pub fn record_distributions(&mut self, period: &[Money]) {
        for (total, amount) in self.cumulative_distributions.iter_mut().zip(period) {
            if *amount > Decimal::ZERO {
                *total += amount;
            }
        }
    }

    /// Open a preference account for `tier`, seeded from unreturned capital.
    pub fn open_pref_account(&mut self, tier: usize) {
        let seed = self.unreturned_capital.iter().map(|c| c.abs()).collect();
        self.pref_accounts.insert(tier, seed);
    }

    /// Compound every positive balance of the `tier` account by one period.
    ///
    /// A balance that would overflow `Decimal` is held at `Decimal::MAX`;
    /// returns `true` when that happened.
    pub fn accrue_pref(&mut self, tier: usize, rate: Rate) -> bool {
        let mut saturated = false;
        if let Some(balances) = self.pref_accounts.get_mut(&tier) {
            for balance in balances.iter_mut().filter(|b| **b > Decimal::ZERO) {
                *balance = balance.checked_mul(Decimal::ONE + rate).unwrap_or_else(|| {
                    saturated = true;
                    Decimal::MAX
                });
            }
        }
        saturated
    }

    pub fn pref_account(&self, tier: usize) -> Option<&[Money]> {
        self.pref_accounts.get(&tier).map(Vec::as_slice)
    }

    pub fn pref_account_mut(&mut self, tier: usize) -> Option<&mut Vec<Money>> {
        self.pref_accounts.get_mut(&tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_capital_call_and_return() {
        let mut ledger = CapitalLedger::new(2);
        ledger.record_capital_call(&[dec!(-900), dec!(-100)]);
        assert_eq!(ledger.unreturned_capital, vec![dec!(900), dec!(100)]);
        assert_eq!(ledger.total_unreturned(), dec!(1000));

        ledger.return_capital(0, dec!(400));
        assert_eq!(ledger.unreturned_capital[0], dec!(500));
        assert_eq!(ledger.total_unreturned(), dec!(600));
    }

    #[test]
    fn test_cumulative_ignores_negative_allocations() {
        let mut ledger = CapitalLedger::new(2);
        ledger.record_distributions(&[dec!(50), dec!(-10)]);
        ledger.record_distributions(&[dec!(25), dec!(5)]);
        assert_eq!(ledger.cumulative_distributions, vec![dec!(75), dec!(5)]);
    }

    #[test]
    fn test_pref_account_compounds() {
        let mut ledger = CapitalLedger::new(1);
        ledger.record_capital_call(&[dec!(-1000000)]);
        ledger.open_pref_account(1);
        for _ in 0..3 {
            ledger.accrue_pref(1, dec!(0.08));
        }
        // 1,000,000 x 1.08^3
        assert_eq!(ledger.pref_account(1).unwrap()[0], dec!(1259712));
        assert!(ledger.pref_account(0).is_none());
    }

    #[test]
    fn test_settled_pref_balance_does_not_compound() {
        let mut ledger = CapitalLedger::new(2);
        ledger.record_capital_call(&[dec!(-100), dec!(-100)]);
        ledger.open_pref_account(0);
        ledger.pref_account_mut(0).unwrap()[1] = Decimal::ZERO;
        ledger.accrue_pref(0, dec!(0.10));
        assert_eq!(ledger.pref_account(0).unwrap(), &[dec!(110), Decimal::ZERO][..]);
    }

    #[test]
    fn test_pref_accrual_saturates_instead_of_overflowing() {
        let mut ledger = CapitalLedger::new(2);
        ledger.record_capital_call(&[dec!(-1000000), dec!(-1)]);
        ledger.open_pref_account(0);
        let mut saturated = false;
        for _ in 0..20 {
            saturated |= ledger.accrue_pref(0, dec!(100));
        }
        assert!(saturated);
        assert_eq!(ledger.pref_account(0).unwrap()[0], Decimal::MAX);
        assert!(!ledger.accrue_pref(3, dec!(100)));
    }
}
