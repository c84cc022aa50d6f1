use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Weight sums with an absolute value below this fall back to an equal split.
const ZERO_SUM_THRESHOLD: Decimal = dec!(0.0000000001);

/// Normalize raw weights so they sum to 1.
///
/// A (near) zero total yields a uniform `1/n` split instead of dividing by
/// zero. An empty slice returns an empty vector.
pub fn normalize_percentages(weights: &[Rate]) -> Vec<Rate> {
    if weights.is_empty() {
        return Vec::new();
    }

    let total: Decimal = weights.iter().sum();
    if total.abs() < ZERO_SUM_THRESHOLD {
        let uniform = Decimal::ONE / Decimal::from(weights.len() as u64);
        return vec![uniform; weights.len()];
    }

    weights.iter().map(|w| w / total).collect()
}

/// Split `amount` by `pcts`; the last partner takes the exact remainder so the
/// pieces always sum back to `amount`.
pub fn allocate_with_remainder(amount: Money, pcts: &[Rate]) -> Vec<Money> {
    let Some(last) = pcts.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut shares: Vec<Money> = pcts[..last].iter().map(|p| amount * p).collect();
    let allocated: Money = shares.iter().sum();
    shares.push(amount - allocated);
    shares
}
