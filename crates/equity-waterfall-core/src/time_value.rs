use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::WaterfallError;
use crate::types::{Money, Multiple, Rate};
use crate::WaterfallResult;

/// Default absolute NPV tolerance for the IRR search.
pub const IRR_TOLERANCE: Decimal = dec!(0.0000001);
pub const MAX_IRR_ITERATIONS: u32 = 200;

const IRR_LOWER_BOUND: Rate = dec!(-0.99);
const IRR_UPPER_BOUND: Rate = dec!(10.0);
// Bracket width below which further halving no longer moves the midpoint.
const BRACKET_FLOOR: Decimal = dec!(0.000000000000000000001);

/// Net Present Value of a series of cash flows (period 0 undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> WaterfallResult<Money> {
    if rate <= dec!(-1) {
        return Err(WaterfallError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| WaterfallError::NumericOverflow {
                    context: format!("NPV discount factor at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(WaterfallError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV evaluated by Horner's rule on `1 / (1 + rate)`, saturating at the
/// Decimal range instead of failing. Only the sign is trusted once saturated,
/// which is all the bisection needs at the extremes of its bracket.
fn npv_saturating(rate: Rate, cash_flows: &[Money]) -> Money {
    let v = Decimal::ONE / (Decimal::ONE + rate);
    let mut acc = Decimal::ZERO;
    for cf in cash_flows.iter().rev() {
        acc = match acc.checked_mul(v).and_then(|x| x.checked_add(*cf)) {
            Some(next) => next,
            None if acc < Decimal::ZERO || (acc.is_zero() && *cf < Decimal::ZERO) => {
                return Decimal::MIN
            }
            None => return Decimal::MAX,
        };
    }
    acc
}

/// Internal Rate of Return with the default tolerance and iteration cap.
pub fn irr(cash_flows: &[Money]) -> Option<Rate> {
    irr_with_tolerance(cash_flows, IRR_TOLERANCE, MAX_IRR_ITERATIONS)
}

/// Internal Rate of Return by bisection over [-99%, 1000%].
///
/// Returns `None` when the series has no positive or no negative flow, or
/// when NPV does not change sign between the bracket ends. If the iteration
/// cap is reached the midpoint of the final bracket is returned.
pub fn irr_with_tolerance(
    cash_flows: &[Money],
    tolerance: Decimal,
    max_iterations: u32,
) -> Option<Rate> {
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_positive || !has_negative {
        return None;
    }

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut npv_lo = npv_saturating(lo, cash_flows);
    let npv_hi = npv_saturating(hi, cash_flows);

    if npv_lo.is_zero() {
        return Some(lo);
    }
    if npv_hi.is_zero() {
        return Some(hi);
    }
    if (npv_lo > Decimal::ZERO) == (npv_hi > Decimal::ZERO) {
        return None;
    }

    for _ in 0..max_iterations {
        let mid = (lo + hi) / dec!(2);
        let npv_mid = npv_saturating(mid, cash_flows);

        if npv_mid.abs() < tolerance {
            return Some(mid);
        }

        if (npv_mid > Decimal::ZERO) == (npv_lo > Decimal::ZERO) {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }

        if hi - lo < BRACKET_FLOOR {
            break;
        }
    }

    Some((lo + hi) / dec!(2))
}

/// Equity multiple (MOIC): sum of positive flows over the absolute sum of
/// negative flows.
///
/// `None` is the unbounded multiple (distributions with no capital in);
/// zero when there are neither contributions nor distributions.
pub fn equity_multiple(cash_flows: &[Money]) -> Option<Multiple> {
    let invested: Money = cash_flows
        .iter()
        .filter(|cf| **cf < Decimal::ZERO)
        .map(|cf| cf.abs())
        .sum();
    let returned: Money = cash_flows.iter().filter(|cf| **cf > Decimal::ZERO).sum();

    if invested.is_zero() {
        if returned.is_zero() {
            Some(Decimal::ZERO)
        } else {
            None
        }
    } else {
        Some(returned / invested)
    }
}
