//! Equity distribution waterfall.
//!
//! Capital calls are split by contribution share. Distributions either split
//! pro-rata (single-tier mode) or run through an ordered tier chain of
//! return of capital, preferred return and promote, with optional catch-up
//! and clawback (multi-tier mode). Every period's partner flows sum to the
//! owner flow: the last partner in class order takes the exact remainder.

mod allocation;
mod clawback;
mod config;
mod engine;
mod ledger;
mod multi_tier;
mod plan;
mod preferred;
mod promote;
mod result;
mod single_tier;

pub use allocation::{allocate_with_remainder, normalize_percentages};
pub use clawback::ClawbackAdjustment;
pub use config::{
    ClawbackMethod, ClawbackTrigger, EquityClass, SplitMap, WaterfallConfig, WaterfallTier,
};
pub use engine::{apply_equity_waterfall, evaluate_waterfall};
pub use ledger::CapitalLedger;
pub use result::{
    AnnualWaterfallRow, PartnerDistributionSeries, TierAllocation, WaterfallMode, WaterfallOutput,
};

/// Record a non-fatal diagnostic and mirror it to the log.
pub(crate) fn push_warning(warnings: &mut Vec<String>, message: String) {
    log::warn!("{message}");
    warnings.push(message);
}
