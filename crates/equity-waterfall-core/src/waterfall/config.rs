use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{PartnerId, Rate};
use crate::WaterfallResult;

/// Raw per-partner weights keyed by equity class id. Normalized over the
/// configured classes (in class order) before use; missing ids weigh zero.
pub type SplitMap = BTreeMap<PartnerId, Rate>;

/// A partner in the vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityClass {
    pub id: PartnerId,
    pub name: String,
    /// Share of every capital call
    pub contribution_pct: Rate,
    /// Base share of distributions (single-tier mode); defaults to
    /// `contribution_pct`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_pct: Option<Rate>,
}

impl EquityClass {
    pub fn effective_distribution_pct(&self) -> Rate {
        self.distribution_pct.unwrap_or(self.contribution_pct)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClawbackMethod {
    /// Re-liquidate the vehicle hypothetically at each evaluation period and
    /// pull back any GP excess over what that liquidation would have paid.
    #[default]
    HypotheticalLiquidation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClawbackTrigger {
    /// Evaluate once, at the last period
    #[default]
    FinalPeriod,
    /// Evaluate at the end of every period after period 0
    Annual,
}

/// A single tier of the distribution waterfall. Tiers run in array order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaterfallTier {
    /// Pays down unreturned capital pro-rata to each partner's balance
    ReturnOfCapital {
        id: String,
        #[serde(default)]
        distribution_splits: SplitMap,
    },
    /// Preferred return, either as an IRR hurdle on the first partner or as a
    /// compounding preference account (`compound_pref` + `pref_rate`)
    PreferredReturn {
        id: String,
        #[serde(default)]
        distribution_splits: SplitMap,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hurdle_irr: Option<Rate>,
        #[serde(default)]
        compound_pref: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pref_rate: Option<Rate>,
    },
    /// Residual split, optionally preceded by a catch-up toward
    /// `catch_up_target_split`
    Promote {
        id: String,
        #[serde(default)]
        distribution_splits: SplitMap,
        #[serde(default)]
        enable_catch_up: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        catch_up_target_split: Option<SplitMap>,
        #[serde(default)]
        enable_clawback: bool,
        #[serde(default)]
        clawback_method: ClawbackMethod,
        #[serde(default)]
        clawback_trigger: ClawbackTrigger,
    },
}

impl WaterfallTier {
    pub fn id(&self) -> &str {
        match self {
            WaterfallTier::ReturnOfCapital { id, .. }
            | WaterfallTier::PreferredReturn { id, .. }
            | WaterfallTier::Promote { id, .. } => id,
        }
    }

    pub fn distribution_splits(&self) -> &SplitMap {
        match self {
            WaterfallTier::ReturnOfCapital {
                distribution_splits,
                ..
            }
            | WaterfallTier::PreferredReturn {
                distribution_splits,
                ..
            }
            | WaterfallTier::Promote {
                distribution_splits,
                ..
            } => distribution_splits,
        }
    }
}

/// Partners plus an optional tier list. No tiers (or an empty list) selects
/// single-tier pro-rata mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaterfallConfig {
    #[serde(default)]
    pub equity_classes: Vec<EquityClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<WaterfallTier>>,
}

impl WaterfallConfig {
    pub fn from_json(json: &str) -> WaterfallResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_multi_tier(&self) -> bool {
        self.tiers.as_ref().is_some_and(|t| !t.is_empty())
    }
}
