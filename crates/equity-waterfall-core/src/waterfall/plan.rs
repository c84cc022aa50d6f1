use std::collections::BTreeSet;

use rust_decimal::Decimal;

use super::allocation::normalize_percentages;
use super::config::{
    ClawbackMethod, ClawbackTrigger, EquityClass, SplitMap, WaterfallConfig, WaterfallTier,
};
use super::push_warning;
use crate::error::WaterfallError;
use crate::types::{PartnerId, Rate};
use crate::WaterfallResult;

/// A partner as seen by the engine, in equity class order.
#[derive(Debug, Clone)]
pub(crate) struct Partner {
    pub id: PartnerId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CatchUpTerms {
    pub target: Vec<Rate>,
}

#[derive(Debug, Clone)]
pub(crate) enum TierRule {
    ReturnOfCapital,
    HurdlePreferred {
        splits: Vec<Rate>,
        hurdle_irr: Rate,
    },
    CompoundPreferred {
        splits: Vec<Rate>,
        pref_rate: Rate,
    },
    Promote {
        splits: Vec<Rate>,
        catch_up: Option<CatchUpTerms>,
        clawback: Option<(ClawbackMethod, ClawbackTrigger)>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct PlannedTier {
    pub id: String,
    pub rule: TierRule,
}

/// Validated, normalized form of a [`WaterfallConfig`].
#[derive(Debug, Clone)]
pub(crate) struct WaterfallPlan {
    pub partners: Vec<Partner>,
    pub contribution: Vec<Rate>,
    pub distribution: Vec<Rate>,
    pub tiers: Vec<PlannedTier>,
}

impl WaterfallPlan {
    /// Plan for pro-rata mode: both percentage sets are validated.
    pub fn single_tier(
        config: &WaterfallConfig,
        warnings: &mut Vec<String>,
    ) -> WaterfallResult<Self> {
        let classes = effective_classes(config, warnings)?;
        let contribution = normalized_field(&classes, "contribution_pct", |c| c.contribution_pct)?;
        let distribution = normalized_field(&classes, "distribution_pct", |c| {
            c.effective_distribution_pct()
        })?;

        Ok(Self {
            partners: partners_of(&classes),
            contribution,
            distribution,
            tiers: Vec::new(),
        })
    }

    /// Plan for tiered mode. Every tier is checked up front so a bad tier
    /// fails before any cash is allocated.
    pub fn multi_tier(
        config: &WaterfallConfig,
        warnings: &mut Vec<String>,
    ) -> WaterfallResult<Self> {
        let tiers = match config.tiers.as_deref() {
            Some(tiers) if !tiers.is_empty() => tiers,
            _ => return Err(WaterfallError::NoTiers),
        };

        let classes = effective_classes(config, warnings)?;
        let contribution = normalized_field(&classes, "contribution_pct", |c| c.contribution_pct)?;
        let distribution = normalize_percentages(
            &classes
                .iter()
                .map(EquityClass::effective_distribution_pct)
                .collect::<Vec<_>>(),
        );

        let mut seen_tiers = BTreeSet::new();
        let mut planned = Vec::with_capacity(tiers.len());
        for tier in tiers {
            if !seen_tiers.insert(tier.id()) {
                push_warning(warnings, format!("Duplicate tier id '{}'", tier.id()));
            }
            let splits = normalized_splits(&classes, tier.id(), tier.distribution_splits(), warnings);
            let rule = match tier {
                WaterfallTier::ReturnOfCapital { .. } => TierRule::ReturnOfCapital,
                WaterfallTier::PreferredReturn {
                    id,
                    hurdle_irr,
                    compound_pref,
                    pref_rate,
                    ..
                } => {
                    if *compound_pref {
                        let pref_rate = pref_rate.ok_or_else(|| missing(id, "pref_rate"))?;
                        if pref_rate < Decimal::ZERO {
                            return Err(WaterfallError::InvalidInput {
                                field: format!("tiers[{id}].pref_rate"),
                                reason: "Preferred return rate cannot be negative".into(),
                            });
                        }
                        TierRule::CompoundPreferred { splits, pref_rate }
                    } else {
                        let hurdle_irr = hurdle_irr.ok_or_else(|| missing(id, "hurdle_irr"))?;
                        TierRule::HurdlePreferred { splits, hurdle_irr }
                    }
                }
                WaterfallTier::Promote {
                    id,
                    enable_catch_up,
                    catch_up_target_split,
                    enable_clawback,
                    clawback_method,
                    clawback_trigger,
                    ..
                } => {
                    let catch_up = if *enable_catch_up {
                        let target = catch_up_target_split
                            .as_ref()
                            .ok_or_else(|| missing(id, "catch_up_target_split"))?;
                        Some(CatchUpTerms {
                            target: normalized_splits(&classes, id, target, warnings),
                        })
                    } else {
                        None
                    };
                    TierRule::Promote {
                        splits,
                        catch_up,
                        clawback: enable_clawback.then_some((*clawback_method, *clawback_trigger)),
                    }
                }
            };
            planned.push(PlannedTier {
                id: tier.id().to_string(),
                rule,
            });
        }

        Ok(Self {
            partners: partners_of(&classes),
            contribution,
            distribution,
            tiers: planned,
        })
    }

    pub fn num_partners(&self) -> usize {
        self.partners.len()
    }

    /// The GP: the class with the smallest contribution share (first on ties).
    pub fn gp_index(&self) -> usize {
        self.contribution
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

fn missing(tier_id: &str, parameter: &str) -> WaterfallError {
    WaterfallError::MissingTierParameter {
        tier_id: tier_id.to_string(),
        parameter: parameter.to_string(),
    }
}

/// Configured classes, or a single synthetic 100% owner when none are given.
fn effective_classes(
    config: &WaterfallConfig,
    warnings: &mut Vec<String>,
) -> WaterfallResult<Vec<EquityClass>> {
    if config.equity_classes.is_empty() {
        push_warning(
            warnings,
            "No equity classes configured; allocating 100% to a single owner".into(),
        );
        return Ok(vec![EquityClass {
            id: "owner".into(),
            name: "Owner".into(),
            contribution_pct: Decimal::ONE,
            distribution_pct: Some(Decimal::ONE),
        }]);
    }

    let mut seen = BTreeSet::new();
    for class in &config.equity_classes {
        if !seen.insert(class.id.as_str()) {
            return Err(WaterfallError::InvalidInput {
                field: "equity_classes".into(),
                reason: format!("Duplicate equity class id '{}'", class.id),
            });
        }
    }
    Ok(config.equity_classes.clone())
}

fn partners_of(classes: &[EquityClass]) -> Vec<Partner> {
    classes
        .iter()
        .map(|c| Partner {
            id: c.id.clone(),
            name: c.name.clone(),
        })
        .collect()
}

/// Normalize one percentage field and require every share in (0, 1].
fn normalized_field(
    classes: &[EquityClass],
    field: &str,
    get: impl Fn(&EquityClass) -> Rate,
) -> WaterfallResult<Vec<Rate>> {
    let raw: Vec<Rate> = classes.iter().map(get).collect();
    let normalized = normalize_percentages(&raw);
    for (class, pct) in classes.iter().zip(&normalized) {
        if *pct <= Decimal::ZERO || *pct > Decimal::ONE {
            return Err(WaterfallError::InvalidPercentage {
                class_id: class.id.clone(),
                field: field.to_string(),
                value: *pct,
            });
        }
    }
    Ok(normalized)
}

/// Project a split map onto class order and normalize it.
fn normalized_splits(
    classes: &[EquityClass],
    tier_id: &str,
    splits: &SplitMap,
    warnings: &mut Vec<String>,
) -> Vec<Rate> {
    for id in splits.keys() {
        if !classes.iter().any(|c| &c.id == id) {
            push_warning(
                warnings,
                format!("Tier '{tier_id}' references unknown partner '{id}'; ignored"),
            );
        }
    }
    let raw: Vec<Rate> = classes
        .iter()
        .map(|c| splits.get(&c.id).copied().unwrap_or(Decimal::ZERO))
        .collect();
    normalize_percentages(&raw)
}
