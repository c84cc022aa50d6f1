use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::batch::{evaluate_batch, CancellationToken, WaterfallScenario};
use crate::error::WaterfallError;
use crate::types::*;
use crate::waterfall::{evaluate_waterfall, WaterfallConfig, WaterfallOutput, WaterfallTier};
use crate::WaterfallResult;

/// Waterfall parameter swept along one grid axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensitivityTarget {
    /// Multiplies every positive owner cash flow
    DistributionScale,
    /// Multiplies every negative owner cash flow
    ContributionScale,
    /// Sets `pref_rate` on every compounding preferred-return tier
    PrefRate,
    /// Sets `hurdle_irr` on every IRR-hurdle preferred-return tier
    HurdleIrr,
    /// Sets one partner's weight in every promote split; the other partners
    /// share the rest in their existing proportions
    PromoteSplit { partner_id: PartnerId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityAxis {
    pub target: SensitivityTarget,
    pub variable: SensitivityVariable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMetric {
    Irr,
    Moic,
    TotalDistributed,
}

/// Input for a 2-way waterfall sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallSensitivityInput {
    pub owner_cash_flows: Vec<Money>,
    pub config: WaterfallConfig,
    pub axis_1: SensitivityAxis,
    pub axis_2: SensitivityAxis,
    pub output_metric: OutputMetric,
    /// Partner whose metric fills the grid
    pub partner_id: PartnerId,
}

/// Output of a 2-way waterfall sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallSensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: OutputMetric,
    pub partner_id: PartnerId,
    /// Matrix[i][j] = metric when variable_1 = variable_1_values[i] and
    /// variable_2 = variable_2_values[j]; `None` where the metric is
    /// undefined or the evaluation failed
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Metric for the unmodified inputs
    pub base_case_value: Option<Decimal>,
    pub failed_cells: usize,
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> WaterfallResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(WaterfallError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Apply one swept value to a copy of the scenario.
fn apply_target(
    scenario: &mut WaterfallScenario,
    target: &SensitivityTarget,
    value: Decimal,
) -> WaterfallResult<()> {
    match target {
        SensitivityTarget::DistributionScale => {
            for flow in scenario.owner_cash_flows.iter_mut().filter(|f| **f > Decimal::ZERO) {
                *flow *= value;
            }
        }
        SensitivityTarget::ContributionScale => {
            for flow in scenario.owner_cash_flows.iter_mut().filter(|f| **f < Decimal::ZERO) {
                *flow *= value;
            }
        }
        SensitivityTarget::PrefRate => {
            let mut applied = false;
            for tier in tiers_mut(&mut scenario.config) {
                if let WaterfallTier::PreferredReturn {
                    compound_pref: true,
                    pref_rate,
                    ..
                } = tier
                {
                    *pref_rate = Some(value);
                    applied = true;
                }
            }
            require_applied(applied, target)?;
        }
        SensitivityTarget::HurdleIrr => {
            let mut applied = false;
            for tier in tiers_mut(&mut scenario.config) {
                if let WaterfallTier::PreferredReturn {
                    compound_pref: false,
                    hurdle_irr,
                    ..
                } = tier
                {
                    *hurdle_irr = Some(value);
                    applied = true;
                }
            }
            require_applied(applied, target)?;
        }
        SensitivityTarget::PromoteSplit { partner_id } => {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(WaterfallError::InvalidInput {
                    field: "promote_split".into(),
                    reason: format!("Split {value} for '{partner_id}' must lie in [0, 1]"),
                });
            }
            let others: Vec<PartnerId> = scenario
                .config
                .equity_classes
                .iter()
                .map(|c| c.id.clone())
                .filter(|id| id != partner_id)
                .collect();
            let mut applied = false;
            for tier in tiers_mut(&mut scenario.config) {
                if let WaterfallTier::Promote {
                    distribution_splits,
                    ..
                } = tier
                {
                    let other_total: Decimal = others
                        .iter()
                        .filter_map(|id| distribution_splits.get(id))
                        .sum();
                    let rest = Decimal::ONE - value;
                    for id in &others {
                        let weight = if other_total.is_zero() {
                            rest / Decimal::from(others.len() as u64)
                        } else {
                            distribution_splits.get(id).copied().unwrap_or(Decimal::ZERO) / other_total
                                * rest
                        };
                        distribution_splits.insert(id.clone(), weight);
                    }
                    distribution_splits.insert(partner_id.clone(), value);
                    applied = true;
                }
            }
            require_applied(applied, target)?;
        }
    }
    Ok(())
}

fn tiers_mut(config: &mut WaterfallConfig) -> impl Iterator<Item = &mut WaterfallTier> {
    config.tiers.iter_mut().flatten()
}

fn require_applied(applied: bool, target: &SensitivityTarget) -> WaterfallResult<()> {
    if applied {
        Ok(())
    } else {
        Err(WaterfallError::InvalidInput {
            field: format!("target:{target:?}"),
            reason: "No tier in the configuration uses this parameter".into(),
        })
    }
}

fn extract_metric(output: &WaterfallOutput, partner_id: &str, metric: OutputMetric) -> Option<Decimal> {
    let series = output.partner(partner_id)?;
    match metric {
        OutputMetric::Irr => series.irr,
        OutputMetric::Moic => series.moic,
        OutputMetric::TotalDistributed => Some(series.total_distributed),
    }
}

fn check_partner(config: &WaterfallConfig, partner_id: &str) -> WaterfallResult<()> {
    let known = if config.equity_classes.is_empty() {
        partner_id == "owner"
    } else {
        config.equity_classes.iter().any(|c| c.id == partner_id)
    };
    if known {
        Ok(())
    } else {
        Err(WaterfallError::InvalidInput {
            field: "partner_id".into(),
            reason: format!("Unknown partner '{partner_id}'"),
        })
    }
}

/// Evaluate a 2-way sensitivity grid over waterfall parameters.
///
/// The base configuration is evaluated first so configuration errors surface
/// immediately; grid cells then run through the batch runner and a failing
/// cell leaves `None` in the matrix.
pub fn run_waterfall_sensitivity(
    input: &WaterfallSensitivityInput,
    cancel: &CancellationToken,
) -> WaterfallResult<ComputationOutput<WaterfallSensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    check_partner(&input.config, &input.partner_id)?;
    let v1_values = generate_sweep_values(&input.axis_1.variable)?;
    let v2_values = generate_sweep_values(&input.axis_2.variable)?;

    let base = evaluate_waterfall(&input.owner_cash_flows, &input.config, &mut warnings)?;
    let base_case_value = extract_metric(&base, &input.partner_id, input.output_metric);

    let base_scenario = WaterfallScenario {
        owner_cash_flows: input.owner_cash_flows.clone(),
        config: input.config.clone(),
    };
    let mut scenarios = Vec::with_capacity(v1_values.len() * v2_values.len());
    for v1 in &v1_values {
        for v2 in &v2_values {
            let mut scenario = base_scenario.clone();
            apply_target(&mut scenario, &input.axis_1.target, *v1)?;
            apply_target(&mut scenario, &input.axis_2.target, *v2)?;
            scenarios.push(scenario);
        }
    }

    let outcomes = evaluate_batch(&scenarios, cancel)?;

    let mut matrix = vec![vec![None; v2_values.len()]; v1_values.len()];
    let mut failed_cells = 0;
    for outcome in outcomes {
        let (i, j) = (outcome.index / v2_values.len(), outcome.index % v2_values.len());
        match outcome.outcome {
            Ok(output) => {
                matrix[i][j] = extract_metric(&output, &input.partner_id, input.output_metric);
            }
            Err(e) => {
                failed_cells += 1;
                warnings.push(format!(
                    "Evaluation failed at ({}, {}): {e}",
                    v1_values[i], v2_values[j]
                ));
            }
        }
    }

    let output = WaterfallSensitivityOutput {
        variable_1_name: input.axis_1.variable.name.clone(),
        variable_2_name: input.axis_2.variable.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        partner_id: input.partner_id.clone(),
        matrix,
        base_case_value,
        failed_cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Waterfall Sensitivity",
        &serde_json::json!({
            "variable_1": input.axis_1.variable.name,
            "variable_2": input.axis_2.variable.name,
            "output_metric": input.output_metric,
            "partner_id": input.partner_id,
            "cells": output.variable_1_values.len() * output.variable_2_values.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
