//! Batch evaluation of independent waterfall scenarios.
//!
//! Every evaluation is a pure function of its own flows and configuration,
//! so scenarios run in parallel under the `parallel` feature. Results come
//! back tagged with their originating index and in index order regardless
//! of completion order. Cancellation is cooperative and checked before each
//! evaluation starts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::WaterfallError;
use crate::types::Money;
use crate::waterfall::{evaluate_waterfall, WaterfallConfig, WaterfallOutput};
use crate::WaterfallResult;

/// Shared cancellation flag plus a completed-evaluations counter.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Evaluations finished since the token was created
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// One waterfall to evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallScenario {
    pub owner_cash_flows: Vec<Money>,
    pub config: WaterfallConfig,
}

/// Outcome of one scenario. A configuration error fails only its own
/// scenario, never the batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub index: usize,
    pub outcome: WaterfallResult<WaterfallOutput>,
    pub warnings: Vec<String>,
}

/// Evaluate every scenario. Returns `Cancelled` if the token fires before
/// all evaluations have started.
pub fn evaluate_batch(
    scenarios: &[WaterfallScenario],
    cancel: &CancellationToken,
) -> WaterfallResult<Vec<BatchOutcome>> {
    #[cfg(feature = "parallel")]
    let outcomes: Vec<Option<BatchOutcome>> = scenarios
        .par_iter()
        .enumerate()
        .map(|(index, scenario)| evaluate_one(index, scenario, cancel))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Option<BatchOutcome>> = scenarios
        .iter()
        .enumerate()
        .map(|(index, scenario)| evaluate_one(index, scenario, cancel))
        .collect();

    let completed = outcomes.iter().filter(|o| o.is_some()).count();
    let outcomes: Option<Vec<BatchOutcome>> = outcomes.into_iter().collect();
    let outcomes = outcomes.ok_or(WaterfallError::Cancelled { completed })?;

    log::debug!(
        "batch evaluated {} scenarios ({} failed)",
        outcomes.len(),
        outcomes.iter().filter(|o| o.outcome.is_err()).count()
    );
    Ok(outcomes)
}

fn evaluate_one(
    index: usize,
    scenario: &WaterfallScenario,
    cancel: &CancellationToken,
) -> Option<BatchOutcome> {
    if cancel.is_cancelled() {
        return None;
    }
    let mut warnings = Vec::new();
    let outcome = evaluate_waterfall(&scenario.owner_cash_flows, &scenario.config, &mut warnings);
    cancel.increment();
    Some(BatchOutcome {
        index,
        outcome,
        warnings,
    })
}
