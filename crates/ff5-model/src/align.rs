//! Inner join of a stock return series with a factor table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::factor::FactorRow;
use crate::sample::{AlignedSample, MIN_PERIODS, PeriodObservation};

/// What to do with periods present in only one of the two inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Drop unmatched periods without comment.
    Silent,
    /// Drop unmatched periods and log a warning with the counts.
    #[default]
    Warn,
    /// Refuse to align when any period is unmatched.
    Strict,
}

/// Alignment options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Handling of unmatched periods
    pub policy: MismatchPolicy,
}

impl AlignOptions {
    /// Options with the given mismatch policy.
    pub const fn with_policy(policy: MismatchPolicy) -> Self {
        Self { policy }
    }
}

/// Counts describing what the join kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Periods present in both inputs
    pub matched: usize,
    /// Periods dropped because the factor table had no row for them
    pub stock_only: usize,
    /// Periods dropped because the stock series had no return for them
    pub factor_only: usize,
}

impl AlignmentReport {
    /// Whether any period was dropped.
    pub const fn has_mismatch(&self) -> bool {
        self.stock_only > 0 || self.factor_only > 0
    }
}

/// An aligned sample with the report of the join that produced it.
#[derive(Debug, Clone)]
pub struct Alignment<K> {
    /// The aligned sample
    pub sample: AlignedSample<K>,
    /// Join statistics
    pub report: AlignmentReport,
}

/// Inner-join a stock return series with a factor table on the period key,
/// using the default [`MismatchPolicy`].
///
/// # Errors
/// `InsufficientData` when either input is empty or the intersection has
/// fewer than two periods.
pub fn align<K: Ord + Clone>(
    stock_series: &BTreeMap<K, f64>,
    factor_table: &BTreeMap<K, FactorRow>,
) -> Result<AlignedSample<K>, ModelError> {
    align_with(stock_series, factor_table, &AlignOptions::default()).map(|a| a.sample)
}

/// Inner-join with explicit options, returning the join report as well.
///
/// # Errors
/// `InsufficientData` when either input is empty or the intersection has
/// fewer than two periods; `PeriodMismatch` under [`MismatchPolicy::Strict`]
/// when any period is unmatched.
pub fn align_with<K: Ord + Clone>(
    stock_series: &BTreeMap<K, f64>,
    factor_table: &BTreeMap<K, FactorRow>,
    options: &AlignOptions,
) -> Result<Alignment<K>, ModelError> {
    if stock_series.is_empty() || factor_table.is_empty() {
        return Err(ModelError::InsufficientData {
            required: MIN_PERIODS,
            actual: 0,
        });
    }

    // BTreeMap iteration is ascending, so the joined rows come out ordered.
    let observations: Vec<PeriodObservation<K>> = stock_series
        .iter()
        .filter_map(|(period, &stock_return)| {
            factor_table
                .get(period)
                .map(|row| PeriodObservation::from_row(period.clone(), stock_return, row))
        })
        .collect();

    let matched = observations.len();
    let report = AlignmentReport {
        matched,
        stock_only: stock_series.len() - matched,
        factor_only: factor_table.len() - matched,
    };

    if report.has_mismatch() {
        match options.policy {
            MismatchPolicy::Silent => {}
            MismatchPolicy::Warn => warn!(
                matched,
                stock_only = report.stock_only,
                factor_only = report.factor_only,
                "dropping periods without a counterpart"
            ),
            MismatchPolicy::Strict => {
                return Err(ModelError::PeriodMismatch {
                    stock_only: report.stock_only,
                    factor_only: report.factor_only,
                });
            }
        }
    }

    if matched < MIN_PERIODS {
        return Err(ModelError::InsufficientData {
            required: MIN_PERIODS,
            actual: matched,
        });
    }

    debug!(matched, "aligned stock returns with factor table");
    let sample = AlignedSample::new(observations)?;
    Ok(Alignment { sample, report })
}
