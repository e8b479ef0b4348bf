//! Aligned observations fed to the regression engine.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::factor::{Factor, FactorRow};

/// Minimum number of periods an aligned sample may hold.
pub const MIN_PERIODS: usize = 2;

/// One aligned period: the stock return, the risk-free rate and the five
/// factor values, all as decimal fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodObservation<K> {
    /// Period key (calendar date or sequence index)
    pub period: K,
    /// Stock return for the period
    pub stock_return: f64,
    /// Risk-free rate for the period
    pub risk_free_rate: f64,
    /// Mkt-RF
    pub market_excess: f64,
    /// SMB
    pub size_factor: f64,
    /// HML
    pub value_factor: f64,
    /// RMW
    pub profitability_factor: f64,
    /// CMA
    pub investment_factor: f64,
}

impl<K> PeriodObservation<K> {
    /// Combine a stock return with the factor row for the same period.
    pub const fn from_row(period: K, stock_return: f64, row: &FactorRow) -> Self {
        Self {
            period,
            stock_return,
            risk_free_rate: row.risk_free,
            market_excess: row.market_excess,
            size_factor: row.size,
            value_factor: row.value,
            profitability_factor: row.profitability,
            investment_factor: row.investment,
        }
    }

    /// Value of a single factor.
    pub const fn factor(&self, factor: Factor) -> f64 {
        match factor {
            Factor::MktRf => self.market_excess,
            Factor::Smb => self.size_factor,
            Factor::Hml => self.value_factor,
            Factor::Rmw => self.profitability_factor,
            Factor::Cma => self.investment_factor,
        }
    }

    /// Stock return in excess of the risk-free rate.
    pub fn excess_return(&self) -> f64 {
        self.stock_return - self.risk_free_rate
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("stock_return", self.stock_return),
            ("risk_free_rate", self.risk_free_rate),
            ("market_excess", self.market_excess),
            ("size_factor", self.size_factor),
            ("value_factor", self.value_factor),
            ("profitability_factor", self.profitability_factor),
            ("investment_factor", self.investment_factor),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// An ordered, validated sequence of period observations.
///
/// Invariants: at least [`MIN_PERIODS`] rows, periods strictly ascending,
/// every value finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSample<K> {
    observations: Vec<PeriodObservation<K>>,
}

impl<K: Ord> AlignedSample<K> {
    /// Validate and wrap a list of observations.
    ///
    /// # Errors
    /// `InsufficientData` for fewer than two rows, `UnorderedPeriods` when the
    /// periods are not strictly ascending, `NonFinite` for NaN or infinite
    /// values.
    pub fn new(observations: Vec<PeriodObservation<K>>) -> Result<Self, ModelError> {
        if observations.len() < MIN_PERIODS {
            return Err(ModelError::InsufficientData {
                required: MIN_PERIODS,
                actual: observations.len(),
            });
        }

        for (row, obs) in observations.iter().enumerate() {
            if let Some(field) = obs.first_non_finite() {
                return Err(ModelError::NonFinite { row, field });
            }
        }

        if let Some(row) = observations.windows(2).position(|w| w[0].period >= w[1].period) {
            return Err(ModelError::UnorderedPeriods { row: row + 1 });
        }

        Ok(Self { observations })
    }
}

impl<K> AlignedSample<K> {
    /// Number of periods.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The observations in ascending period order.
    pub fn observations(&self) -> &[PeriodObservation<K>] {
        &self.observations
    }

    /// Iterate over the observations.
    pub fn iter(&self) -> std::slice::Iter<'_, PeriodObservation<K>> {
        self.observations.iter()
    }

    /// Period keys in order.
    pub fn periods(&self) -> impl Iterator<Item = &K> {
        self.observations.iter().map(|o| &o.period)
    }

    /// First period of the sample.
    pub fn first_period(&self) -> &K {
        &self.observations[0].period
    }

    /// Last period of the sample.
    pub fn last_period(&self) -> &K {
        &self.observations[self.observations.len() - 1].period
    }

    /// Values of one factor across the sample.
    pub fn factor_column(&self, factor: Factor) -> Vec<f64> {
        self.observations.iter().map(|o| o.factor(factor)).collect()
    }

    /// Consume the sample, returning its observations.
    pub fn into_observations(self) -> Vec<PeriodObservation<K>> {
        self.observations
    }
}

impl<'a, K> IntoIterator for &'a AlignedSample<K> {
    type Item = &'a PeriodObservation<K>;
    type IntoIter = std::slice::Iter<'a, PeriodObservation<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
