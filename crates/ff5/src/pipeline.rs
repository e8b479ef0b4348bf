//! End-to-end analysis: acquire, align, compute excess returns, fit.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use ff5_data::french::restrict_to_range;
use ff5_data::manual::ManualSeries;
use ff5_data::yahoo::{price_points, simple_returns};
use ff5_data::{
    DataError, DateRange, FactorTableSource, Frequency, PriceHistorySource, parse_factor_csv,
};
use ff5_model::{
    AlignOptions, AlignmentReport, FactorRow, FitOptions, ModelError, RegressionResult, align_with,
    compute_excess, fit_with,
};
use ff5_output::{RegressionSummary, Report, ReportBuilder, ReportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors from any stage of the pipeline.
///
/// Acquisition and validation failures surface as `Data` before the
/// regression runs.
#[derive(Debug, Error)]
pub enum Error {
    /// Acquisition or input validation failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Alignment or the regression failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Alignment and fit options for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// How unmatched periods are handled
    pub align: AlignOptions,
    /// Confidence level and singularity tolerance
    pub fit: FitOptions,
}

/// What to fetch for a remote analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Ticker symbol
    pub symbol: String,
    /// Inclusive date range of the prices
    pub range: DateRange,
    /// Return frequency
    pub frequency: Frequency,
}

impl FetchRequest {
    /// Monthly request for `symbol` over `range`.
    pub fn monthly(symbol: impl Into<String>, range: DateRange) -> Self {
        Self {
            symbol: symbol.into(),
            range,
            frequency: Frequency::Monthly,
        }
    }
}

/// A completed analysis.
#[derive(Debug, Clone)]
pub struct Analysis<K> {
    /// First aligned period
    pub first_period: K,
    /// Last aligned period
    pub last_period: K,
    /// Join statistics
    pub alignment: AlignmentReport,
    /// Stock return minus risk-free rate, one per aligned period
    pub excess_returns: Vec<f64>,
    /// The fitted model
    pub result: RegressionResult,
}

impl<K: fmt::Display> Analysis<K> {
    /// Summary table for presentation.
    pub fn summary(&self, name: impl Into<String>) -> RegressionSummary {
        RegressionSummary::new(name, self.result.clone())
            .with_period(&self.first_period, &self.last_period)
    }

    /// Report carrying the run's context.
    pub fn report(
        &self,
        symbol: impl Into<String>,
        frequency: Option<Frequency>,
    ) -> Result<Report, ReportError> {
        let builder = ReportBuilder::new()
            .symbol(symbol)
            .period(&self.first_period, &self.last_period)
            .alignment(self.alignment)
            .result(self.result.clone());
        match frequency {
            Some(frequency) => builder.frequency(frequency).build(),
            None => builder.build(),
        }
    }
}

/// Align `stock` with `factors`, compute excess returns and fit.
///
/// # Errors
/// `Model` when alignment fails or the sample cannot be fitted.
pub fn analyze<K: Ord + Clone>(
    stock: &BTreeMap<K, f64>,
    factors: &BTreeMap<K, FactorRow>,
    options: &AnalysisOptions,
) -> Result<Analysis<K>, Error> {
    let alignment = align_with(stock, factors, &options.align)?;
    let sample = alignment.sample;
    let excess_returns = compute_excess(&sample);
    let result = fit_with(&sample, &options.fit)?;

    info!(
        periods = result.n_observations,
        alpha = result.intercept(),
        r_squared = result.r_squared,
        "five-factor regression complete"
    );

    Ok(Analysis {
        first_period: sample.first_period().clone(),
        last_period: sample.last_period().clone(),
        alignment: alignment.report,
        excess_returns,
        result,
    })
}

/// Analyze periods entered by hand, keyed `1..=n`.
///
/// # Errors
/// See [`analyze`].
pub fn analyze_manual(
    series: &ManualSeries,
    options: &AnalysisOptions,
) -> Result<Analysis<u32>, Error> {
    analyze(&series.stock, &series.factors, options)
}

/// Fetch prices and the factor dataset, then analyze.
///
/// The two downloads run concurrently. Prices become simple returns at the
/// requested frequency and the factor table is cut to the periods those
/// returns span before alignment.
///
/// # Errors
/// `Data` for any acquisition failure, `Model` for alignment or fit failures.
pub async fn analyze_fetched<P, F>(
    prices: &P,
    factors: &F,
    request: &FetchRequest,
    options: &AnalysisOptions,
) -> Result<Analysis<NaiveDate>, Error>
where
    P: PriceHistorySource,
    F: FactorTableSource,
{
    let (price_frame, factor_text) = futures::try_join!(
        prices.fetch_prices(&request.symbol, request.range),
        factors.fetch_factor_csv(request.frequency),
    )?;

    let points = price_points(&price_frame)?;
    let stock = simple_returns(&points, request.frequency)?;
    let (Some(first), Some(last)) = (stock.keys().next(), stock.keys().next_back()) else {
        return Err(DataError::MissingData {
            symbol: request.symbol.clone(),
            reason: format!("no {} returns inside {}", request.frequency, request.range),
        }
        .into());
    };

    // Returns start one period after the first close, so the factor table
    // follows the return span rather than the requested range.
    let span = DateRange::new(*first, *last)?;
    let table = parse_factor_csv(&factor_text, request.frequency)?;
    let table = restrict_to_range(&table, span, request.frequency);

    info!(
        symbol = %request.symbol,
        frequency = %request.frequency,
        returns = stock.len(),
        factor_periods = table.len(),
        "acquired inputs"
    );

    if table.is_empty() {
        return Err(DataError::MissingData {
            symbol: factors.dataset_id(request.frequency),
            reason: format!("no factor rows inside {span}"),
        }
        .into());
    }

    analyze(&stock, &table, options)
}
