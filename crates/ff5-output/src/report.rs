//! Report generation for a single five-factor regression run.

use chrono::{DateTime, Utc};
use ff5_model::{AlignmentReport, RegressionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::export::{ExportError, ExportFormat, Exporter, terms_csv};
use crate::summary::RegressionSummary;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// A regression run with the context it was produced in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Symbol being analyzed.
    pub symbol: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Return frequency (`daily`, `monthly`), if known.
    pub frequency: Option<String>,

    /// First period of the aligned sample.
    pub period_start: Option<String>,

    /// Last period of the aligned sample.
    pub period_end: Option<String>,

    /// How the stock and factor series were joined.
    pub alignment: Option<AlignmentReport>,

    /// The fitted model.
    pub result: RegressionResult,
}

impl Report {
    /// Create a new report.
    pub fn new(symbol: String, result: RegressionResult) -> Self {
        Self {
            symbol,
            timestamp: Utc::now(),
            frequency: None,
            period_start: None,
            period_end: None,
            alignment: None,
            result,
        }
    }

    /// The summary table view of this report.
    pub fn summary(&self) -> RegressionSummary {
        let summary = RegressionSummary::new(self.symbol.clone(), self.result.clone());
        match (&self.period_start, &self.period_end) {
            (Some(start), Some(end)) => summary.with_period(start, end),
            _ => summary,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        if let Some(alignment) = &self.alignment {
            writeln!(
                f,
                "  Aligned {} periods ({} stock-only, {} factor-only dropped)",
                alignment.matched, alignment.stock_only, alignment.factor_only
            )?;
        }
        Ok(())
    }
}

impl Exporter for Report {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => terms_csv(&self.result.terms),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Markdown => Ok(self.summary().to_markdown()),
        }
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    symbol: Option<String>,
    frequency: Option<String>,
    period: Option<(String, String)>,
    alignment: Option<AlignmentReport>,
    result: Option<RegressionResult>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the return frequency.
    pub fn frequency(mut self, frequency: impl fmt::Display) -> Self {
        self.frequency = Some(frequency.to_string());
        self
    }

    /// Set the first and last aligned period.
    pub fn period(mut self, start: impl fmt::Display, end: impl fmt::Display) -> Self {
        self.period = Some((start.to_string(), end.to_string()));
        self
    }

    /// Set the alignment statistics.
    pub const fn alignment(mut self, alignment: AlignmentReport) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Set the regression result.
    pub fn result(mut self, result: RegressionResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let result = self.result.ok_or(ReportError::MissingField("result"))?;
        let (period_start, period_end) = self.period.unzip();
        Ok(Report {
            frequency: self.frequency,
            period_start,
            period_end,
            alignment: self.alignment,
            ..Report::new(self.symbol.unwrap_or_default(), result)
        })
    }
}
