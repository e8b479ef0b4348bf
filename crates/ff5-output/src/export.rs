//! CSV, JSON and Markdown export of regression results.

use ff5_model::{RegressionResult, TermStatistics};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::summary::RegressionSummary;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values, one row per term.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,

    /// Markdown summary.
    Markdown,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
            Self::Markdown => "md",
        }
    }

    /// Infer the format from a file extension. JSON files are pretty-printed.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::PrettyJson),
            "md" | "markdown" => Ok(Self::Markdown),
            other => other.parse(),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// One coefficient as a flat CSV record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermRecord {
    /// Term label (`const`, `Mkt-RF`, ...).
    pub term: String,

    /// OLS estimate.
    pub coefficient: f64,

    /// Standard error.
    pub std_error: f64,

    /// t-statistic.
    pub t_stat: f64,

    /// Two-sided p-value.
    pub p_value: f64,

    /// Lower confidence bound.
    pub ci_lower: f64,

    /// Upper confidence bound.
    pub ci_upper: f64,
}

impl From<&TermStatistics> for TermRecord {
    fn from(t: &TermStatistics) -> Self {
        Self {
            term: t.term.label().to_string(),
            coefficient: t.coefficient,
            std_error: t.std_error,
            t_stat: t.t_stat,
            p_value: t.p_value,
            ci_lower: t.ci_lower,
            ci_upper: t.ci_upper,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Write one CSV row per term.
pub(crate) fn terms_csv(terms: &[TermStatistics]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for term in terms {
        wtr.serialize(TermRecord::from(term))?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

impl Exporter for RegressionResult {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => terms_csv(&self.terms),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Markdown => {
                Ok(RegressionSummary::new("Excess", self.clone()).to_markdown())
            }
        }
    }
}

impl Exporter for RegressionSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => terms_csv(&self.result.terms),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Markdown => Ok(self.to_markdown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::fixtures;
    use rstest::rstest;

    #[test]
    fn csv_has_one_row_per_term() {
        let csv = fixtures::result().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "term,coefficient,std_error,t_stat,p_value,ci_lower,ci_upper");
        assert!(lines[1].starts_with("const,0.0021,"));
        assert!(lines[2].starts_with("Mkt-RF,1.1,"));
        assert!(lines[6].starts_with("CMA,-0.6,"));
    }

    #[test]
    fn json_round_trips_the_whole_result() {
        let result = fixtures::result();
        let json = result.export_to_string(ExportFormat::Json).unwrap();
        let back: RegressionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.terms.len(), 6);
        assert_eq!(back.n_observations, result.n_observations);
        assert_eq!(back.terms[1].term, result.terms[1].term);
        assert!(json.contains("\"Mkt-RF\""));
    }

    #[test]
    fn pretty_json_is_indented() {
        let json = fixtures::result().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\n  \"terms\""));
    }

    #[test]
    fn markdown_uses_the_summary() {
        let md = fixtures::result().export_to_string(ExportFormat::Markdown).unwrap();
        assert!(md.contains("## Coefficients"));
    }

    #[rstest]
    #[case("out.csv", ExportFormat::Csv)]
    #[case("out.JSON", ExportFormat::PrettyJson)]
    #[case("report.md", ExportFormat::Markdown)]
    fn format_from_extension(#[case] path: &str, #[case] expected: ExportFormat) {
        assert_eq!(ExportFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = ExportFormat::from_path(Path::new("out.xlsx")).unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn export_to_file_writes_content() {
        let path = std::env::temp_dir().join(format!("ff5-export-{}.csv", std::process::id()));
        fixtures::result().export_to_file(&path, ExportFormat::Csv).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(written.starts_with("term,"));
    }
}
