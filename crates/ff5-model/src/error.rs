//! Error types for the regression core.

use thiserror::Error;

/// Errors raised by alignment and the regression engine.
///
/// The core never recovers from these: a caller receiving one must stop the
/// pipeline instead of presenting partial statistics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Too few aligned periods, or no residual degrees of freedom.
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Minimum number of observations required
        required: usize,
        /// Number of observations available
        actual: usize,
    },

    /// The design matrix is rank deficient and `X'X` cannot be inverted.
    #[error("Singular design matrix: {reason}")]
    SingularMatrix {
        /// What made the matrix singular
        reason: String,
    },

    /// Unmatched periods under the strict mismatch policy.
    #[error(
        "Period mismatch: {stock_only} stock period(s) and {factor_only} factor period(s) \
         have no counterpart"
    )]
    PeriodMismatch {
        /// Periods present only in the stock series
        stock_only: usize,
        /// Periods present only in the factor table
        factor_only: usize,
    },

    /// A NaN or infinite value reached the core.
    #[error("Non-finite value in row {row}, field {field}")]
    NonFinite {
        /// Zero-based row index
        row: usize,
        /// Field name
        field: &'static str,
    },

    /// Periods were not strictly ascending.
    #[error("Periods are not strictly ascending at row {row}")]
    UnorderedPeriods {
        /// Zero-based row index of the first offending period
        row: usize,
    },

    /// Confidence level outside (0, 1).
    #[error("Invalid confidence level: {0} (must be in (0, 1))")]
    InvalidConfidenceLevel(f64),

    /// Failure constructing a reference distribution.
    #[error("Distribution error: {0}")]
    Distribution(String),
}

impl ModelError {
    /// Whether the error is one of the two conditions the engine reports for
    /// an unusable sample (`InsufficientData` or `SingularMatrix`).
    pub const fn is_degenerate_sample(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::SingularMatrix { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::InsufficientData {
            required: 7,
            actual: 2,
        };
        assert!(err.to_string().contains('7') && err.to_string().contains('2'));

        let err = ModelError::SingularMatrix {
            reason: "column `SMB` is all zeros".to_string(),
        };
        assert!(err.to_string().contains("SMB"));
    }

    #[test]
    fn degenerate_sample_classification() {
        let short = ModelError::InsufficientData {
            required: 2,
            actual: 0,
        };
        let singular = ModelError::SingularMatrix {
            reason: String::new(),
        };
        assert!(short.is_degenerate_sample());
        assert!(singular.is_degenerate_sample());
        assert!(!ModelError::InvalidConfidenceLevel(1.5).is_degenerate_sample());
    }
}
