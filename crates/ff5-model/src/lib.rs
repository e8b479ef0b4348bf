#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ff5/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod align;
pub mod error;
pub mod excess;
pub mod factor;
mod linalg;
pub mod ols;
pub mod result;
pub mod sample;

// Re-export main types
pub use align::{AlignOptions, Alignment, AlignmentReport, MismatchPolicy, align, align_with};
pub use error::ModelError;
pub use excess::compute_excess;
pub use factor::{Factor, FactorRow, Term};
pub use ols::{
    FitOptions, NUM_TERMS, RegressionInput, fit, fit_input, fit_with, residual_cross_products,
};
pub use result::{RegressionResult, TermStatistics};
pub use sample::{AlignedSample, MIN_PERIODS, PeriodObservation};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
