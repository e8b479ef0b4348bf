#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ff5/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod export;
pub mod report;
pub mod summary;

pub use chart::{BetaChart, beta_chart};
pub use export::{ExportError, ExportFormat, Exporter, TermRecord};
pub use report::{Report, ReportBuilder, ReportError};
pub use summary::{RegressionSummary, alpha_headline};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
