#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ff5/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;

// Re-export main types from sub-crates
pub use ff5_data as data;
pub use ff5_model as model;
pub use ff5_output as output;

pub use pipeline::{
    Analysis, AnalysisOptions, Error, FetchRequest, analyze, analyze_fetched, analyze_manual,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
