//! Five-factor data from the Kenneth French data library.

pub mod client;
pub mod parse;

pub use client::{
    FRENCH_LIBRARY_BASE_URL, FactorFile, FrenchLibraryClient, FrenchLibraryConfig, dataset_name,
    extract_csv,
};
pub use parse::{FactorTable, parse_factor_csv, restrict_to_range};
