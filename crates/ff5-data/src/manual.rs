//! Manually entered periods.
//!
//! Each period carries the stock return, the risk-free rate and the five
//! factor values as decimal fractions. Periods are numbered from 1 in the
//! order they are added.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use ff5_model::{FactorRow, MIN_PERIODS};
use serde::Deserialize;

use crate::error::{DataError, Result};

/// Column names of a manual-entry CSV file, in order.
pub const MANUAL_COLUMNS: [&str; 7] = ["Stock", "RF", "Mkt-RF", "SMB", "HML", "RMW", "CMA"];

/// Default number of periods offered for interactive entry.
pub const DEFAULT_MANUAL_PERIODS: usize = 10;

/// One manually entered period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualRow {
    /// Stock return
    pub stock: f64,
    /// Factor values and risk-free rate
    pub factors: FactorRow,
}

/// CSV layout of a [`ManualRow`].
#[derive(Debug, Deserialize)]
struct ManualRecord {
    #[serde(rename = "Stock")]
    stock: f64,
    #[serde(rename = "RF")]
    risk_free: f64,
    #[serde(rename = "Mkt-RF")]
    market_excess: f64,
    #[serde(rename = "SMB")]
    size: f64,
    #[serde(rename = "HML")]
    value: f64,
    #[serde(rename = "RMW")]
    profitability: f64,
    #[serde(rename = "CMA")]
    investment: f64,
}

impl From<ManualRecord> for ManualRow {
    fn from(r: ManualRecord) -> Self {
        Self {
            stock: r.stock,
            factors: FactorRow::new(
                r.market_excess,
                r.size,
                r.value,
                r.profitability,
                r.investment,
                r.risk_free,
            ),
        }
    }
}

/// Stock series and factor table keyed by period number.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSeries {
    /// Stock return per period
    pub stock: BTreeMap<u32, f64>,
    /// Factor row per period
    pub factors: BTreeMap<u32, FactorRow>,
}

/// Ordered builder for manually entered periods.
#[derive(Debug, Clone, Default)]
pub struct ManualEntryBuilder {
    rows: Vec<ManualRow>,
}

impl ManualEntryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of periods added so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no period has been added.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one period after validating it.
    ///
    /// # Errors
    /// `Validation` when a value is not finite or a return is at or below -100%.
    pub fn push(&mut self, row: ManualRow) -> Result<&mut Self> {
        validate_row(self.rows.len() + 1, &row)?;
        self.rows.push(row);
        Ok(self)
    }

    /// Append one period given as raw text fields in [`MANUAL_COLUMNS`] order.
    ///
    /// # Errors
    /// `Validation` naming the first field that is empty, not a number or out
    /// of range.
    pub fn push_fields(&mut self, fields: &[&str]) -> Result<&mut Self> {
        let row_number = self.rows.len() + 1;
        if fields.len() != MANUAL_COLUMNS.len() {
            return Err(DataError::validation(
                row_number,
                "row",
                format!("expected {} values, got {}", MANUAL_COLUMNS.len(), fields.len()),
            ));
        }

        let mut values = [0.0; 7];
        for ((slot, raw), name) in values.iter_mut().zip(fields).zip(MANUAL_COLUMNS) {
            *slot = parse_value(row_number, name, raw)?;
        }
        let [stock, rf, mkt, smb, hml, rmw, cma] = values;
        self.push(ManualRow {
            stock,
            factors: FactorRow::new(mkt, smb, hml, rmw, cma, rf),
        })
    }

    /// Finish, keying periods `1..=n`.
    ///
    /// # Errors
    /// `Validation` when fewer than two periods were added.
    pub fn build(self) -> Result<ManualSeries> {
        if self.rows.len() < MIN_PERIODS {
            return Err(DataError::validation(
                self.rows.len(),
                "periods",
                format!("at least {MIN_PERIODS} periods are required"),
            ));
        }

        let mut stock = BTreeMap::new();
        let mut factors = BTreeMap::new();
        for (period, row) in (1u32..).zip(self.rows) {
            stock.insert(period, row.stock);
            factors.insert(period, row.factors);
        }
        Ok(ManualSeries { stock, factors })
    }
}

/// Parse one user-typed number.
///
/// # Errors
/// `Validation` for empty or non-numeric input and non-finite values.
pub fn parse_value(row: usize, field: &str, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DataError::validation(row, field, "value is empty"));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| DataError::validation(row, field, format!("not a number: '{raw}'")))?;
    if !value.is_finite() {
        return Err(DataError::validation(row, field, format!("not a finite number: '{raw}'")));
    }
    Ok(value)
}

/// Load periods from a CSV with header `Stock,RF,Mkt-RF,SMB,HML,RMW,CMA`.
///
/// # Errors
/// `Csv` for malformed files, `Validation` for bad values.
pub fn read_manual_csv<R: Read>(reader: R) -> Result<ManualEntryBuilder> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv.headers()?.clone();
    for name in MANUAL_COLUMNS {
        if !headers.iter().any(|h| h == name) {
            return Err(DataError::Schema(format!("manual CSV is missing column '{name}'")));
        }
    }

    let mut builder = ManualEntryBuilder::new();
    for (i, record) in csv.deserialize::<ManualRecord>().enumerate() {
        let row = record.map_err(|e| DataError::validation(i + 1, "row", e.to_string()))?;
        builder.push(row.into())?;
    }
    Ok(builder)
}

/// [`read_manual_csv`] on a file path.
pub fn load_manual_csv(path: impl AsRef<Path>) -> Result<ManualEntryBuilder> {
    read_manual_csv(std::fs::File::open(path)?)
}

fn validate_row(row: usize, entry: &ManualRow) -> Result<()> {
    let f = &entry.factors;
    let values = [
        ("Stock", entry.stock),
        ("RF", f.risk_free),
        ("Mkt-RF", f.market_excess),
        ("SMB", f.size),
        ("HML", f.value),
        ("RMW", f.profitability),
        ("CMA", f.investment),
    ];
    for (field, value) in values {
        if !value.is_finite() {
            return Err(DataError::validation(row, field, "value must be finite"));
        }
    }
    for (field, value) in [("Stock", entry.stock), ("RF", f.risk_free)] {
        if value <= -1.0 {
            return Err(DataError::validation(
                row,
                field,
                format!("{value} is a loss of 100% or more; enter returns as decimals (0.01 = 1%)"),
            ));
        }
    }
    Ok(())
}
