//! Parser for the Fama-French five-factor CSV files.
//!
//! The published files start with a free-text preamble, then a header row
//! `,Mkt-RF,SMB,HML,RMW,CMA,RF`, then one row per period keyed `YYYYMM`
//! (monthly) or `YYYYMMDD` (daily). Monthly files append an annual section
//! keyed by four-digit years, which is ignored. Values are in percent.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use ff5_model::FactorRow;
use tracing::{debug, warn};

use crate::error::{DataError, Result};
use crate::source::{DateRange, Frequency};

/// Factor rows keyed by period start date.
pub type FactorTable = BTreeMap<NaiveDate, FactorRow>;

const COLUMNS: [&str; 6] = ["Mkt-RF", "SMB", "HML", "RMW", "CMA", "RF"];

/// Sentinel the library uses for missing observations.
const MISSING_SENTINELS: [f64; 2] = [-99.99, -999.0];

/// Parse a five-factor CSV in the library's native layout.
///
/// Values are converted from percent to decimal fractions. Monthly keys map to
/// the first day of the month.
///
/// # Errors
/// `Schema` when the header is absent, a key does not match `frequency`, or a
/// value is not numeric.
pub fn parse_factor_csv(text: &str, frequency: Frequency) -> Result<FactorTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut positions: Option<[usize; 6]> = None;
    let mut table = FactorTable::new();
    let mut skipped = 0usize;

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let line = line + 1;

        let Some(cols) = positions else {
            positions = header_positions(&record);
            continue;
        };

        let key = record.get(0).unwrap_or_default();
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
            // End of the period section.
            break;
        }
        let Some(date) = parse_key(key, frequency, line)? else {
            break;
        };

        let mut values = [0.0; 6];
        for (slot, &col) in values.iter_mut().zip(&cols) {
            let raw = record.get(col).unwrap_or_default();
            *slot = raw.parse::<f64>().map_err(|_| {
                DataError::Schema(format!("line {line}: '{raw}' is not a number"))
            })?;
        }

        if values.iter().any(|v| MISSING_SENTINELS.contains(v)) {
            skipped += 1;
            continue;
        }

        let [mkt, smb, hml, rmw, cma, rf] = values.map(|v| v / 100.0);
        table.insert(date, FactorRow::new(mkt, smb, hml, rmw, cma, rf));
    }

    if positions.is_none() {
        return Err(DataError::Schema(format!(
            "no header row with columns {}",
            COLUMNS.join(", ")
        )));
    }
    if table.is_empty() {
        return Err(DataError::Schema(format!("no {frequency} factor rows found")));
    }
    if skipped > 0 {
        warn!(skipped, "skipped factor rows flagged as missing");
    }

    debug!(%frequency, rows = table.len(), "parsed factor table");
    Ok(table)
}

/// Keep only rows whose period key falls inside `range`.
///
/// Monthly keys are month starts, so a range starting mid-month still keeps
/// that month when its start lies before `range.end()`.
pub fn restrict_to_range(
    table: &FactorTable,
    range: DateRange,
    frequency: Frequency,
) -> FactorTable {
    let lower = match frequency {
        Frequency::Daily => range.start(),
        Frequency::Monthly => {
            crate::yahoo::returns::month_start(range.start()).unwrap_or(range.start())
        }
    };
    table.range(lower..=range.end()).map(|(k, v)| (*k, *v)).collect()
}

fn header_positions(record: &StringRecord) -> Option<[usize; 6]> {
    let mut positions = [0usize; 6];
    for (slot, name) in positions.iter_mut().zip(COLUMNS) {
        *slot = record.iter().position(|cell| cell.eq_ignore_ascii_case(name))?;
    }
    Some(positions)
}

/// Period key to date. `Ok(None)` marks the start of the annual section.
fn parse_key(key: &str, frequency: Frequency, line: usize) -> Result<Option<NaiveDate>> {
    let date = match (key.len(), frequency) {
        (4, Frequency::Monthly) => return Ok(None),
        (6, Frequency::Monthly) => {
            let year = key[..4].parse().ok();
            let month = key[4..].parse().ok();
            year.zip(month).and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        }
        (8, Frequency::Daily) => NaiveDate::parse_from_str(key, "%Y%m%d").ok(),
        _ => {
            return Err(DataError::Schema(format!(
                "line {line}: key '{key}' does not look like {frequency} data"
            )));
        }
    };
    date.map(Some)
        .ok_or_else(|| DataError::Schema(format!("line {line}: invalid date key '{key}'")))
}
