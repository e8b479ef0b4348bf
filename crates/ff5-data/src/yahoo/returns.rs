//! Conversion of adjusted closing prices to simple period returns.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{DataError, Result};
use crate::source::Frequency;

/// Days from 0001-01-01 (CE) to 1970-01-01, the polars `Date` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One adjusted closing price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    /// Trading day
    pub date: NaiveDate,
    /// Adjusted close
    pub close: f64,
}

/// Extract `(date, adjusted_close)` pairs from a price frame.
///
/// Rows with a missing, non-finite or non-positive close are dropped with a
/// warning. The result is ascending by date with one entry per day.
pub fn price_points(df: &DataFrame) -> Result<Vec<PricePoint>> {
    let dates = df.column("date")?.cast(&DataType::Int32)?;
    let dates = dates.i32()?;
    let closes = df.column("adjusted_close")?.cast(&DataType::Float64)?;
    let closes = closes.f64()?;

    let mut by_date = BTreeMap::new();
    let mut dropped = 0usize;
    for i in 0..df.height() {
        let date = dates
            .get(i)
            .and_then(|days| NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE))
            .ok_or_else(|| DataError::Parse(format!("missing date in price row {i}")))?;
        match closes.get(i) {
            Some(close) if close.is_finite() && close > 0.0 => {
                by_date.insert(date, close);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "ignoring price rows without a usable adjusted close");
    }

    Ok(by_date.into_iter().map(|(date, close)| PricePoint { date, close }).collect())
}

/// Build a price frame (`date`, `adjusted_close`) from points.
pub fn prices_frame(points: &[PricePoint]) -> Result<DataFrame> {
    let days: Vec<i32> =
        points.iter().map(|p| p.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE).collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

    Ok(DataFrame::new(vec![
        Series::new("date".into(), days).cast(&DataType::Date)?.into(),
        Series::new("adjusted_close".into(), closes).into(),
    ])?)
}

/// Simple returns `close_t / close_{t-1} - 1` at the requested frequency.
///
/// Daily returns are keyed by the later trading day. Monthly returns use the
/// last close of each calendar month and are keyed by the first day of the
/// later month; a month with no prices breaks the chain and the month after
/// it gets no return.
pub fn simple_returns(
    points: &[PricePoint],
    frequency: Frequency,
) -> Result<BTreeMap<NaiveDate, f64>> {
    if points.len() < 2 {
        return Err(DataError::MissingData {
            symbol: "price history".to_string(),
            reason: format!("need at least two closes to compute returns, got {}", points.len()),
        });
    }

    let returns: BTreeMap<NaiveDate, f64> = match frequency {
        Frequency::Daily => points
            .windows(2)
            .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
            .collect(),
        Frequency::Monthly => {
            let month_ends: BTreeMap<NaiveDate, f64> = points
                .iter()
                .filter_map(|p| month_start(p.date).map(|m| (m, p.close)))
                .collect();
            month_ends
                .iter()
                .zip(month_ends.iter().skip(1))
                .filter(|((prev, _), (next, _))| next_month(**prev) == Some(**next))
                .map(|((_, prev_close), (next, next_close))| (*next, next_close / prev_close - 1.0))
                .collect()
        }
    };

    debug!(%frequency, periods = returns.len(), "computed simple returns");
    Ok(returns)
}

/// First day of the month containing `date`.
pub(crate) fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

fn next_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}
