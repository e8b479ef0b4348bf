//! Acquisition pipeline tests against fixed fixtures.

use chrono::{Datelike, NaiveDate};
use ff5_data::cached::{CachedFactorSource, shared};
use ff5_data::french::restrict_to_range;
use ff5_data::yahoo::{PricePoint, simple_returns};
use ff5_data::{
    AcquisitionCache, CachePolicy, DateRange, FactorFile, FactorTableSource, Frequency,
    parse_factor_csv,
};
use ff5_model::{align, fit};

fn month(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020 + (i / 12) as i32, i % 12 + 1, 1).unwrap()
}

/// Deterministic but irregular factor values in percent.
fn factor_csv(months: u32) -> String {
    let mut text = String::from("Preamble line\n\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
    for i in 0..months {
        let t = f64::from(i);
        let date = month(i);
        text.push_str(&format!(
            "{:04}{:02},{:.4},{:.4},{:.4},{:.4},{:.4},0.10\n",
            date.year(),
            date.month(),
            4.0 * (t * 0.9).sin(),
            2.0 * (t * 1.7 + 0.3).cos(),
            1.5 * (t * 2.3 + 1.1).sin(),
            1.0 * (t * 0.5 + 0.7).cos(),
            0.8 * (t * 3.1).sin(),
        ));
    }
    text.push_str(
        "\n Annual Factors: January-December\n\
         ,Mkt-RF,SMB,HML,RMW,CMA,RF\n\
         2020,1,2,3,4,5,6\n",
    );
    text
}

#[tokio::test]
async fn file_factors_and_prices_feed_the_regression() {
    let path = std::env::temp_dir().join(format!("ff5-factors-{}.csv", std::process::id()));
    std::fs::write(&path, factor_csv(36)).unwrap();

    let source = FactorFile::new(&path);
    let text = source.fetch_factor_csv(Frequency::Monthly).await.unwrap();
    std::fs::remove_file(&path).ok();

    let table = parse_factor_csv(&text, Frequency::Monthly).unwrap();
    assert_eq!(table.len(), 36);

    // Build month-end prices whose returns load 1.0 on the market and 0.5 on SMB.
    let mut close = 100.0;
    let mut points = vec![PricePoint {
        date: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
        close,
    }];
    for (date, row) in &table {
        let ret = row.risk_free + 0.002 + row.market_excess + 0.5 * row.size;
        close *= 1.0 + ret;
        let month_end =
            date.checked_add_months(chrono::Months::new(1)).unwrap().pred_opt().unwrap();
        points.push(PricePoint {
            date: month_end,
            close,
        });
    }

    let stock = simple_returns(&points, Frequency::Monthly).unwrap();
    assert_eq!(stock.len(), 36);

    let range = DateRange::new(month(6), month(35)).unwrap();
    let factors = restrict_to_range(&table, range, Frequency::Monthly);

    let sample = align(&stock, &factors).unwrap();
    assert_eq!(sample.len(), 30);

    let result = fit(&sample).unwrap();
    assert!((result.intercept() - 0.002).abs() < 1e-8);
    assert!((result.betas()[&ff5_model::Factor::MktRf] - 1.0).abs() < 1e-8);
    assert!((result.betas()[&ff5_model::Factor::Smb] - 0.5).abs() < 1e-8);
}

#[tokio::test]
async fn cached_file_source_serves_second_read_from_cache() {
    let path = std::env::temp_dir().join(format!("ff5-cached-{}.csv", std::process::id()));
    std::fs::write(&path, factor_csv(3)).unwrap();

    let cache = shared(AcquisitionCache::in_memory().unwrap());
    let source =
        CachedFactorSource::new(FactorFile::new(&path), cache.clone(), CachePolicy::default());

    let first = source.fetch_factor_csv(Frequency::Monthly).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    // The file is gone; only the cache can answer.
    let second = source.fetch_factor_csv(Frequency::Monthly).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.lock().unwrap().get_stats().unwrap().entries, 1);
}
