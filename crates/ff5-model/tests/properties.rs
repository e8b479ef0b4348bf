//! Behavioural tests for alignment and the OLS engine.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use ff5_model::{
    AlignedSample, Factor, FactorRow, ModelError, PeriodObservation, RegressionInput, align,
    compute_excess, fit, fit_input, residual_cross_products,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rstest::rstest;

fn random_sample(n: usize, seed: u64) -> AlignedSample<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..n)
        .map(|i| {
            let row = FactorRow::new(
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.03..0.03),
                rng.gen_range(-0.03..0.03),
                rng.gen_range(-0.02..0.02),
                rng.gen_range(-0.02..0.02),
                rng.gen_range(0.0..0.004),
            );
            PeriodObservation::from_row(i, rng.gen_range(-0.1..0.1), &row)
        })
        .collect();
    AlignedSample::new(rows).unwrap()
}

fn sample_from_columns(stock: &[f64], rf: &[f64], columns: [&[f64]; 5]) -> AlignedSample<usize> {
    let rows = (0..stock.len())
        .map(|i| {
            let row = FactorRow::new(
                columns[0][i],
                columns[1][i],
                columns[2][i],
                columns[3][i],
                columns[4][i],
                rf[i],
            );
            PeriodObservation::from_row(i, stock[i], &row)
        })
        .collect();
    AlignedSample::new(rows).unwrap()
}

#[rstest]
#[case(7, 1)]
#[case(12, 2)]
#[case(60, 3)]
#[case(250, 4)]
fn residuals_are_orthogonal_to_every_design_column(#[case] n: usize, #[case] seed: u64) {
    let sample = random_sample(n, seed);
    let result = fit(&sample).unwrap();
    let input = RegressionInput::from_sample(&sample);

    for cross in residual_cross_products(&input, &result.residuals) {
        assert_abs_diff_eq!(cross, 0.0, epsilon = 1e-12);
    }
    assert!((0.0..=1.0).contains(&result.r_squared));
    assert_eq!(result.residuals.len(), n);
}

#[test]
fn shift_by_regressors_moves_loadings_not_residuals() {
    let sample = random_sample(40, 11);
    let base = fit(&sample).unwrap();

    // y + 0.3*Mkt-RF - 0.7*CMA + 0.01 changes the loadings by exactly that
    // combination and leaves the residuals alone.
    let shifted_rows = sample
        .iter()
        .map(|obs| {
            let mut shifted = obs.clone();
            shifted.stock_return += 0.3 * obs.market_excess - 0.7 * obs.investment_factor + 0.01;
            shifted
        })
        .collect();
    let shifted = fit(&AlignedSample::new(shifted_rows).unwrap()).unwrap();

    assert_abs_diff_eq!(
        shifted.beta(Factor::MktRf),
        base.beta(Factor::MktRf) + 0.3,
        epsilon = 1e-10
    );
    assert_abs_diff_eq!(shifted.beta(Factor::Cma), base.beta(Factor::Cma) - 0.7, epsilon = 1e-10);
    assert_abs_diff_eq!(shifted.intercept(), base.intercept() + 0.01, epsilon = 1e-10);
    assert_abs_diff_eq!(
        shifted.sum_squared_residuals(),
        base.sum_squared_residuals(),
        epsilon = 1e-14
    );

    // R-squared changes with the response variance, so compare a refit on a
    // shift that keeps the total sum of squares: a pure intercept shift.
    let intercept_rows = sample
        .iter()
        .map(|obs| {
            let mut shifted = obs.clone();
            shifted.stock_return += 0.05;
            shifted
        })
        .collect();
    let intercept_shift = fit(&AlignedSample::new(intercept_rows).unwrap()).unwrap();
    assert_abs_diff_eq!(intercept_shift.r_squared, base.r_squared, epsilon = 1e-12);
}

#[test]
fn identical_factor_columns_are_singular() {
    let sample = random_sample(30, 5);
    let rows = sample
        .iter()
        .map(|obs| {
            let mut dup = obs.clone();
            dup.value_factor = dup.size_factor;
            dup
        })
        .collect();

    let err = fit(&AlignedSample::new(rows).unwrap()).unwrap_err();
    assert!(matches!(err, ModelError::SingularMatrix { .. }), "got {err:?}");
}

#[test]
fn constant_factor_column_is_singular() {
    // A constant column duplicates the intercept.
    let rows = random_sample(30, 6)
        .iter()
        .map(|obs| {
            let mut constant = obs.clone();
            constant.profitability_factor = 0.004;
            constant
        })
        .collect();

    let err = fit(&AlignedSample::new(rows).unwrap()).unwrap_err();
    assert!(matches!(err, ModelError::SingularMatrix { .. }), "got {err:?}");
}

#[test]
fn market_only_sample_with_zero_factor_columns_is_singular() {
    let zeros = [0.0; 6];
    let sample = sample_from_columns(
        &[0.02, -0.01, 0.03, 0.00, 0.01, 0.015],
        &[0.001; 6],
        [&[0.015, -0.005, 0.02, 0.001, 0.008, 0.01], &zeros, &zeros, &zeros, &zeros],
    );

    let err = fit(&sample).unwrap_err();
    assert!(matches!(err, ModelError::SingularMatrix { .. }), "got {err:?}");
    assert!(err.to_string().contains("SMB"));
}

#[test]
fn two_periods_are_insufficient() {
    let sample = random_sample(2, 7);
    let err = fit(&sample).unwrap_err();
    assert_eq!(
        err,
        ModelError::InsufficientData {
            required: 7,
            actual: 2,
        }
    );
}

#[test]
fn six_nonsingular_periods_leave_no_degrees_of_freedom() {
    let sample = random_sample(6, 8);
    let input = RegressionInput::from_sample(&sample);
    let err = fit_input(&input, &Default::default()).unwrap_err();
    assert_eq!(
        err,
        ModelError::InsufficientData {
            required: 7,
            actual: 6,
        }
    );
}

#[test]
fn align_then_fit_on_calendar_months() {
    use chrono::NaiveDate;

    let month = |i: u32| NaiveDate::from_ymd_opt(2020 + (i / 12) as i32, i % 12 + 1, 1).unwrap();
    let mut rng = StdRng::seed_from_u64(21);

    let factors: BTreeMap<NaiveDate, FactorRow> = (0..36)
        .map(|i| {
            let row = FactorRow::new(
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.03..0.03),
                rng.gen_range(-0.03..0.03),
                rng.gen_range(-0.02..0.02),
                rng.gen_range(-0.02..0.02),
                0.001,
            );
            (month(i), row)
        })
        .collect();
    // The stock series starts six months later than the factor table.
    let stock: BTreeMap<NaiveDate, f64> = factors
        .iter()
        .skip(6)
        .map(|(date, row)| (*date, 0.001 + 0.003 + 1.2 * row.market_excess - 0.4 * row.value))
        .collect();

    let sample = align(&stock, &factors).unwrap();
    assert_eq!(sample.len(), 30);
    assert_eq!(*sample.first_period(), month(6));

    let excess = compute_excess(&sample);
    assert_eq!(excess, compute_excess(&sample));

    let result = fit(&sample).unwrap();
    assert_abs_diff_eq!(result.intercept(), 0.003, epsilon = 1e-10);
    assert_abs_diff_eq!(result.beta(Factor::MktRf), 1.2, epsilon = 1e-9);
    assert_abs_diff_eq!(result.beta(Factor::Hml), -0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(result.beta(Factor::Smb), 0.0, epsilon = 1e-9);
}
