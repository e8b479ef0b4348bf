//! Ordinary least squares fit of excess returns on the five factors.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

use crate::error::ModelError;
use crate::excess::excess_response;
use crate::factor::{Factor, Term};
use crate::linalg::{invert, reciprocal_condition, scale_to_unit_diagonal, unscale_inverse};
use crate::result::{RegressionResult, TermStatistics};
use crate::sample::AlignedSample;

/// Number of design columns: intercept plus five factors.
pub const NUM_TERMS: usize = 6;

/// Options for the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Confidence level for coefficient intervals (default: 0.95)
    pub confidence_level: f64,
    /// Reciprocal condition number of the unit-diagonal `X'X` below which the
    /// design is treated as singular (default: 1e-12)
    pub singular_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            singular_tolerance: 1e-12,
        }
    }
}

/// Design matrix and response for one fit.
///
/// Invariants: the design has [`NUM_TERMS`] columns, its first column is all
/// ones, and its row count equals the response length.
#[derive(Debug, Clone)]
pub struct RegressionInput {
    design: Array2<f64>,
    response: Array1<f64>,
}

impl RegressionInput {
    /// Build `X = [1, Mkt-RF, SMB, HML, RMW, CMA]` and `y = excess returns`.
    pub fn from_sample<K>(sample: &AlignedSample<K>) -> Self {
        let n = sample.len();
        let mut design = Array2::<f64>::zeros((n, NUM_TERMS));
        for (i, obs) in sample.iter().enumerate() {
            design[[i, 0]] = 1.0;
            for factor in Factor::ALL {
                design[[i, Term::Factor(factor).column()]] = obs.factor(factor);
            }
        }
        Self {
            design,
            response: excess_response(sample),
        }
    }

    /// The `(n, 6)` design matrix.
    pub const fn design(&self) -> &Array2<f64> {
        &self.design
    }

    /// The response vector of excess returns.
    pub const fn response(&self) -> &Array1<f64> {
        &self.response
    }

    /// Number of observations.
    pub fn n_observations(&self) -> usize {
        self.response.len()
    }
}

/// Fit the five-factor model with default options.
///
/// # Errors
/// `InsufficientData` when the sample has no residual degrees of freedom,
/// `SingularMatrix` when `X'X` is not invertible.
pub fn fit<K>(aligned: &AlignedSample<K>) -> Result<RegressionResult, ModelError> {
    fit_with(aligned, &FitOptions::default())
}

/// Fit the five-factor model.
///
/// # Errors
/// See [`fit`]; additionally `InvalidConfidenceLevel` for a level outside
/// (0, 1).
pub fn fit_with<K>(
    aligned: &AlignedSample<K>,
    options: &FitOptions,
) -> Result<RegressionResult, ModelError> {
    fit_input(&RegressionInput::from_sample(aligned), options)
}

/// Fit a prepared regression input.
///
/// Check order: too few rows for the column count, then rank, then zero
/// residual degrees of freedom.
///
/// # Errors
/// See [`fit_with`].
pub fn fit_input(
    input: &RegressionInput,
    options: &FitOptions,
) -> Result<RegressionResult, ModelError> {
    if !(options.confidence_level > 0.0 && options.confidence_level < 1.0) {
        return Err(ModelError::InvalidConfidenceLevel(options.confidence_level));
    }

    let x = input.design();
    let y = input.response();
    let n = y.len();
    let p = x.ncols();

    if n < p {
        return Err(ModelError::InsufficientData {
            required: p + 1,
            actual: n,
        });
    }

    let xtx_inv = gram_inverse(x, options.singular_tolerance)?;

    if n == p {
        return Err(ModelError::InsufficientData {
            required: p + 1,
            actual: n,
        });
    }
    let df = n - p;

    let beta = xtx_inv.dot(&x.t().dot(y));
    let fitted = x.dot(&beta);
    let residuals = y - &fitted;

    let ssr: f64 = residuals.iter().map(|e| e * e).sum();
    let sigma2 = ssr / df as f64;

    let y_mean = y.mean().unwrap_or(0.0);
    let sst: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let r_squared = if sst > 0.0 { (1.0 - ssr / sst).clamp(0.0, 1.0) } else { 0.0 };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df as f64;

    let t_dist = StudentsT::new(0.0, 1.0, df as f64)
        .map_err(|e| ModelError::Distribution(e.to_string()))?;
    let t_crit = t_dist.inverse_cdf(1.0 - (1.0 - options.confidence_level) / 2.0);

    let terms = Term::ALL
        .iter()
        .map(|&term| {
            let j = term.column();
            let coefficient = beta[j];
            let std_error = (sigma2 * xtx_inv[[j, j]]).max(0.0).sqrt();
            let t_stat = t_statistic(coefficient, std_error);
            TermStatistics {
                term,
                coefficient,
                std_error,
                t_stat,
                p_value: two_sided_p_value(&t_dist, t_stat),
                ci_lower: coefficient - t_crit * std_error,
                ci_upper: coefficient + t_crit * std_error,
            }
        })
        .collect();

    let (f_statistic, f_p_value) = f_test(r_squared, sst, ssr, p - 1, df)?;

    let durbin_watson = (ssr > 0.0).then(|| {
        residuals.windows(2).into_iter().map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / ssr
    });

    let nf = n as f64;
    let log_likelihood =
        -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * p as f64;
    let bic = -2.0 * log_likelihood + p as f64 * nf.ln();

    debug!(n, df, r_squared, "fitted five-factor regression");

    Ok(RegressionResult {
        terms,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        residual_std_error: sigma2.sqrt(),
        durbin_watson,
        log_likelihood,
        aic,
        bic,
        n_observations: n,
        df_residual: df,
        confidence_level: options.confidence_level,
        residuals: residuals.to_vec(),
        fitted: fitted.to_vec(),
    })
}

/// `(X'X)^-1`, refusing rank-deficient designs.
fn gram_inverse(x: &Array2<f64>, singular_tolerance: f64) -> Result<Array2<f64>, ModelError> {
    let xtx = x.t().dot(x);

    let (scaled, inv_sqrt) =
        scale_to_unit_diagonal(&xtx).map_err(|col| ModelError::SingularMatrix {
            reason: format!("column `{}` is identically zero", term_label(col)),
        })?;

    let rcond = reciprocal_condition(&scaled);
    debug!(rcond, "reciprocal condition number of scaled X'X");
    if rcond < singular_tolerance {
        return Err(ModelError::SingularMatrix {
            reason: format!(
                "reciprocal condition number {rcond:.3e} is below {singular_tolerance:.0e}; \
                 a factor column is constant or collinear with others"
            ),
        });
    }

    let scaled_inv = invert(&scaled, singular_tolerance).ok_or_else(|| ModelError::SingularMatrix {
        reason: "vanishing pivot while inverting X'X".to_string(),
    })?;

    Ok(unscale_inverse(&scaled_inv, &inv_sqrt))
}

fn term_label(column: usize) -> &'static str {
    Term::ALL.get(column).map_or("?", Term::label)
}

fn t_statistic(coefficient: f64, std_error: f64) -> f64 {
    if std_error > 0.0 {
        coefficient / std_error
    } else if coefficient == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(coefficient)
    }
}

fn two_sided_p_value(dist: &StudentsT, t_stat: f64) -> f64 {
    if !t_stat.is_finite() {
        return 0.0;
    }
    (2.0 * (1.0 - dist.cdf(t_stat.abs()))).clamp(0.0, 1.0)
}

/// Joint F-test of all slope coefficients; `None` when undefined.
fn f_test(
    r_squared: f64,
    sst: f64,
    ssr: f64,
    df_model: usize,
    df_resid: usize,
) -> Result<(Option<f64>, Option<f64>), ModelError> {
    if sst <= 0.0 || ssr <= 0.0 {
        return Ok((None, None));
    }
    let f = (r_squared / df_model as f64) / ((1.0 - r_squared) / df_resid as f64);
    let dist = FisherSnedecor::new(df_model as f64, df_resid as f64)
        .map_err(|e| ModelError::Distribution(e.to_string()))?;
    Ok((Some(f), Some((1.0 - dist.cdf(f)).clamp(0.0, 1.0))))
}

/// Sum over rows of `residual * design column`, one value per column.
///
/// Zero up to rounding for an OLS fit (the normal equations).
pub fn residual_cross_products(input: &RegressionInput, residuals: &[f64]) -> Vec<f64> {
    let e = Array1::from(residuals.to_vec());
    input.design().axis_iter(Axis(1)).map(|column| column.dot(&e)).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::factor::FactorRow;
    use crate::sample::PeriodObservation;

    /// Excess return generated exactly by known loadings, plus a small
    /// deterministic disturbance.
    fn synthetic_sample(n: usize, noise: f64) -> AlignedSample<usize> {
        let alpha = 0.002;
        let betas = [1.1, 0.4, -0.3, 0.2, 0.1];
        let rows = (0..n)
            .map(|i| {
                let t = i as f64;
                let row = FactorRow::new(
                    0.01 * (t * 0.7).sin(),
                    0.008 * (t * 1.3 + 0.5).cos(),
                    0.006 * (t * 2.1 + 1.0).sin(),
                    0.005 * (t * 0.4 + 2.0).cos(),
                    0.004 * (t * 3.3 + 0.2).sin(),
                    0.0002,
                );
                let systematic: f64 = Factor::ALL
                    .iter()
                    .map(|&f| betas[f.index()] * row.factor(f))
                    .sum();
                let disturbance = noise * (t * 5.7 + 0.3).sin();
                let stock = row.risk_free + alpha + systematic + disturbance;
                PeriodObservation::from_row(i, stock, &row)
            })
            .collect();
        AlignedSample::new(rows).unwrap()
    }

    #[test]
    fn recovers_exact_loadings() {
        let result = fit(&synthetic_sample(40, 0.0)).unwrap();

        assert_relative_eq!(result.intercept(), 0.002, epsilon = 1e-10);
        assert_relative_eq!(result.beta(Factor::MktRf), 1.1, epsilon = 1e-8);
        assert_relative_eq!(result.beta(Factor::Smb), 0.4, epsilon = 1e-8);
        assert_relative_eq!(result.beta(Factor::Hml), -0.3, epsilon = 1e-8);
        assert_relative_eq!(result.beta(Factor::Rmw), 0.2, epsilon = 1e-8);
        assert_relative_eq!(result.beta(Factor::Cma), 0.1, epsilon = 1e-8);
        assert_relative_eq!(result.r_squared, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn noisy_fit_has_sensible_statistics() {
        let result = fit(&synthetic_sample(60, 0.002)).unwrap();

        assert_eq!(result.n_observations, 60);
        assert_eq!(result.df_residual, 54);
        assert_eq!(result.terms.len(), NUM_TERMS);
        assert_eq!(result.residuals.len(), 60);
        assert_eq!(result.fitted.len(), 60);
        assert!(result.r_squared > 0.5 && result.r_squared < 1.0);
        assert!(result.adj_r_squared < result.r_squared);

        for term in &result.terms {
            assert!(term.std_error > 0.0);
            assert!((0.0..=1.0).contains(&term.p_value));
            assert!(term.ci_lower < term.coefficient && term.coefficient < term.ci_upper);
            assert_relative_eq!(term.t_stat, term.coefficient / term.std_error, epsilon = 1e-12);
        }

        // The market loading dominates and is clearly significant.
        assert!(result.term(Term::Factor(Factor::MktRf)).is_significant(0.01));
        assert!(result.f_statistic.unwrap() > 0.0);
        assert!(result.f_p_value.unwrap() < 0.01);
        let dw = result.durbin_watson.unwrap();
        assert!((0.0..=4.0).contains(&dw));
    }

    #[test]
    fn residual_std_error_matches_definition() {
        let result = fit(&synthetic_sample(30, 0.003)).unwrap();
        let expected = (result.sum_squared_residuals() / 24.0).sqrt();
        assert_relative_eq!(result.residual_std_error, expected, epsilon = 1e-15);
    }

    #[test]
    fn information_criteria_follow_log_likelihood() {
        let result = fit(&synthetic_sample(30, 0.003)).unwrap();
        assert_relative_eq!(result.aic, -2.0 * result.log_likelihood + 12.0, epsilon = 1e-9);
        assert_relative_eq!(
            result.bic,
            -2.0 * result.log_likelihood + 6.0 * 30f64.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn seven_rows_is_the_minimum() {
        assert!(fit(&synthetic_sample(7, 0.001)).is_ok());
        let err = fit(&synthetic_sample(6, 0.001)).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 7,
                actual: 6,
            }
        );
        let err = fit(&synthetic_sample(3, 0.001)).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 7,
                actual: 3,
            }
        );
    }

    #[test]
    fn rejects_invalid_confidence_level() {
        let options = FitOptions {
            confidence_level: 1.0,
            ..FitOptions::default()
        };
        let err = fit_with(&synthetic_sample(20, 0.001), &options).unwrap_err();
        assert_eq!(err, ModelError::InvalidConfidenceLevel(1.0));
    }

    #[test]
    fn wider_confidence_gives_wider_intervals() {
        let sample = synthetic_sample(25, 0.002);
        let at = |confidence_level| FitOptions {
            confidence_level,
            ..FitOptions::default()
        };
        let narrow = fit_with(&sample, &at(0.9)).unwrap();
        let wide = fit_with(&sample, &at(0.99)).unwrap();
        for (n, w) in narrow.terms.iter().zip(&wide.terms) {
            assert!(w.ci_upper - w.ci_lower > n.ci_upper - n.ci_lower);
        }
    }

    #[test]
    fn design_matrix_invariants() {
        let sample = synthetic_sample(12, 0.001);
        let input = RegressionInput::from_sample(&sample);
        assert_eq!(input.design().dim(), (12, NUM_TERMS));
        assert_eq!(input.n_observations(), 12);
        assert!(input.design().column(0).iter().all(|&v| v == 1.0));
        for (i, obs) in sample.iter().enumerate() {
            assert_eq!(input.design()[[i, 2]], obs.size_factor);
            assert_eq!(input.response()[i], obs.excess_return());
        }
    }

    #[test]
    fn fit_does_not_mutate_sample() {
        let sample = synthetic_sample(15, 0.002);
        let before = sample.clone();
        let _ = fit(&sample).unwrap();
        assert_eq!(sample, before);
    }
}
