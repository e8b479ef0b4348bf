//! Regression output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::factor::{Factor, Term};

/// Estimate and inference statistics for one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermStatistics {
    /// Which coefficient
    pub term: Term,
    /// OLS estimate
    pub coefficient: f64,
    /// Standard error
    pub std_error: f64,
    /// t-statistic (coefficient / standard error)
    pub t_stat: f64,
    /// Two-sided p-value from Student's t with the residual degrees of freedom
    pub p_value: f64,
    /// Lower confidence bound
    pub ci_lower: f64,
    /// Upper confidence bound
    pub ci_upper: f64,
}

impl TermStatistics {
    /// Whether the coefficient is significant at level `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Output of one five-factor OLS fit.
///
/// `terms` always holds six entries in design-matrix order: the intercept
/// followed by Mkt-RF, SMB, HML, RMW and CMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Per-coefficient statistics, intercept first
    pub terms: Vec<TermStatistics>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// R-squared adjusted for the number of regressors
    pub adj_r_squared: f64,
    /// F-statistic for the joint significance of the five factors
    pub f_statistic: Option<f64>,
    /// p-value of the F-statistic
    pub f_p_value: Option<f64>,
    /// Square root of the residual variance
    pub residual_std_error: f64,
    /// Durbin-Watson statistic of the residuals
    pub durbin_watson: Option<f64>,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Number of observations
    pub n_observations: usize,
    /// Residual degrees of freedom (n - 6)
    pub df_residual: usize,
    /// Confidence level used for the intervals
    pub confidence_level: f64,
    /// Residuals, one per observation
    pub residuals: Vec<f64>,
    /// Fitted excess returns, one per observation
    pub fitted: Vec<f64>,
}

impl RegressionResult {
    /// Statistics for one term.
    pub fn term(&self, term: Term) -> &TermStatistics {
        &self.terms[term.column()]
    }

    /// The intercept (alpha), in return units per period.
    pub fn intercept(&self) -> f64 {
        self.term(Term::Intercept).coefficient
    }

    /// Loading on one factor.
    pub fn beta(&self, factor: Factor) -> f64 {
        self.term(Term::Factor(factor)).coefficient
    }

    /// Loadings keyed by factor.
    pub fn betas(&self) -> BTreeMap<Factor, f64> {
        Factor::ALL.into_iter().map(|f| (f, self.beta(f))).collect()
    }

    /// Standard errors keyed by term, intercept included.
    pub fn standard_errors(&self) -> BTreeMap<Term, f64> {
        self.terms.iter().map(|t| (t.term, t.std_error)).collect()
    }

    /// t-statistics keyed by term.
    pub fn t_stats(&self) -> BTreeMap<Term, f64> {
        self.terms.iter().map(|t| (t.term, t.t_stat)).collect()
    }

    /// p-values keyed by term.
    pub fn p_values(&self) -> BTreeMap<Term, f64> {
        self.terms.iter().map(|t| (t.term, t.p_value)).collect()
    }

    /// Factor statistics only, in design order.
    pub fn factor_terms(&self) -> &[TermStatistics] {
        &self.terms[1..]
    }

    /// Sum of squared residuals.
    pub fn sum_squared_residuals(&self) -> f64 {
        self.residuals.iter().map(|e| e * e).sum()
    }
}
