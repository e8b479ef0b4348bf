//! Statistical summary of a five-factor regression.
//!
//! The layout follows the familiar OLS summary: a two-column block of model
//! diagnostics, the coefficient table, then residual diagnostics.

use ff5_model::{RegressionResult, TermStatistics};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the plain-text summary.
const WIDTH: usize = 78;

/// The one-line alpha headline, e.g. `Alpha (Intercept): 0.0021 per period`.
pub fn alpha_headline(result: &RegressionResult) -> String {
    format!("Alpha (Intercept): {:.4} per period", result.intercept())
}

/// A regression result with the labels needed to present it.
///
/// # Examples
///
/// ```
/// use ff5_output::RegressionSummary;
/// # use ff5_model::{FactorRow, align, fit};
/// # use std::collections::BTreeMap;
/// # let stock: BTreeMap<u32, f64> = (0..24).map(|i| (i, 0.01 * f64::from(i % 5))).collect();
/// # let factors: BTreeMap<u32, FactorRow> = (0..24)
/// #     .map(|i| {
/// #         let t = f64::from(i);
/// #         (i, FactorRow::new(0.01 * t.sin(), 0.004 * t.cos(), 0.003 * (2.0 * t).sin(),
/// #                            0.002 * (3.0 * t).cos(), 0.001 * (0.5 * t).sin(), 0.0002))
/// #     })
/// #     .collect();
/// # let result = fit(&align(&stock, &factors).unwrap()).unwrap();
///
/// let summary = RegressionSummary::new("AAPL", result).with_period("2020-01", "2021-12");
///
/// let table = summary.to_ascii_table();
/// assert!(table.contains("OLS Regression Results"));
/// assert!(table.contains("Mkt-RF"));
/// assert!(summary.headline().starts_with("Alpha (Intercept): "));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSummary {
    /// Security or portfolio the regression was run for.
    pub name: String,

    /// First and last period of the sample, if known.
    pub period: Option<(String, String)>,

    /// The fitted model.
    pub result: RegressionResult,
}

impl RegressionSummary {
    /// Create a summary for `result`.
    pub fn new(name: impl Into<String>, result: RegressionResult) -> Self {
        Self {
            name: name.into(),
            period: None,
            result,
        }
    }

    /// Attach the sample period.
    pub fn with_period(mut self, start: impl fmt::Display, end: impl fmt::Display) -> Self {
        self.period = Some((start.to_string(), end.to_string()));
        self
    }

    /// The alpha headline.
    pub fn headline(&self) -> String {
        alpha_headline(&self.result)
    }

    /// Column labels for the confidence bounds, e.g. `[0.025` and `0.975]`.
    fn interval_labels(&self) -> (String, String) {
        let tail = (1.0 - self.result.confidence_level) / 2.0;
        (format!("[{tail:.3}"), format!("{:.3}]", 1.0 - tail))
    }

    fn diagnostic_rows(&self) -> [(&'static str, String, &'static str, String); 7] {
        let r = &self.result;
        [
            ("Dep. Variable:", "Excess".to_string(), "R-squared:", format!("{:.3}", r.r_squared)),
            ("Model:", "OLS".to_string(), "Adj. R-squared:", format!("{:.3}", r.adj_r_squared)),
            (
                "Method:",
                "Least Squares".to_string(),
                "F-statistic:",
                optional(r.f_statistic, |v| format!("{v:.4}")),
            ),
            (
                "No. Observations:",
                r.n_observations.to_string(),
                "Prob (F-statistic):",
                optional(r.f_p_value, |v| format!("{v:.3e}")),
            ),
            (
                "Df Residuals:",
                r.df_residual.to_string(),
                "Log-Likelihood:",
                format!("{:.3}", r.log_likelihood),
            ),
            ("Df Model:", (r.terms.len() - 1).to_string(), "AIC:", format!("{:.4}", r.aic)),
            ("Covariance Type:", "nonrobust".to_string(), "BIC:", format!("{:.4}", r.bic)),
        ]
    }

    /// Format as an ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let r = &self.result;

        output.push_str(&format!("{:^WIDTH$}\n", "OLS Regression Results"));
        if let Some((start, end)) = &self.period {
            let title = format!("{}: {} to {}", self.name, start, end);
            output.push_str(&format!("{title:^WIDTH$}\n"));
        } else if !self.name.is_empty() {
            output.push_str(&format!("{:^WIDTH$}\n", self.name));
        }
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        for (left, left_value, right, right_value) in self.diagnostic_rows() {
            output.push_str(&format!(
                "{left:<20}{left_value:>16}   {right:<22}{right_value:>17}\n"
            ));
        }
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        let (lower, upper) = self.interval_labels();
        output.push_str(&format!(
            "{:<10}{:>11}{:>11}{:>11}{:>11}{:>12}{:>12}\n",
            "", "coef", "std err", "t", "P>|t|", lower, upper
        ));
        output.push_str(&"-".repeat(WIDTH));
        output.push('\n');
        for term in &r.terms {
            output.push_str(&term_row(term));
        }
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        output.push_str(&format!(
            "{:<20}{:>16}   {:<22}{:>17}\n",
            "Durbin-Watson:",
            optional(r.durbin_watson, |v| format!("{v:.3}")),
            "Residual Std. Error:",
            format!("{:.6}", r.residual_std_error)
        ));
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let r = &self.result;

        output.push_str(&format!("# Five-Factor Regression: {}\n\n", self.name));
        if let Some((start, end)) = &self.period {
            output.push_str(&format!("**Period:** {start} to {end}\n\n"));
        }
        output.push_str(&format!("**{}**\n\n", self.headline()));

        output.push_str("## Model\n\n");
        output.push_str("| Statistic | Value |\n");
        output.push_str("|-----------|-------|\n");
        for (left, left_value, right, right_value) in self.diagnostic_rows() {
            output.push_str(&format!("| {} | {} |\n", left.trim_end_matches(':'), left_value));
            output.push_str(&format!("| {} | {} |\n", right.trim_end_matches(':'), right_value));
        }
        output.push_str(&format!(
            "| Durbin-Watson | {} |\n",
            optional(r.durbin_watson, |v| format!("{v:.3}"))
        ));
        output.push_str(&format!("| Residual Std. Error | {:.6} |\n\n", r.residual_std_error));

        let (lower, upper) = self.interval_labels();
        output.push_str("## Coefficients\n\n");
        output.push_str(&format!(
            "| Term | coef | std err | t | P>\\|t\\| | {lower} | {upper} |\n"
        ));
        output.push_str("|------|------|---------|---|--------|------|------|\n");
        for t in &r.terms {
            output.push_str(&format!(
                "| {} | {:.4} | {:.4} | {:.3} | {:.3} | {:.4} | {:.4} |\n",
                t.term, t.coefficient, t.std_error, t.t_stat, t.p_value, t.ci_lower, t.ci_upper
            ));
        }

        output
    }
}

impl fmt::Display for RegressionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        writeln!(f, "Five-Factor Regression: {} ({} periods)", self.name, r.n_observations)?;
        writeln!(f, "  {}", self.headline())?;
        for t in r.factor_terms() {
            writeln!(f, "  {:<7} {:>9.4}  (t = {:.2})", t.term, t.coefficient, t.t_stat)?;
        }
        writeln!(f, "  R-squared: {:.3}", r.r_squared)?;
        Ok(())
    }
}

fn term_row(t: &TermStatistics) -> String {
    format!(
        "{:<10}{:>11.4}{:>11.4}{:>11.3}{:>11.3}{:>12.4}{:>12.4}\n",
        t.term.label(),
        t.coefficient,
        t.std_error,
        t.t_stat,
        t.p_value,
        t.ci_lower,
        t.ci_upper
    )
}

fn optional(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| "n/a".to_string(), render)
}
