//! Horizontal bar chart of the factor loadings.

use ff5_model::{Factor, RegressionResult};

/// Renders the five betas as bars around a vertical axis.
///
/// Each bar is scaled by `|beta| / max |beta|`; negative loadings extend to
/// the left of the axis and positive ones to the right.
///
/// ```text
/// Mkt-RF                         |############################## +1.1000
/// SMB                   #########|                               -0.3500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetaChart {
    /// Characters available on each side of the axis.
    pub half_width: usize,

    /// Character the bars are drawn with.
    pub fill: char,
}

impl Default for BetaChart {
    fn default() -> Self {
        Self {
            half_width: 30,
            fill: '#',
        }
    }
}

impl BetaChart {
    /// Chart with `half_width` characters on each side of the axis.
    pub const fn with_half_width(half_width: usize) -> Self {
        Self {
            half_width,
            fill: '#',
        }
    }

    /// Bar length for `beta` when the largest loading magnitude is `max_abs`.
    fn bar_len(&self, beta: f64, max_abs: f64) -> usize {
        if !(max_abs.is_finite() && max_abs > 0.0 && beta.is_finite()) {
            return 0;
        }
        let scaled = (beta.abs() / max_abs * self.half_width as f64).round();
        (scaled as usize).min(self.half_width)
    }

    /// Render one line per factor, in design order.
    pub fn render(&self, result: &RegressionResult) -> String {
        let betas: Vec<(Factor, f64)> =
            Factor::ALL.into_iter().map(|f| (f, result.beta(f))).collect();
        let max_abs = betas
            .iter()
            .map(|(_, b)| b.abs())
            .filter(|b| b.is_finite())
            .fold(0.0, f64::max);
        let w = self.half_width;

        let mut output = String::new();
        for (factor, beta) in betas {
            let bar: String = std::iter::repeat_n(self.fill, self.bar_len(beta, max_abs)).collect();
            let (left, right) = if beta < 0.0 {
                (bar, String::new())
            } else {
                (String::new(), bar)
            };
            output.push_str(&format!("{:<7}{left:>w$}|{right:<w$} {beta:+.4}\n", factor.label()));
        }
        output
    }
}

/// Render the betas with the default chart settings.
pub fn beta_chart(result: &RegressionResult) -> String {
    BetaChart::default().render(result)
}
