//! Factor and regression-term definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five Fama-French factors.
///
/// Declaration order is the design-matrix column order after the intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    /// Market excess return (market minus risk-free).
    #[serde(rename = "Mkt-RF")]
    MktRf,
    /// Size: small minus big.
    #[serde(rename = "SMB")]
    Smb,
    /// Value: high minus low book-to-market.
    #[serde(rename = "HML")]
    Hml,
    /// Profitability: robust minus weak.
    #[serde(rename = "RMW")]
    Rmw,
    /// Investment: conservative minus aggressive.
    #[serde(rename = "CMA")]
    Cma,
}

impl Factor {
    /// All factors in design-matrix order.
    pub const ALL: [Self; 5] = [Self::MktRf, Self::Smb, Self::Hml, Self::Rmw, Self::Cma];

    /// Column label as published in the French data library.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MktRf => "Mkt-RF",
            Self::Smb => "SMB",
            Self::Hml => "HML",
            Self::Rmw => "RMW",
            Self::Cma => "CMA",
        }
    }

    /// Short description of what the factor captures.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::MktRf => "market",
            Self::Smb => "size",
            Self::Hml => "value",
            Self::Rmw => "profitability",
            Self::Cma => "investment",
        }
    }

    /// Zero-based position among the five factors.
    pub const fn index(&self) -> usize {
        match self {
            Self::MktRf => 0,
            Self::Smb => 1,
            Self::Hml => 2,
            Self::Rmw => 3,
            Self::Cma => 4,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|factor| factor.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown factor: {trimmed}"))
    }
}

/// A coefficient in the fitted model: the intercept or a factor loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Term {
    /// The constant column (alpha).
    Intercept,
    /// A factor loading (beta).
    Factor(Factor),
}

impl Term {
    /// All terms in design-matrix column order.
    pub const ALL: [Self; 6] = [
        Self::Intercept,
        Self::Factor(Factor::MktRf),
        Self::Factor(Factor::Smb),
        Self::Factor(Factor::Hml),
        Self::Factor(Factor::Rmw),
        Self::Factor(Factor::Cma),
    ];

    /// Label used in summaries; the intercept is `const`.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Intercept => "const",
            Self::Factor(factor) => factor.label(),
        }
    }

    /// Column index in the design matrix.
    pub const fn column(&self) -> usize {
        match self {
            Self::Intercept => 0,
            Self::Factor(factor) => factor.index() + 1,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("const") || trimmed.eq_ignore_ascii_case("intercept") {
            return Ok(Self::Intercept);
        }
        trimmed.parse().map(Self::Factor)
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        term.label().to_string()
    }
}

impl TryFrom<String> for Term {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Factor> for Term {
    fn from(factor: Factor) -> Self {
        Self::Factor(factor)
    }
}

/// One period of the published factor table: the five factors plus the
/// risk-free rate, all as decimal fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    /// Market excess return
    #[serde(rename = "Mkt-RF")]
    pub market_excess: f64,
    /// Size factor
    #[serde(rename = "SMB")]
    pub size: f64,
    /// Value factor
    #[serde(rename = "HML")]
    pub value: f64,
    /// Profitability factor
    #[serde(rename = "RMW")]
    pub profitability: f64,
    /// Investment factor
    #[serde(rename = "CMA")]
    pub investment: f64,
    /// Risk-free rate
    #[serde(rename = "RF")]
    pub risk_free: f64,
}

impl FactorRow {
    /// Create a factor row in published column order
    /// (Mkt-RF, SMB, HML, RMW, CMA, RF).
    pub const fn new(
        market_excess: f64,
        size: f64,
        value: f64,
        profitability: f64,
        investment: f64,
        risk_free: f64,
    ) -> Self {
        Self {
            market_excess,
            size,
            value,
            profitability,
            investment,
            risk_free,
        }
    }

    /// Value of a single factor.
    pub const fn factor(&self, factor: Factor) -> f64 {
        match factor {
            Factor::MktRf => self.market_excess,
            Factor::Smb => self.size,
            Factor::Hml => self.value,
            Factor::Rmw => self.profitability,
            Factor::Cma => self.investment,
        }
    }

    /// Scale every value, e.g. by `0.01` to turn percentages into fractions.
    pub fn scaled(&self, by: f64) -> Self {
        Self {
            market_excess: self.market_excess * by,
            size: self.size * by,
            value: self.value * by,
            profitability: self.profitability * by,
            investment: self.investment * by,
            risk_free: self.risk_free * by,
        }
    }
}
