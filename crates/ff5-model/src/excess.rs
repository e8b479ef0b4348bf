//! Excess return calculation.

use ndarray::Array1;

use crate::sample::AlignedSample;

/// Stock return minus risk-free rate, one value per aligned period.
pub fn compute_excess<K>(aligned: &AlignedSample<K>) -> Vec<f64> {
    aligned.iter().map(|obs| obs.excess_return()).collect()
}

/// Excess returns as the regression response vector.
pub(crate) fn excess_response<K>(aligned: &AlignedSample<K>) -> Array1<f64> {
    aligned.iter().map(|obs| obs.excess_return()).collect()
}
