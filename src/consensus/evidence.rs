//! The per-observation evidence kinds the consensus caller can consume.
//!
//! Both kinds are scored against one row `P(x | y, base)` of a likelihood matrix;
//! they only differ in how a single observation is turned into a log likelihood.

use super::weibull::WeibullParams;
use crate::utils::math::log10_sum_exp;
use std::fmt;

pub trait Evidence: Copy + Default + PartialEq + fmt::Display + Send + Sync {
    /// Observations with equal keys are scored once and weighted by their count.
    type Key: Ord + Copy;
    /// Per-observation state computed once and reused for every candidate length.
    type Prepared;

    fn key(&self) -> Self::Key;

    /// `row_length` is the observed-length extent of the likelihood matrices.
    fn prepare(&self, row_length: usize) -> Self::Prepared;

    /// log10 likelihood of the observation given one matrix row.
    fn log_likelihood(prepared: &Self::Prepared, row: &[f64]) -> f64;
}

/// An observed integer run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct RunLength(pub u16);

impl fmt::Display for RunLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Evidence for RunLength {
    type Key = u16;
    type Prepared = usize;

    fn key(&self) -> u16 {
        self.0
    }

    /// Lengths beyond the matrix are capped at the largest observed length it models.
    fn prepare(&self, row_length: usize) -> usize {
        std::cmp::min(self.0 as usize, row_length.saturating_sub(1))
    }

    fn log_likelihood(prepared: &usize, row: &[f64]) -> f64 {
        row[*prepared]
    }
}

impl Evidence for WeibullParams {
    type Key = (u64, u64);
    type Prepared = Vec<f64>;

    fn key(&self) -> (u64, u64) {
        (self.scale.to_bits(), self.shape.to_bits())
    }

    fn prepare(&self, row_length: usize) -> Vec<f64> {
        self.log10_discrete_pmf(row_length)
    }

    /// Marginalises the observed length over the discretised distribution.
    fn log_likelihood(prepared: &Vec<f64>, row: &[f64]) -> f64 {
        prepared
            .iter()
            .zip(row)
            .fold(f64::NEG_INFINITY, |acc, (p, r)| log10_sum_exp(acc, p + r))
    }
}
