//! Discretised Weibull distributions emitted by run-length aware basecallers.

use std::fmt;

/// Per-base basecaller output describing a continuous run-length distribution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeibullParams {
    pub scale: f64,
    pub shape: f64,
}

impl WeibullParams {
    pub fn new(scale: f64, shape: f64) -> Self {
        Self { scale, shape }
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.shape.is_finite() && self.scale > 0.0 && self.shape > 0.0
    }

    /// Survival function `S(x) = exp(-(x / scale)^shape)`.
    pub fn survival(&self, x: f64) -> f64 {
        (-(x / self.scale).powf(self.shape)).exp()
    }

    /// Probability mass over run lengths `0..length`.
    ///
    /// Mass at zero is always 0; `pmf[k + 1] = S(k) - S(k + 1)`.
    pub fn discrete_pmf(&self, length: usize) -> Vec<f64> {
        let mut pmf = vec![0.0; length];
        for k in 0..length.saturating_sub(1) {
            pmf[k + 1] = self.survival(k as f64) - self.survival((k + 1) as f64);
        }
        pmf
    }

    pub fn log10_discrete_pmf(&self, length: usize) -> Vec<f64> {
        self.discrete_pmf(length)
            .into_iter()
            .map(|p| if p > 0.0 { p.log10() } else { f64::NEG_INFINITY })
            .collect()
    }
}

impl fmt::Display for WeibullParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}/{:.3}", self.scale, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pmf_starts_at_zero_mass() {
        let pmf = WeibullParams::new(2.0, 1.5).discrete_pmf(5);
        assert_eq!(pmf.len(), 5);
        assert_eq!(pmf[0], 0.0);
        assert!(pmf[1..].iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_pmf_mass_telescopes() {
        let params = WeibullParams::new(3.0, 2.0);
        let pmf = params.discrete_pmf(60);
        let total: f64 = pmf.iter().sum();
        assert_relative_eq!(total, 1.0 - params.survival(59.0), epsilon = 1e-12);
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exponential_special_case() {
        // shape 1 reduces to a geometric distribution
        let params = WeibullParams::new(1.0, 1.0);
        let pmf = params.discrete_pmf(4);
        let e = std::f64::consts::E;
        assert_relative_eq!(pmf[1], 1.0 - 1.0 / e, epsilon = 1e-12);
        assert_relative_eq!(pmf[2], 1.0 / e - 1.0 / (e * e), epsilon = 1e-12);
    }

    #[test]
    fn test_log_pmf() {
        let params = WeibullParams::new(2.0, 3.0);
        let log_pmf = params.log10_discrete_pmf(4);
        assert_eq!(log_pmf[0], f64::NEG_INFINITY);
        assert_relative_eq!(log_pmf[1], params.discrete_pmf(4)[1].log10());
    }

    #[test]
    fn test_validity() {
        assert!(WeibullParams::new(1.0, 1.0).is_valid());
        assert!(!WeibullParams::new(0.0, 1.0).is_valid());
        assert!(!WeibullParams::new(1.0, f64::NAN).is_valid());
        assert!(!WeibullParams::default().is_valid());
    }
}
