//! Log-space arithmetic shared by the consensus estimators.

/// `log10(10^a + 10^b)` without leaving log space.
#[inline]
pub fn log10_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (1.0 + 10f64.powf(lo - hi)).log10()
}

/// Index of the largest value; the first index wins ties.
pub fn first_argmax<T: PartialOrd + Copy>(values: &[T]) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Shift log likelihoods so the largest becomes zero.
pub fn normalize_log_likelihoods(values: &mut [f64], max_value: f64) {
    for value in values.iter_mut() {
        *value -= max_value;
    }
}
