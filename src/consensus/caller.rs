use super::{
    config::{ConsensusConfig, ConsensusFlags},
    evidence::Evidence,
};
use crate::pileup::observation::{Observation, DELETE_CODE};
use crate::utils::{
    math::{first_argmax, normalize_log_likelihoods},
    Result,
};
use std::collections::BTreeMap;

/// Outcome for one pileup column.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusCall {
    /// Base code 0..3, or the gap code.
    pub base: u8,
    pub run_length: u16,
    /// log10 likelihood per candidate true length, shifted so the best is 0.
    /// Empty when no run length was estimated.
    pub log_likelihoods: Vec<f64>,
}

impl ConsensusCall {
    pub fn is_gap(&self) -> bool {
        self.base == DELETE_CODE
    }
}

/// Estimates the base and run length of a pileup column from a trained model.
///
/// Immutable once built; share it by reference across workers.
#[derive(Debug, Clone)]
pub struct BayesianConsensusCaller {
    config: ConsensusConfig,
}

impl BayesianConsensusCaller {
    pub fn new(config: ConsensusConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Consensus model {}: {} true lengths, {} observed lengths",
            config.name,
            config.true_extent(),
            config.observed_extent()
        );
        Ok(Self { config })
    }

    pub fn with_flags(mut self, flags: ConsensusFlags) -> Self {
        self.config.flags = flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn flags(&self) -> &ConsensusFlags {
        &self.config.flags
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn call<E: Evidence>(&self, column: &[Observation<E>]) -> ConsensusCall {
        let base = self.predict_consensus_base(column);

        if base != DELETE_CODE {
            let (run_length, log_likelihoods) = self.predict_run_length(column, base, base);
            return ConsensusCall {
                base,
                run_length: run_length.max(1),
                log_likelihoods,
            };
        }

        if self.config.flags.predict_gap_runlengths {
            if let Some(matrix_base) = most_frequent_base(column) {
                let (run_length, log_likelihoods) =
                    self.predict_run_length(column, base, matrix_base);
                return ConsensusCall {
                    base,
                    run_length,
                    log_likelihoods,
                };
            }
        }

        ConsensusCall {
            base,
            run_length: 0,
            log_likelihoods: Vec::new(),
        }
    }

    /// Most frequent strand-corrected base, counting gaps in a fifth bucket.
    ///
    /// Ties go to the lowest code; a column without observations is a gap.
    pub fn predict_consensus_base<E>(&self, column: &[Observation<E>]) -> u8 {
        let mut counts = [0u32; 5];
        for observation in column.iter().filter(|o| !o.is_empty()) {
            if observation.is_base() {
                counts[observation.strand_corrected_base() as usize] += 1;
            } else {
                counts[DELETE_CODE as usize] += 1;
            }
        }
        if counts.iter().all(|&c| c == 0) {
            return DELETE_CODE;
        }
        first_argmax(&counts).map_or(DELETE_CODE, |i| i as u8)
    }

    /// Returns the maximum-likelihood true length and the normalised likelihood vector.
    ///
    /// Every observation is scored with the matrix of `matrix_base`, whatever its strand.
    /// It differs from `consensus_base` only when a gap call borrows the most frequent
    /// base's model.
    pub fn predict_run_length<E: Evidence>(
        &self,
        column: &[Observation<E>],
        consensus_base: u8,
        matrix_base: u8,
    ) -> (u16, Vec<f64>) {
        let flags = &self.config.flags;
        let prior = &self.config.priors[prior_class(matrix_base)];
        let matrix = &self.config.likelihoods[matrix_base as usize];
        let row_length = self.config.observed_extent();

        // evidence key, or None for a gap scored as zero -> (exemplar, count)
        let mut factored: BTreeMap<Option<E::Key>, (E, u32)> = BTreeMap::new();
        for observation in column.iter().filter(|o| !o.is_empty()) {
            let agrees = observation.strand_corrected_base() == consensus_base;
            let key = if observation.is_gap() {
                if !flags.count_gaps_as_zeros
                    || (flags.ignore_non_consensus_base_repeats && !agrees)
                {
                    continue;
                }
                None
            } else {
                if flags.ignore_non_consensus_base_repeats && !agrees {
                    continue;
                }
                Some(observation.evidence.key())
            };
            factored
                .entry(key)
                .or_insert((observation.evidence, 0))
                .1 += 1;
        }

        let factored: Vec<(Option<E::Prepared>, f64)> = factored
            .into_iter()
            .map(|(key, (evidence, count))| {
                let prepared = key.map(|_| evidence.prepare(row_length));
                (prepared, count as f64)
            })
            .collect();

        let mut log_likelihoods = Vec::with_capacity(self.config.true_extent());
        for (y, prior_y) in prior.iter().enumerate() {
            let mut log_sum = *prior_y;
            let row = &matrix[y];
            for (prepared, count) in &factored {
                let log_likelihood = match prepared {
                    Some(prepared) => E::log_likelihood(prepared, row),
                    None => row[0],
                };
                log_sum += count * log_likelihood;
            }
            log_likelihoods.push(log_sum);
        }

        let mut best_y = 0;
        let mut best = f64::NEG_INFINITY;
        for (y, &log_sum) in log_likelihoods.iter().enumerate() {
            if log_sum > best {
                best = log_sum;
                best_y = y;
            }
        }
        if best.is_finite() {
            normalize_log_likelihoods(&mut log_likelihoods, best);
        }

        (best_y as u16, log_likelihoods)
    }
}

/// A/T share one prior, C/G the other.
fn prior_class(base: u8) -> usize {
    match base {
        0 | 3 => 0,
        _ => 1,
    }
}

fn most_frequent_base<E>(column: &[Observation<E>]) -> Option<u8> {
    let mut counts = [0u32; 4];
    for observation in column.iter().filter(|o| o.is_base()) {
        counts[observation.strand_corrected_base() as usize] += 1;
    }
    if counts.iter().all(|&c| c == 0) {
        return None;
    }
    first_argmax(&counts).map(|i| i as u8)
}
