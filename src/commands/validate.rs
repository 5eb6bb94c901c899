use crate::cli::ValidateArgs;
use crate::consensus::{BayesianConsensusCaller, ConsensusConfig};
use crate::pileup::observation::BASES;
use crate::utils::{math::first_argmax, Result};

pub fn validate(args: ValidateArgs) -> Result<()> {
    let config = ConsensusConfig::from_path(&args.config_path)?;
    let caller = BayesianConsensusCaller::new(config)?;
    for line in summarize(caller.config()) {
        log::info!("{}", line);
    }
    Ok(())
}

fn summarize(config: &ConsensusConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Model: {}", config.name),
        format!(
            "Run lengths - True: [0,{}], Observed: [0,{}]",
            config.max_output_run_length(),
            config.max_input_run_length()
        ),
        format!(
            "Flags - ignore_non_consensus_base_repeats: {}, predict_gap_runlengths: {}, count_gaps_as_zeros: {}",
            config.flags.ignore_non_consensus_base_repeats,
            config.flags.predict_gap_runlengths,
            config.flags.count_gaps_as_zeros
        ),
    ];
    for (class, prior) in ["AT", "GC"].iter().zip(config.priors.iter()) {
        let mode = first_argmax(prior).unwrap_or(0);
        lines.push(format!("{} prior - Mode: {}", class, mode));
    }
    for (base, matrix) in BASES.iter().zip(config.likelihoods.iter()) {
        // Rows whose most likely observation is their own true length.
        let n_diagonal = matrix
            .iter()
            .enumerate()
            .filter(|(y, row)| first_argmax(row) == Some(*y))
            .count();
        lines.push(format!(
            "{} likelihood - Diagonal-dominant rows: {}/{}",
            *base as char,
            n_diagonal,
            matrix.len()
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::config::tests::diagonal_config;

    #[test]
    fn test_summarize_diagonal_model() {
        let lines = summarize(&diagonal_config(4));
        assert_eq!(lines[0], "Model: diagonal");
        assert_eq!(lines[1], "Run lengths - True: [0,3], Observed: [0,3]");
        assert_eq!(lines[3], "AT prior - Mode: 0");
        assert_eq!(lines[5], "A likelihood - Diagonal-dominant rows: 4/4");
        assert_eq!(lines.len(), 9);
    }
}
