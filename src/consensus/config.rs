use crate::pileup::observation::BASES;
use crate::utils::{open_text_reader, Result};
use std::io::BufRead;
use std::path::Path;

const PRIOR_CLASSES: [&str; 2] = ["AT", "GC"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusFlags {
    /// Only score run lengths of observations agreeing with the consensus base.
    pub ignore_non_consensus_base_repeats: bool,
    /// Estimate a run length even when the consensus base is a gap.
    pub predict_gap_runlengths: bool,
    /// Score gap observations as zero-length repeats.
    pub count_gaps_as_zeros: bool,
}

impl Default for ConsensusFlags {
    fn default() -> Self {
        Self {
            ignore_non_consensus_base_repeats: true,
            predict_gap_runlengths: false,
            count_gaps_as_zeros: false,
        }
    }
}

impl ConsensusFlags {
    fn set(&mut self, key: &str, value: bool) -> Result<()> {
        match key {
            "ignore_non_consensus_base_repeats" => self.ignore_non_consensus_base_repeats = value,
            "predict_gap_runlengths" => self.predict_gap_runlengths = value,
            "count_gaps_as_zeros" => self.count_gaps_as_zeros = value,
            _ => return Err(format!("Unknown consensus flag: {}", key)),
        }
        Ok(())
    }
}

/// Trained run-length model.
///
/// `likelihoods[base][y][x]` is `log10 P(observed x | true y, base)` and
/// `priors[class][y]` is `log10 P(y)` for the AT (0) and GC (1) classes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    pub name: String,
    pub likelihoods: [Vec<Vec<f64>>; 4],
    pub priors: [Vec<f64>; 2],
    pub flags: ConsensusFlags,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Name,
    Prior(usize),
    Likelihood(usize),
    Flags,
}

impl ConsensusConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_text_reader(path)?;
        Self::from_reader(reader)
            .map_err(|e| format!("Consensus configuration {}: {}", path.display(), e))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut name = None;
        let mut likelihoods: [Option<Vec<Vec<f64>>>; 4] = Default::default();
        let mut priors: [Option<Vec<f64>>; 2] = Default::default();
        let mut flags = ConsensusFlags::default();
        let mut section = Section::None;

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| e.to_string())?;
            let line = line.trim_end();
            let line_number = index + 1;

            if let Some(header) = line.strip_prefix('>') {
                section = parse_header(header).map_err(|e| format!("line {}: {}", line_number, e))?;
                let duplicate = match section {
                    Section::Name => name.is_some(),
                    Section::Prior(class) => priors[class].is_some(),
                    Section::Likelihood(base) => likelihoods[base].is_some(),
                    Section::Flags | Section::None => false,
                };
                if duplicate {
                    return Err(format!("line {}: duplicate section >{}", line_number, header));
                }
                if let Section::Likelihood(base) = section {
                    likelihoods[base] = Some(Vec::new());
                }
                continue;
            }

            match section {
                Section::None => {
                    if !line.is_empty() {
                        return Err(format!("line {}: data outside of a section", line_number));
                    }
                }
                Section::Name => {
                    name = Some(line.to_string());
                    section = Section::None;
                }
                Section::Prior(class) => {
                    let row = parse_csv_row(line)
                        .map_err(|e| format!("line {}: {}", line_number, e))?;
                    priors[class] = Some(row);
                    section = Section::None;
                }
                Section::Likelihood(base) => {
                    if line.is_empty() {
                        section = Section::None;
                        continue;
                    }
                    let row = parse_csv_row(line)
                        .map_err(|e| format!("line {}: {}", line_number, e))?;
                    if let Some(matrix) = likelihoods[base].as_mut() {
                        matrix.push(row);
                    }
                }
                Section::Flags => {
                    if line.is_empty() {
                        section = Section::None;
                        continue;
                    }
                    let (key, value) = line
                        .split_once('=')
                        .ok_or_else(|| format!("line {}: expected key=value", line_number))?;
                    let value: bool = value.trim().parse().map_err(|_| {
                        format!("line {}: invalid boolean '{}'", line_number, value.trim())
                    })?;
                    flags
                        .set(key.trim(), value)
                        .map_err(|e| format!("line {}: {}", line_number, e))?;
                }
            }
        }

        let likelihoods = likelihoods
            .into_iter()
            .enumerate()
            .map(|(base, matrix)| {
                matrix.ok_or_else(|| {
                    format!("Missing likelihood matrix for base {}", BASES[base] as char)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let [at, gc] = priors;
        let at = at.ok_or_else(|| format!("Missing {} prior", PRIOR_CLASSES[0]))?;
        let gc = gc.ok_or_else(|| format!("Missing {} prior", PRIOR_CLASSES[1]))?;

        let likelihoods: [Vec<Vec<f64>>; 4] = likelihoods
            .try_into()
            .map_err(|_| "Expected four likelihood matrices".to_string())?;
        let config = ConsensusConfig {
            name: name.unwrap_or_default(),
            likelihoods,
            priors: [at, gc],
            flags,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that all matrices share both extents and the priors match the true-length extent.
    pub fn validate(&self) -> Result<()> {
        let y_size = self.likelihoods[0].len();
        if y_size == 0 {
            return Err("Likelihood matrix A has no rows".to_string());
        }
        let x_size = self.likelihoods[0][0].len();
        if x_size == 0 {
            return Err("Likelihood matrix A has empty rows".to_string());
        }

        for (base, matrix) in self.likelihoods.iter().enumerate() {
            let base_char = BASES[base] as char;
            if matrix.len() != y_size {
                return Err(format!(
                    "Matrix size conflict: matrix {} has {} rows, expected {}",
                    base_char,
                    matrix.len(),
                    y_size
                ));
            }
            if let Some(y) = matrix.iter().position(|row| row.len() != x_size) {
                return Err(format!(
                    "Matrix row size conflict in matrix {} at row {}: {} columns, expected {}",
                    base_char,
                    y,
                    matrix[y].len(),
                    x_size
                ));
            }
        }

        if self.priors[0].len() != self.priors[1].len() {
            return Err(format!(
                "Prior vector sizes do not match: {} has {}, {} has {}",
                PRIOR_CLASSES[0],
                self.priors[0].len(),
                PRIOR_CLASSES[1],
                self.priors[1].len()
            ));
        }
        if self.priors[0].len() != y_size {
            return Err(format!(
                "Prior vector size ({}) does not match true-length dimension ({}) of likelihood matrices",
                self.priors[0].len(),
                y_size
            ));
        }
        Ok(())
    }

    /// Number of candidate true lengths, `0..=max_output_run_length`.
    pub fn true_extent(&self) -> usize {
        self.likelihoods[0].len()
    }

    /// Number of modelled observed lengths.
    pub fn observed_extent(&self) -> usize {
        self.likelihoods[0].first().map_or(0, |row| row.len())
    }

    pub fn max_output_run_length(&self) -> u16 {
        self.true_extent().saturating_sub(1) as u16
    }

    pub fn max_input_run_length(&self) -> u16 {
        self.observed_extent().saturating_sub(1) as u16
    }
}

fn parse_header(header: &str) -> Result<Section> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    match tokens.as_slice() {
        ["Name"] => Ok(Section::Name),
        ["Flags"] => Ok(Section::Flags),
        [class, "prior"] => PRIOR_CLASSES
            .iter()
            .position(|c| c == class)
            .map(Section::Prior)
            .ok_or_else(|| format!("Unknown prior class: {}", class)),
        [base, "likelihood"] => {
            let base_index = match base.as_bytes() {
                [b] => BASES.iter().position(|x| x == b),
                _ => None,
            };
            base_index
                .map(Section::Likelihood)
                .ok_or_else(|| format!("Unknown likelihood base: {}", base))
        }
        _ => Err(format!("Unknown header: >{}", header)),
    }
}

fn parse_csv_row(line: &str) -> Result<Vec<f64>> {
    line.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{}'", token))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Renders a config whose matrices favour `x == y` (0.6) over any other length (0.1).
    pub(crate) fn diagonal_config_text(extent: usize, flags: &str) -> String {
        let mut text = String::from(">Name\ndiagonal\n\n");
        let prior = vec![format!("{}", (1.0 / extent as f64).log10()); extent].join(",");
        text.push_str(&format!(">AT prior\n{}\n\n>GC prior\n{}\n\n", prior, prior));
        for base in ["A", "C", "G", "T"] {
            text.push_str(&format!(">{} likelihood\n", base));
            for y in 0..extent {
                let row: Vec<String> = (0..extent)
                    .map(|x| {
                        let p: f64 = if x == y { 0.6 } else { 0.1 };
                        format!("{}", p.log10())
                    })
                    .collect();
                text.push_str(&row.join(","));
                text.push('\n');
            }
            text.push('\n');
        }
        if !flags.is_empty() {
            text.push_str(">Flags\n");
            text.push_str(flags);
            text.push('\n');
        }
        text
    }

    pub(crate) fn diagonal_config(extent: usize) -> ConsensusConfig {
        ConsensusConfig::from_reader(Cursor::new(diagonal_config_text(extent, ""))).unwrap()
    }

    #[test]
    fn test_parse_config() {
        let config = diagonal_config(5);
        assert_eq!(config.name, "diagonal");
        assert_eq!(config.true_extent(), 5);
        assert_eq!(config.observed_extent(), 5);
        assert_eq!(config.max_output_run_length(), 4);
        assert_eq!(config.max_input_run_length(), 4);
        assert_eq!(config.flags, ConsensusFlags::default());
        assert!((config.likelihoods[2][3][3] - 0.6f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_parse_flags() {
        let text = diagonal_config_text(
            3,
            "predict_gap_runlengths=true\ncount_gaps_as_zeros = true\nignore_non_consensus_base_repeats=false",
        );
        let config = ConsensusConfig::from_reader(Cursor::new(text)).unwrap();
        assert!(config.flags.predict_gap_runlengths);
        assert!(config.flags.count_gaps_as_zeros);
        assert!(!config.flags.ignore_non_consensus_base_repeats);
    }

    #[test]
    fn test_unknown_flag_err() {
        let text = diagonal_config_text(3, "call_everything=true");
        let err = ConsensusConfig::from_reader(Cursor::new(text)).unwrap_err();
        assert!(err.contains("call_everything"));
    }

    #[test]
    fn test_missing_matrix_err() {
        let text = diagonal_config_text(3, "");
        let cut = text.find(">T likelihood").unwrap();
        let err = ConsensusConfig::from_reader(Cursor::new(&text[..cut])).unwrap_err();
        assert_eq!(err, "Missing likelihood matrix for base T");
    }

    #[test]
    fn test_missing_prior_err() {
        let text = diagonal_config_text(3, "");
        let gc_start = text.find(">GC prior").unwrap();
        let gc_stop = text.find(">A likelihood").unwrap();
        let text = format!("{}{}", &text[..gc_start], &text[gc_stop..]);
        let err = ConsensusConfig::from_reader(Cursor::new(text)).unwrap_err();
        assert_eq!(err, "Missing GC prior");
    }

    #[test]
    fn test_duplicate_section_err() {
        let text = diagonal_config_text(3, "").replace(">GC prior", ">AT prior");
        let err = ConsensusConfig::from_reader(Cursor::new(text)).unwrap_err();
        assert!(err.contains("duplicate section"));
    }

    #[test]
    fn test_unknown_header_err() {
        let text = format!(">Weights\n1,2\n\n{}", diagonal_config_text(3, ""));
        let err = ConsensusConfig::from_reader(Cursor::new(text)).unwrap_err();
        assert!(err.starts_with("line 1"));
    }

    #[test]
    fn test_row_count_mismatch_err() {
        let mut config = diagonal_config(4);
        config.likelihoods[1].pop();
        let err = config.validate().unwrap_err();
        assert!(err.contains("matrix C has 3 rows"));
    }

    #[test]
    fn test_row_width_mismatch_err() {
        let mut config = diagonal_config(4);
        config.likelihoods[3][2].push(-1.0);
        let err = config.validate().unwrap_err();
        assert!(err.contains("matrix T at row 2"));
    }

    #[test]
    fn test_prior_mismatch_err() {
        let mut config = diagonal_config(4);
        config.priors[0].pop();
        assert!(config.validate().is_err());
        config.priors[1].pop();
        let err = config.validate().unwrap_err();
        assert!(err.contains("does not match true-length dimension"));
    }

    #[test]
    fn test_from_path_gzip() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.csv.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all(diagonal_config_text(3, "").as_bytes())
            .unwrap();
        encoder.finish().unwrap();

        let config = ConsensusConfig::from_path(&path).unwrap();
        assert_eq!(config.true_extent(), 3);
    }
}
