use crate::consensus::ConsensusFlags;
use crate::utils::{Region, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="rlconsensus",
          version=&**FULL_VERSION,
          about="Run-length consensus polishing of read alignments",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Polish read alignments into a run-length consensus")]
    Consensus(ConsensusArgs),
    #[clap(about = "Print the pileup of one region")]
    Pileup(PileupArgs),
    #[clap(about = "Consensus Model Validator")]
    Validate(ValidateArgs),
}

/// Kind of per-base run-length evidence carried by the reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    /// Integer run lengths from a run-length encoded reads FASTA.
    Length,
    /// Weibull run-length distributions from a Runnie file.
    Weibull,
}

impl FromStr for EvidenceKind {
    type Err = &'static str;
    fn from_str(kind: &str) -> std::result::Result<Self, Self::Err> {
        match kind {
            "length" => Ok(EvidenceKind::Length),
            "weibull" => Ok(EvidenceKind::Weibull),
            _ => Err("Invalid evidence kind"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("consensus")))]
#[command(arg_required_else_help(true))]
pub struct ConsensusArgs {
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(help = "Indexed BAM file with reads aligned to the draft assembly")]
    #[clap(value_name = "BAM")]
    #[arg(value_parser = check_file_exists)]
    pub bam_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads")]
    #[clap(help = "Indexed reads FASTA (length evidence) or Runnie file (weibull evidence)")]
    #[clap(value_name = "READS")]
    #[arg(value_parser = check_file_exists)]
    pub reads_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "config")]
    #[clap(help = "Trained consensus model")]
    #[clap(value_name = "CONFIG")]
    #[arg(value_parser = check_file_exists)]
    pub config_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 'g')]
    #[clap(long = "genome")]
    #[clap(help = "Indexed draft assembly FASTA; contig lengths are taken from the BAM header if omitted")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_file_exists)]
    pub genome_path: Option<PathBuf>,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(short = 'e')]
    #[clap(long = "evidence")]
    #[clap(value_name = "EVIDENCE")]
    #[clap(help = "Run-length evidence in the reads file (length or weibull)")]
    #[clap(default_value = "length")]
    pub evidence: EvidenceKind,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "chunk-size")]
    #[clap(value_name = "CHUNK_SIZE")]
    #[clap(help = "Width of the regions contigs are split into")]
    #[clap(default_value = "1000000")]
    #[arg(value_parser = positive_integer)]
    pub chunk_size: u64,

    #[clap(flatten)]
    pub pileup: PileupParams,

    #[clap(flatten)]
    pub flags: FlagOverrides,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("pileup")))]
#[command(arg_required_else_help(true))]
pub struct PileupArgs {
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(help = "Indexed BAM file with reads aligned to the draft assembly")]
    #[clap(value_name = "BAM")]
    #[arg(value_parser = check_file_exists)]
    pub bam_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads")]
    #[clap(help = "Indexed reads FASTA (length evidence) or Runnie file (weibull evidence)")]
    #[clap(value_name = "READS")]
    #[arg(value_parser = check_file_exists)]
    pub reads_path: PathBuf,

    #[clap(required = true)]
    #[clap(long = "region")]
    #[clap(help = "Region to print, as contig:start-stop (0-based, half-open)")]
    #[clap(value_name = "REGION")]
    #[arg(value_parser = Region::from_string)]
    pub region: Region,

    #[clap(short = 'e')]
    #[clap(long = "evidence")]
    #[clap(value_name = "EVIDENCE")]
    #[clap(help = "Run-length evidence in the reads file (length or weibull)")]
    #[clap(default_value = "length")]
    pub evidence: EvidenceKind,

    #[clap(flatten)]
    pub pileup: PileupParams,
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct PileupParams {
    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(help = "Minimum mapping quality of alignments used in the pileup")]
    #[clap(default_value = "0")]
    pub min_mapq: u8,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-depth")]
    #[clap(value_name = "MAX_DEPTH")]
    #[clap(help = "Maximum number of pileup tracks per region")]
    #[clap(default_value = "80")]
    #[arg(value_parser = positive_integer)]
    pub max_depth: u64,
}

/// Command line overrides of the flags stored with the consensus model.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct FlagOverrides {
    #[clap(help_heading("Model flags"))]
    #[clap(long = "ignore-non-consensus-repeats")]
    #[clap(value_name = "BOOL")]
    #[clap(help = "Only use run lengths of reads agreeing with the consensus base")]
    pub ignore_non_consensus_base_repeats: Option<bool>,

    #[clap(help_heading("Model flags"))]
    #[clap(long = "predict-gap-runlengths")]
    #[clap(value_name = "BOOL")]
    #[clap(help = "Estimate a run length for gap calls")]
    pub predict_gap_runlengths: Option<bool>,

    #[clap(help_heading("Model flags"))]
    #[clap(long = "count-gaps-as-zeros")]
    #[clap(value_name = "BOOL")]
    #[clap(help = "Count gap observations as zero-length runs")]
    pub count_gaps_as_zeros: Option<bool>,
}

impl FlagOverrides {
    pub fn apply(&self, mut flags: ConsensusFlags) -> ConsensusFlags {
        if let Some(value) = self.ignore_non_consensus_base_repeats {
            flags.ignore_non_consensus_base_repeats = value;
        }
        if let Some(value) = self.predict_gap_runlengths {
            flags.predict_gap_runlengths = value;
        }
        if let Some(value) = self.count_gaps_as_zeros {
            flags.count_gaps_as_zeros = value;
        }
        flags
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("validate")))]
#[command(arg_required_else_help(true))]
pub struct ValidateArgs {
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "config")]
    #[clap(help = "Trained consensus model")]
    #[clap(value_name = "CONFIG")]
    #[arg(value_parser = check_file_exists)]
    pub config_path: PathBuf,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn positive_integer(s: &str) -> Result<u64> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid positive integer", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}
