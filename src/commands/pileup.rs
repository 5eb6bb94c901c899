use crate::alignment::BamAlignmentSource;
use crate::cli::{EvidenceKind, PileupArgs};
use crate::pileup::{load_runnie, FastaRunlengthSource, Pileup, PileupGenerator};
use crate::utils::{open_text_reader, Result};
use std::fmt::Display;
use std::io::{BufWriter, Write};

pub fn pileup(args: PileupArgs) -> Result<()> {
    let mut alignments = BamAlignmentSource::new(&args.bam_path, args.pileup.min_mapq)?;
    let generator = PileupGenerator::new(args.pileup.max_depth as usize);
    let stdout = std::io::stdout();
    let out = BufWriter::new(stdout.lock());

    match args.evidence {
        EvidenceKind::Length => {
            let mut reads = FastaRunlengthSource::new(&args.reads_path)?;
            let pileup = generator.fetch_region(&args.region, &mut alignments, &mut reads)?;
            write_pileup(&pileup, out)
        }
        EvidenceKind::Weibull => {
            let mut reads = load_runnie(open_text_reader(&args.reads_path)?)?;
            let pileup = generator.fetch_region(&args.region, &mut alignments, &mut reads)?;
            write_pileup(&pileup, out)
        }
    }
}

fn write_pileup<E, W>(pileup: &Pileup<E>, mut out: W) -> Result<()>
where
    E: Copy + Default + Display,
    W: Write,
{
    log::info!(
        "{}: {} columns, {} tracks, {} insert anchors",
        pileup.region,
        pileup.width(),
        pileup.depth(),
        pileup.inserts.len()
    );
    for width in 0..pileup.width() {
        writeln!(out, "{}", pileup.format_column(width)).map_err(|e| e.to_string())?;
    }
    out.flush().map_err(|e| e.to_string())
}
