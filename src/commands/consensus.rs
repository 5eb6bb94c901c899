use crate::alignment::BamAlignmentSource;
use crate::cli::{ConsensusArgs, EvidenceKind};
use crate::consensus::{BayesianConsensusCaller, ConsensusConfig};
use crate::pileup::{load_runnie, FastaRunlengthSource, PileupGenerator};
use crate::utils::{
    chunk_sequences, contig_lengths_from_fasta, contig_lengths_from_header, create_writer,
    get_bam_header, is_bam_mapped, open_text_reader, Result,
};
use crate::workflows::polish_regions;
use crate::writers::FastaWriter;
use std::sync::Mutex;

pub fn consensus(args: ConsensusArgs) -> Result<()> {
    let config = ConsensusConfig::from_path(&args.config_path)?;
    let flags = args.flags.apply(config.flags);
    let caller = BayesianConsensusCaller::new(config)?.with_flags(flags);
    log::info!("Consensus model {} with {:?}", caller.name(), caller.flags());

    let bam_header = get_bam_header(&args.bam_path)?;
    if !is_bam_mapped(&bam_header) {
        return Err("Input BAM is not mapped".into());
    }

    let contigs = match &args.genome_path {
        Some(genome_path) => contig_lengths_from_fasta(genome_path)?,
        None => contig_lengths_from_header(&bam_header)?,
    };
    let regions = chunk_sequences(&contigs, args.chunk_size)?;
    log::info!(
        "Split {} contigs into {} regions of up to {} bp",
        contigs.len(),
        regions.len(),
        args.chunk_size
    );

    let writer = create_writer(&args.output_prefix, "fasta", FastaWriter::new)?;
    let writer = Mutex::new(writer);
    let generator = PileupGenerator::new(args.pileup.max_depth as usize);
    let min_mapq = args.pileup.min_mapq;
    let open_alignments = || BamAlignmentSource::new(&args.bam_path, min_mapq);

    let result = match args.evidence {
        EvidenceKind::Length => polish_regions(
            &regions,
            &generator,
            &caller,
            open_alignments,
            || FastaRunlengthSource::new(&args.reads_path),
            &writer,
            args.num_threads,
        ),
        EvidenceKind::Weibull => {
            let reads = load_runnie(open_text_reader(&args.reads_path)?)?;
            log::info!("Loaded run-length distributions of {} reads", reads.len());
            polish_regions(
                &regions,
                &generator,
                &caller,
                open_alignments,
                || Ok(&reads),
                &writer,
                args.num_threads,
            )
        }
    };

    // Regions that did succeed are kept even when others failed.
    let mut writer = writer
        .into_inner()
        .map_err(|_| "Consensus writer lock poisoned".to_string())?;
    writer.flush()?;
    result?;
    Ok(())
}
