use crate::alignment::AlignmentSource;
use crate::consensus::{BayesianConsensusCaller, Evidence};
use crate::pileup::{observation::BASES, Observation, Pileup, PileupGenerator, ReadDataSource};
use crate::utils::{Region, Result};
use crate::writers::FastaWriter;
use rayon::ThreadPoolBuilder;
use std::io::Write;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

/// Counts reported once every region has been attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolishSummary {
    pub n_regions: usize,
    pub n_written: usize,
    pub n_empty: usize,
    pub n_failed: usize,
}

#[derive(Debug, Default)]
struct PolishCounters {
    written: AtomicUsize,
    empty: AtomicUsize,
    failed: AtomicUsize,
}

/// Calls every column of the pileup and concatenates the expanded consensus.
///
/// Insert columns anchored at a reference column are emitted before it. A call of
/// base `b` with run length `n` contributes `n` copies of `b`; gaps contribute nothing.
pub fn call_region<E: Evidence>(pileup: &Pileup<E>, caller: &BayesianConsensusCaller) -> String {
    let mut consensus = String::new();
    for width in 0..pileup.width() {
        for column in pileup.insert_columns(width) {
            append_call(&mut consensus, pileup, "+", column, caller);
        }
        let position = (pileup.region.start as usize + width).to_string();
        append_call(&mut consensus, pileup, &position, pileup.column(width), caller);
    }
    consensus
}

fn append_call<E: Evidence>(
    consensus: &mut String,
    pileup: &Pileup<E>,
    label: &str,
    column: &[Observation<E>],
    caller: &BayesianConsensusCaller,
) {
    let call = caller.call(column);
    log::trace!(
        "{} {}: base={} length={}",
        pileup.region,
        label,
        call.base,
        call.run_length
    );
    if call.is_gap() {
        return;
    }
    if let Some(&base) = BASES.get(call.base as usize) {
        consensus.extend(std::iter::repeat(base as char).take(call.run_length as usize));
    }
}

/// Assembles the region's pileup and returns its consensus sequence.
pub fn process_region<A, S>(
    region: &Region,
    generator: &PileupGenerator,
    caller: &BayesianConsensusCaller,
    alignments: &mut A,
    reads: &mut S,
) -> Result<String>
where
    A: AlignmentSource,
    S: ReadDataSource,
    S::Evidence: Evidence,
{
    log::debug!("{}: start", region);
    let pileup = generator.fetch_region(region, alignments, reads)?;
    let consensus = call_region(&pileup, caller);
    log::debug!("{}: consensus length {}", region, consensus.len());
    Ok(consensus)
}

/// Polishes all regions on a fixed pool of `num_threads` workers.
///
/// Workers share an atomic index into `regions` and open their own alignment and
/// read-data handles through the factories. A failed region is logged and skipped;
/// the call returns an error after all workers finish if any region failed.
#[allow(clippy::too_many_arguments)]
pub fn polish_regions<A, S, FA, FS, W>(
    regions: &[Region],
    generator: &PileupGenerator,
    caller: &BayesianConsensusCaller,
    open_alignments: FA,
    open_reads: FS,
    writer: &Mutex<FastaWriter<W>>,
    num_threads: usize,
) -> Result<PolishSummary>
where
    A: AlignmentSource,
    S: ReadDataSource,
    S::Evidence: Evidence,
    FA: Fn() -> Result<A> + Sync,
    FS: Fn() -> Result<S> + Sync,
    W: Write + Send,
{
    log::debug!("Initializing thread pool with {} threads...", num_threads);
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("rlconsensus-{}", i))
        .start_handler(|_thread_index| {
            log::trace!("Initialized thread {:?}", std::thread::current().id());
        })
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))?;

    let next_region = AtomicUsize::new(0);
    let counters = PolishCounters::default();
    let worker_results = pool.broadcast(|_| -> Result<()> {
        let mut alignments = open_alignments()?;
        let mut reads = open_reads()?;
        loop {
            let index = next_region.fetch_add(1, Ordering::SeqCst);
            let Some(region) = regions.get(index) else {
                break;
            };
            match process_region(region, generator, caller, &mut alignments, &mut reads) {
                Ok(consensus) if consensus.is_empty() => {
                    log::debug!("{}: empty consensus, not written", region);
                    counters.empty.fetch_add(1, Ordering::Relaxed);
                }
                Ok(consensus) => {
                    let mut writer = writer
                        .lock()
                        .map_err(|_| "Consensus writer lock poisoned".to_string())?;
                    writer.write_record(&region.to_string(), consensus.as_bytes())?;
                    counters.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    log::error!("Error polishing region {}: {}", region, err);
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    });

    // A worker that could not open its sources leaves its share to the others.
    worker_results.into_iter().collect::<Result<Vec<()>>>()?;

    let summary = PolishSummary {
        n_regions: regions.len(),
        n_written: counters.written.into_inner(),
        n_empty: counters.empty.into_inner(),
        n_failed: counters.failed.into_inner(),
    };
    log::info!(
        "Polished {} regions: {} written, {} empty, {} failed",
        summary.n_regions,
        summary.n_written,
        summary.n_empty,
        summary.n_failed
    );
    if summary.n_failed > 0 {
        return Err(format!(
            "{} of {} regions failed",
            summary.n_failed, summary.n_regions
        ));
    }
    Ok(summary)
}
