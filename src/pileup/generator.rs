use super::{
    pileup::Pileup,
    read_data::{ReadData, ReadDataSource},
};
use crate::alignment::{
    AlignedSegment, AlignedSegmentWalker, AlignmentSource, CigarKind, CigarKindSet,
};
use crate::utils::{Region, Result};

const DEFAULT_MAX_DEPTH: usize = 80;

/// Lays out the alignments of a region into a [`Pileup`].
#[derive(Debug, Clone)]
pub struct PileupGenerator {
    max_depth: usize,
}

impl Default for PileupGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// Track occupancy: `(depth index, last occupied column)`.
///
/// A last column of 0 marks a track as unused.
#[derive(Debug)]
struct TrackPlacer {
    tracks: Vec<(usize, i64)>,
}

impl TrackPlacer {
    fn new() -> Self {
        Self {
            tracks: vec![(0, 0)],
        }
    }

    /// Earliest-finishing track if the read fits after it with at least one free column,
    /// otherwise `None`.
    fn find_track(&self, start: i64) -> Option<usize> {
        let &(depth, end) = self.tracks.iter().min_by_key(|(_, end)| *end)?;
        if end == 0 || start > end + 1 {
            Some(depth)
        } else {
            None
        }
    }

    fn occupy(&mut self, depth: usize, end: i64) {
        match self.tracks.iter_mut().find(|(d, _)| *d == depth) {
            Some(track) => track.1 = end,
            None => self.tracks.push((depth, end)),
        }
    }
}

impl PileupGenerator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Fetches the region's alignments and read data and assembles them.
    pub fn fetch_region<A, S>(
        &self,
        region: &Region,
        alignments: &mut A,
        reads: &mut S,
    ) -> Result<Pileup<S::Evidence>>
    where
        A: AlignmentSource,
        S: ReadDataSource,
    {
        let segments = alignments.fetch_segments(region)?;
        let mut pileup = Pileup::new(region);
        let mut placer = TrackPlacer::new();
        let mut n_placed = 0;
        let mut n_dropped = 0;

        for segment in &segments {
            let Some((start, end)) = relative_span(segment, region) else {
                continue;
            };

            let depth = match placer.find_track(start) {
                Some(depth) => depth,
                None if pileup.depth() < self.max_depth => pileup.add_track(),
                None => {
                    log::debug!(
                        "{}: dropping read {}, depth limit {} reached",
                        region,
                        segment.read_name,
                        self.max_depth
                    );
                    n_dropped += 1;
                    continue;
                }
            };
            placer.occupy(depth, end);

            let read_data = reads.fetch_read(&segment.read_name)?;
            place_segment(&mut pileup, segment, &read_data, depth)?;
            n_placed += 1;
        }

        pileup.mark_insert_junctions();
        log::debug!(
            "{}: placed {} reads in {} tracks, dropped {}",
            region,
            n_placed,
            pileup.depth(),
            n_dropped
        );
        Ok(pileup)
    }
}

/// First and last covered columns relative to the region start, if the alignment overlaps it.
fn relative_span(segment: &AlignedSegment, region: &Region) -> Option<(i64, i64)> {
    let first = segment.ref_start - 1;
    let last = segment.infer_reference_stop() - 1;
    if last < first || first >= region.stop as i64 || last < region.start as i64 {
        return None;
    }
    let start = std::cmp::max(first, region.start as i64) - region.start as i64;
    Some((start, last - region.start as i64))
}

/// Writes one read's observations into track `depth`.
fn place_segment<E: Copy + Default>(
    pileup: &mut Pileup<E>,
    segment: &AlignedSegment,
    read_data: &ReadData<E>,
    depth: usize,
) -> Result<()> {
    let targets = CigarKindSet::from_kinds(&[
        CigarKind::Match,
        CigarKind::Insert,
        CigarKind::Delete,
        CigarKind::Equal,
        CigarKind::Diff,
    ]);
    let region = &pileup.region;
    let (region_start, region_stop) = (region.start as i64, region.stop as i64);
    let width = pileup.width() as i64;

    let mut walker = AlignedSegmentWalker::new(segment);
    walker.initialize();
    while let Some((coordinate, op)) = walker.advance_to_next_matching(&targets)? {
        if op.consumes_ref() {
            let past_region = if segment.reversal {
                coordinate.ref_index < region_start
            } else {
                coordinate.ref_index >= region_stop
            };
            if past_region {
                break;
            }
            if coordinate.ref_index < region_start || coordinate.ref_index >= region_stop {
                continue;
            }
            let observation = read_data.observation(&coordinate, &op, segment.reversal)?;
            let column = (coordinate.ref_index - region_start) as usize;
            pileup.set(column, depth, observation)?;
        } else {
            // Anchor to the reference column following the insertion on either strand
            let mut anchor = coordinate.ref_index - region_start;
            if segment.reversal {
                anchor += 1;
            }
            if anchor < 0 || anchor >= width {
                continue;
            }
            let offset = walker.insert_offset() as usize;
            let observation = read_data.observation(&coordinate, &op, segment.reversal)?;
            pileup.set_insert(anchor as usize, offset, depth, observation)?;
        }
    }
    Ok(())
}
