//! Walks one alignment unit by unit, in the order of the original (unclipped) read.
//!
//! Forward alignments are walked left to right along the reference. Reverse
//! alignments are walked from their last operation back to their first, so the
//! true-read cursor always moves head to tail while the reference and aligned-read
//! cursors move right to left.

use super::{
    cigar::{CigarKindSet, CigarOp},
    segment::{AlignedSegment, Coordinate},
};
use crate::utils::Result;

#[derive(Debug, Clone)]
struct WalkState {
    op_index: i64,
    sub_op_index: u64,
    coordinate: Coordinate,
    increment: i64,
    exhausted: bool,
}

/// Iteration state over a single [`AlignedSegment`].
///
/// Each call to an advance method yields the coordinate of the unit being consumed
/// together with the operation it belongs to, then moves the cursors past it.
#[derive(Debug)]
pub struct AlignedSegmentWalker<'a> {
    segment: &'a AlignedSegment,
    state: Option<WalkState>,
}

impl<'a> AlignedSegmentWalker<'a> {
    pub fn new(segment: &'a AlignedSegment) -> Self {
        Self {
            segment,
            state: None,
        }
    }

    pub fn initialize(&mut self) {
        let segment = self.segment;
        let state = if segment.reversal {
            // Bases stored in the record: the read without its hard clips
            let aligned_length: i64 = segment
                .cigar
                .iter()
                .filter(|op| op.consumes_read())
                .map(|op| op.length as i64)
                .sum();
            WalkState {
                op_index: segment.cigar.len() as i64 - 1,
                sub_op_index: 0,
                coordinate: Coordinate {
                    ref_index: segment.infer_reference_stop() - 1,
                    read_index: aligned_length - 1,
                    read_true_index: 0,
                },
                increment: -1,
                exhausted: false,
            }
        } else {
            WalkState {
                op_index: 0,
                sub_op_index: 0,
                coordinate: Coordinate {
                    ref_index: segment.ref_start - 1,
                    read_index: 0,
                    read_true_index: 0,
                },
                increment: 1,
                exhausted: false,
            }
        };
        self.state = Some(state);
    }

    /// Units of the current operation consumed so far, counting the unit last yielded.
    pub fn sub_op_index(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.sub_op_index)
    }

    /// Zero-based offset of the last yielded unit within its operation, in walk order.
    pub fn insert_offset(&self) -> u64 {
        self.sub_op_index().saturating_sub(1)
    }

    /// Yields the next unit of the alignment, or `None` once every operation is consumed.
    pub fn advance_one_unit(&mut self) -> Result<Option<(Coordinate, CigarOp)>> {
        self.advance(None)
    }

    /// Like [`advance_one_unit`](Self::advance_one_unit) but operations outside `targets`
    /// are skipped whole, moving the cursors past them in a single step.
    pub fn advance_to_next_matching(
        &mut self,
        targets: &CigarKindSet,
    ) -> Result<Option<(Coordinate, CigarOp)>> {
        self.advance(Some(targets))
    }

    fn advance(&mut self, targets: Option<&CigarKindSet>) -> Result<Option<(Coordinate, CigarOp)>> {
        let segment = self.segment;
        let state = self.state.as_mut().ok_or_else(|| {
            format!(
                "Walker for read {} advanced before initialize()",
                segment.read_name
            )
        })?;
        if state.exhausted {
            return Err(format!(
                "Walker for read {} advanced past exhaustion",
                segment.read_name
            ));
        }

        loop {
            if state.op_index < 0 || state.op_index >= segment.cigar.len() as i64 {
                state.exhausted = true;
                return Ok(None);
            }
            let op = segment.cigar[state.op_index as usize];
            let remaining = op.length - state.sub_op_index;

            if remaining > 0 {
                if targets.map_or(true, |t| t.contains(op.kind)) {
                    let coordinate = state.coordinate;
                    state.sub_op_index += 1;
                    move_cursors(&mut state.coordinate, &op, 1, state.increment);
                    return Ok(Some((coordinate, op)));
                }
                move_cursors(&mut state.coordinate, &op, remaining, state.increment);
            }

            state.op_index += state.increment;
            state.sub_op_index = 0;
        }
    }
}

fn move_cursors(coordinate: &mut Coordinate, op: &CigarOp, units: u64, increment: i64) {
    let units = units as i64;
    if op.consumes_read() {
        coordinate.read_index += increment * units;
    }
    if op.consumes_true_read() {
        coordinate.read_true_index += units;
    }
    if op.consumes_ref() {
        coordinate.ref_index += increment * units;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{
        cigar::{CigarKind, CigarOp},
        segment::{segment_for_test, ReadSequence},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn walk_all(segment: &AlignedSegment) -> Vec<(Coordinate, CigarOp)> {
        let mut walker = AlignedSegmentWalker::new(segment);
        walker.initialize();
        let mut steps = Vec::new();
        while let Some(step) = walker.advance_one_unit().unwrap() {
            steps.push(step);
        }
        steps
    }

    fn random_cigar(rng: &mut StdRng) -> String {
        let mut encoding = String::new();
        if rng.random_bool(0.5) {
            encoding.push_str(&format!("{}H", rng.random_range(1u32..5)));
        }
        if rng.random_bool(0.5) {
            encoding.push_str(&format!("{}S", rng.random_range(1u32..8)));
        }
        encoding.push_str(&format!("{}M", rng.random_range(1u32..20)));
        for _ in 0..rng.random_range(0..6usize) {
            let kind = ["I", "D", "=", "X"][rng.random_range(0..4usize)];
            encoding.push_str(&format!("{}{}", rng.random_range(1u32..6), kind));
            encoding.push_str(&format!("{}M", rng.random_range(1u32..10)));
        }
        if rng.random_bool(0.5) {
            encoding.push_str(&format!("{}S", rng.random_range(1u32..8)));
        }
        encoding
    }

    #[test]
    fn test_forward_walk_with_insertion() {
        let segment = segment_for_test("r1", 100, "5M2I3M", false);
        let steps = walk_all(&segment);
        assert_eq!(steps.len(), 10);

        let ref_indexes: Vec<i64> = steps.iter().map(|(c, _)| c.ref_index).collect();
        assert_eq!(
            ref_indexes,
            vec![100, 101, 102, 103, 104, 105, 105, 105, 106, 107]
        );
        assert!(steps[5..7].iter().all(|(_, op)| op.kind == CigarKind::Insert));

        let true_indexes: Vec<i64> = steps.iter().map(|(c, _)| c.read_true_index).collect();
        assert_eq!(true_indexes, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_reverse_walk_visits_reference_right_to_left() {
        let segment = segment_for_test("r1", 100, "5M2I3M", true);
        let steps = walk_all(&segment);

        let ref_indexes: Vec<i64> = steps.iter().map(|(c, _)| c.ref_index).collect();
        assert_eq!(
            ref_indexes,
            vec![107, 106, 105, 104, 104, 104, 103, 102, 101, 100]
        );
        let read_indexes: Vec<i64> = steps.iter().map(|(c, _)| c.read_index).collect();
        assert_eq!(read_indexes, (0..10).rev().collect::<Vec<i64>>());
        let true_indexes: Vec<i64> = steps.iter().map(|(c, _)| c.read_true_index).collect();
        assert_eq!(true_indexes, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_reverse_read_index_counts_stored_bases_only() {
        let mut segment = segment_for_test("r1", 10, "3H2S4M1S", true);
        segment.sequence = ReadSequence::Text(b"GGACGTA".to_vec());
        assert_eq!(segment.read_length, 10);

        let steps = walk_all(&segment);
        let read_indexes: Vec<i64> = steps
            .iter()
            .filter(|(_, op)| op.consumes_read())
            .map(|(c, _)| c.read_index)
            .collect();
        let last = segment.sequence.len() as i64 - 1;
        assert_eq!(read_indexes, (0..=last).rev().collect::<Vec<i64>>());
        assert_eq!(steps.last().unwrap().0.read_true_index, 9);
    }

    #[test]
    fn test_deletion_keeps_read_cursors() {
        let segment = segment_for_test("r1", 0, "2M2D1M", false);
        let steps = walk_all(&segment);
        let cursors: Vec<(i64, i64)> = steps
            .iter()
            .map(|(c, _)| (c.ref_index, c.read_true_index))
            .collect();
        assert_eq!(cursors, vec![(0, 0), (1, 1), (2, 2), (3, 2), (4, 2)]);
    }

    #[test]
    fn test_advance_to_next_matching_skips_clips_in_bulk() {
        let segment = segment_for_test("r1", 50, "4H3S2M1I2M3S", false);
        let mut walker = AlignedSegmentWalker::new(&segment);
        walker.initialize();
        let targets = CigarKindSet::from_kinds(&[CigarKind::Match]);

        let mut steps = Vec::new();
        while let Some((coordinate, op)) = walker.advance_to_next_matching(&targets).unwrap() {
            assert_eq!(op.kind, CigarKind::Match);
            steps.push((coordinate.ref_index, coordinate.read_true_index));
        }
        assert_eq!(steps, vec![(50, 7), (51, 8), (52, 10), (53, 11)]);
    }

    #[test]
    fn test_advance_to_next_matching_on_reverse_read() {
        let segment = segment_for_test("r1", 50, "2S3M4S", true);
        let mut walker = AlignedSegmentWalker::new(&segment);
        walker.initialize();
        let targets = CigarKindSet::from_kinds(&[CigarKind::Match]);
        let (coordinate, _) = walker.advance_to_next_matching(&targets).unwrap().unwrap();
        assert_eq!(coordinate.ref_index, 52);
        assert_eq!(coordinate.read_true_index, 4);
    }

    #[test]
    fn test_advance_before_initialize_err() {
        let segment = segment_for_test("lonely", 0, "3M", false);
        let mut walker = AlignedSegmentWalker::new(&segment);
        let err = walker.advance_one_unit().unwrap_err();
        assert!(err.contains("before initialize"));
        assert!(err.contains("lonely"));
    }

    #[test]
    fn test_advance_past_exhaustion_err() {
        let segment = segment_for_test("r1", 0, "1M", false);
        let mut walker = AlignedSegmentWalker::new(&segment);
        walker.initialize();
        assert!(walker.advance_one_unit().unwrap().is_some());
        assert!(walker.advance_one_unit().unwrap().is_none());
        assert!(walker.advance_one_unit().is_err());
    }

    #[test]
    fn test_empty_cigar_is_exhausted_immediately() {
        let segment = segment_for_test("r1", 0, "", true);
        let mut walker = AlignedSegmentWalker::new(&segment);
        walker.initialize();
        assert!(walker.advance_one_unit().unwrap().is_none());
    }

    #[test]
    fn test_insert_offset_follows_walk_order() {
        for reversal in [false, true] {
            let segment = segment_for_test("r1", 0, "2M3I2M", reversal);
            let mut walker = AlignedSegmentWalker::new(&segment);
            walker.initialize();
            let mut offsets = Vec::new();
            while let Some((coordinate, op)) = walker.advance_one_unit().unwrap() {
                if op.kind == CigarKind::Insert {
                    offsets.push((walker.insert_offset(), coordinate.read_true_index));
                }
            }
            assert_eq!(offsets, vec![(0, 2), (1, 3), (2, 4)]);
        }
    }

    #[test]
    fn test_strand_symmetry_on_random_alignments() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let cigar = random_cigar(&mut rng);
            let ref_start = rng.random_range(0..1000);
            let forward = segment_for_test("r", ref_start, &cigar, false);
            let reverse = segment_for_test("r", ref_start, &cigar, true);
            let read_length = forward.read_length;

            let pairs = |segment: &AlignedSegment| {
                let steps = walk_all(segment);
                let true_indexes: Vec<i64> = steps
                    .iter()
                    .filter(|(_, op)| op.consumes_true_read())
                    .map(|(c, _)| c.read_true_index)
                    .collect();
                assert!(true_indexes.windows(2).all(|w| w[0] < w[1]), "{}", cigar);
                steps
                    .iter()
                    .filter(|(_, op)| op.consumes_ref() && op.consumes_true_read())
                    .map(|(c, _)| (c.read_true_index, c.ref_index))
                    .collect::<Vec<(i64, i64)>>()
            };

            let mut forward_pairs = pairs(&forward);
            // The reverse walk starts at the other end of the same read
            let mut reverse_pairs: Vec<(i64, i64)> = pairs(&reverse)
                .into_iter()
                .map(|(t, r)| (read_length - 1 - t, r))
                .collect();
            forward_pairs.sort_unstable();
            reverse_pairs.sort_unstable();
            assert_eq!(forward_pairs, reverse_pairs, "{}", cigar);
        }
    }

    #[test]
    fn test_cursor_conservation_on_random_alignments() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let cigar = random_cigar(&mut rng);
            let reversal = rng.random_bool(0.5);
            let segment = segment_for_test("r", rng.random_range(0..1000), &cigar, reversal);
            let steps = walk_all(&segment);

            let ref_steps = steps.iter().filter(|(_, op)| op.consumes_ref()).count() as i64;
            assert_eq!(
                ref_steps,
                segment.infer_reference_stop() - segment.ref_start + 1
            );
            let true_steps = steps
                .iter()
                .filter(|(_, op)| op.consumes_true_read())
                .count() as i64;
            assert_eq!(true_steps, segment.read_length);

            let true_indexes: Vec<i64> = steps
                .iter()
                .filter(|(_, op)| op.consumes_true_read())
                .map(|(c, _)| c.read_true_index)
                .collect();
            assert_eq!(true_indexes, (0..segment.read_length).collect::<Vec<i64>>());
        }
    }
}
