pub mod cigar;
pub mod segment;
pub mod source;
pub mod walker;

pub use cigar::{parse_cigar_string, CigarKind, CigarKindSet, CigarOp};
pub use segment::{AlignedSegment, Coordinate, ReadSequence};
pub use source::{AlignmentSource, BamAlignmentSource, MemoryAlignmentSource};
pub use walker::AlignedSegmentWalker;
