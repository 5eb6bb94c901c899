//! Per-alignment facts decoded once from an alignment record.

use super::cigar::CigarOp;
use crate::utils::Result;
use rust_htslib::bam::{self, record::Seq};
use std::fmt;

/// 4-bit BAM nucleotide codes.
const PACKED_BASES: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

/// Position of one walk step along the reference and the read.
///
/// The three cursors advance together at different rates depending on the
/// operation being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coordinate {
    pub ref_index: i64,
    pub read_index: i64,
    pub read_true_index: i64,
}

/// Read sequence as stored in the alignment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSequence {
    /// BAM nibble packing, two bases per byte, high nibble first.
    Packed { bytes: Vec<u8>, len: usize },
    Text(Vec<u8>),
}

impl ReadSequence {
    pub fn from_seq(seq: &Seq) -> Self {
        ReadSequence::Packed {
            bytes: seq.encoded.to_vec(),
            len: seq.len(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadSequence::Packed { len, .. } => *len,
            ReadSequence::Text(bases) => bases.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn base(&self, index: usize) -> Option<u8> {
        if index >= self.len() {
            return None;
        }
        match self {
            ReadSequence::Packed { bytes, .. } => {
                let byte = bytes[index / 2];
                let code = if index % 2 == 0 { byte >> 4 } else { byte & 0x0f };
                Some(PACKED_BASES[code as usize])
            }
            ReadSequence::Text(bases) => Some(bases[index]),
        }
    }
}

/// Immutable facts about one alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
    /// 1-based leftmost reference position.
    pub ref_start: i64,
    pub ref_name: String,
    pub read_name: String,
    /// Length of the original read, including clipped bases.
    pub read_length: i64,
    pub reversal: bool,
    pub mapq: u8,
    pub cigar: Vec<CigarOp>,
    pub sequence: ReadSequence,
}

impl AlignedSegment {
    pub fn from_bam_record(record: &bam::Record, header: &bam::HeaderView) -> Result<Self> {
        let read_name = String::from_utf8_lossy(record.qname()).to_string();
        if record.tid() < 0 {
            return Err(format!("Read {} has no reference contig", read_name));
        }
        let ref_name = String::from_utf8_lossy(header.tid2name(record.tid() as u32)).to_string();
        let cigar: Vec<CigarOp> = record
            .cigar()
            .take()
            .0
            .iter()
            .map(CigarOp::from_htslib)
            .collect();
        let read_length = cigar.iter().map(|op| op.true_read_len()).sum();

        Ok(AlignedSegment {
            ref_start: record.pos() + 1,
            ref_name,
            read_name,
            read_length,
            reversal: record.is_reverse(),
            mapq: record.mapq(),
            cigar,
            sequence: ReadSequence::from_seq(&record.seq()),
        })
    }

    /// Last reference position consumed by the alignment, on the same 1-based scale as `ref_start`.
    pub fn infer_reference_stop(&self) -> i64 {
        let ref_len: i64 = self
            .cigar
            .iter()
            .filter(|op| !op.kind.is_clip())
            .map(|op| op.ref_len())
            .sum();
        self.ref_start + ref_len - 1
    }
}

impl fmt::Display for AlignedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.ref_name,
            self.ref_start,
            if self.reversal { "R" } else { "F" },
            self.read_length,
            self.read_name,
            self.cigar.len()
        )
    }
}

#[cfg(test)]
pub(crate) fn segment_for_test(
    read_name: &str,
    ref_start_0: i64,
    cigar: &str,
    reversal: bool,
) -> AlignedSegment {
    let cigar = super::cigar::parse_cigar_string(cigar).unwrap();
    let read_length = cigar.iter().map(|op| op.true_read_len()).sum();
    AlignedSegment {
        ref_start: ref_start_0 + 1,
        ref_name: "chr1".to_string(),
        read_name: read_name.to_string(),
        read_length,
        reversal,
        mapq: 60,
        cigar,
        sequence: ReadSequence::Text(Vec::new()),
    }
}
