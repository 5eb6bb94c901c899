use crate::utils::Result;
use rust_htslib::bam::record::Cigar as HtsCigar;
use std::fmt;

/// Alignment operation kinds, in BAM code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CigarKind {
    Match,
    Insert,
    Delete,
    RefSkip,
    SoftClip,
    HardClip,
    Pad,
    Equal,
    Diff,
}

const CIGAR_KINDS: [CigarKind; 9] = [
    CigarKind::Match,
    CigarKind::Insert,
    CigarKind::Delete,
    CigarKind::RefSkip,
    CigarKind::SoftClip,
    CigarKind::HardClip,
    CigarKind::Pad,
    CigarKind::Equal,
    CigarKind::Diff,
];

//                                          M     I      D      N      S      H      P      =     X
const CIGAR_SYMBOLS: [char; 9] = ['M', 'I', 'D', 'N', 'S', 'H', 'P', '=', 'X'];
const CONSUMES_REF: [bool; 9] = [true, false, true, true, false, false, false, true, true];
const CONSUMES_READ: [bool; 9] = [true, true, false, false, false, false, false, true, true];
const CONSUMES_TRUE_READ: [bool; 9] = [true, true, false, false, true, true, false, true, true];

impl CigarKind {
    pub fn code(self) -> usize {
        self as usize
    }

    pub fn from_code(code: usize) -> Option<Self> {
        CIGAR_KINDS.get(code).copied()
    }

    pub fn symbol(self) -> char {
        CIGAR_SYMBOLS[self.code()]
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        CIGAR_SYMBOLS
            .iter()
            .position(|&s| s == symbol)
            .and_then(Self::from_code)
    }

    /// Whether the operation advances along the reference.
    pub fn consumes_ref(self) -> bool {
        CONSUMES_REF[self.code()]
    }

    /// Whether the operation advances along the aligned (soft-clip free) portion of the read.
    pub fn consumes_read(self) -> bool {
        CONSUMES_READ[self.code()]
    }

    /// Whether the operation advances along the original, unclipped read.
    pub fn consumes_true_read(self) -> bool {
        CONSUMES_TRUE_READ[self.code()]
    }

    pub fn is_clip(self) -> bool {
        matches!(self, CigarKind::SoftClip | CigarKind::HardClip)
    }
}

/// A small set of operation kinds, used to restrict a walk to the operations of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CigarKindSet(u16);

impl CigarKindSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_kinds(kinds: &[CigarKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, &kind| set.with(kind))
    }

    pub fn all() -> Self {
        Self::from_kinds(&CIGAR_KINDS)
    }

    pub fn with(self, kind: CigarKind) -> Self {
        Self(self.0 | (1 << kind.code()))
    }

    pub fn contains(&self, kind: CigarKind) -> bool {
        self.0 & (1 << kind.code()) != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub length: u64,
}

impl CigarOp {
    pub fn new(kind: CigarKind, length: u64) -> Self {
        Self { kind, length }
    }

    pub fn from_htslib(op: &HtsCigar) -> Self {
        let (kind, len) = match *op {
            HtsCigar::Match(len) => (CigarKind::Match, len),
            HtsCigar::Ins(len) => (CigarKind::Insert, len),
            HtsCigar::Del(len) => (CigarKind::Delete, len),
            HtsCigar::RefSkip(len) => (CigarKind::RefSkip, len),
            HtsCigar::SoftClip(len) => (CigarKind::SoftClip, len),
            HtsCigar::HardClip(len) => (CigarKind::HardClip, len),
            HtsCigar::Pad(len) => (CigarKind::Pad, len),
            HtsCigar::Equal(len) => (CigarKind::Equal, len),
            HtsCigar::Diff(len) => (CigarKind::Diff, len),
        };
        Self::new(kind, len as u64)
    }

    pub fn consumes_ref(&self) -> bool {
        self.kind.consumes_ref()
    }

    pub fn consumes_read(&self) -> bool {
        self.kind.consumes_read()
    }

    pub fn consumes_true_read(&self) -> bool {
        self.kind.consumes_true_read()
    }

    pub fn ref_len(&self) -> i64 {
        if self.consumes_ref() {
            self.length as i64
        } else {
            0
        }
    }

    pub fn true_read_len(&self) -> i64 {
        if self.consumes_true_read() {
            self.length as i64
        } else {
            0
        }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.kind.symbol(), self.length)
    }
}

/// Parses a SAM-style CIGAR string such as `5S10M2I3M`.
pub fn parse_cigar_string(encoding: &str) -> Result<Vec<CigarOp>> {
    let mut ops = Vec::new();
    let mut length: u64 = 0;
    let mut has_digits = false;

    for symbol in encoding.chars() {
        if let Some(digit) = symbol.to_digit(10) {
            length = length
                .checked_mul(10)
                .and_then(|l| l.checked_add(digit as u64))
                .ok_or_else(|| format!("CIGAR operation length overflows: {}", encoding))?;
            has_digits = true;
            continue;
        }

        let kind = CigarKind::from_symbol(symbol)
            .ok_or_else(|| format!("Unknown CIGAR operation '{}' in {}", symbol, encoding))?;
        if !has_digits {
            return Err(format!(
                "CIGAR operation '{}' has no length in {}",
                symbol, encoding
            ));
        }
        ops.push(CigarOp::new(kind, length));
        length = 0;
        has_digits = false;
    }

    if has_digits {
        return Err(format!("Trailing length without operation in {}", encoding));
    }

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumption_flags() {
        let m = CigarKind::Match;
        assert!(m.consumes_ref() && m.consumes_read() && m.consumes_true_read());

        let s = CigarKind::SoftClip;
        assert!(!s.consumes_ref() && !s.consumes_read() && s.consumes_true_read());

        let h = CigarKind::HardClip;
        assert!(!h.consumes_ref() && !h.consumes_read() && h.consumes_true_read());

        let d = CigarKind::Delete;
        assert!(d.consumes_ref() && !d.consumes_read() && !d.consumes_true_read());

        let i = CigarKind::Insert;
        assert!(!i.consumes_ref() && i.consumes_read() && i.consumes_true_read());

        let p = CigarKind::Pad;
        assert!(!p.consumes_ref() && !p.consumes_read() && !p.consumes_true_read());
    }

    #[test]
    fn test_codes_round_trip_through_tables() {
        for code in 0..9 {
            let kind = CigarKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
            assert_eq!(CigarKind::from_symbol(kind.symbol()), Some(kind));
        }
        assert_eq!(CigarKind::from_code(9), None);
    }

    #[test]
    fn test_kind_set_membership() {
        let set = CigarKindSet::from_kinds(&[CigarKind::Equal, CigarKind::Diff]);
        assert!(set.contains(CigarKind::Equal));
        assert!(set.contains(CigarKind::Diff));
        assert!(!set.contains(CigarKind::Match));
        assert!(!CigarKindSet::empty().contains(CigarKind::Match));
        assert!(CigarKindSet::all().contains(CigarKind::Pad));
    }

    #[test]
    fn test_from_htslib() {
        assert_eq!(
            CigarOp::from_htslib(&HtsCigar::Ins(5)),
            CigarOp::new(CigarKind::Insert, 5)
        );
        assert_eq!(
            CigarOp::from_htslib(&HtsCigar::Diff(2)),
            CigarOp::new(CigarKind::Diff, 2)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CigarOp::new(CigarKind::Equal, 12).to_string(), "(=,12)");
    }

    #[test]
    fn test_parse_cigar_string() {
        let ops = parse_cigar_string("5S10M2I3D1=4X3H").unwrap();
        assert_eq!(
            ops,
            vec![
                CigarOp::new(CigarKind::SoftClip, 5),
                CigarOp::new(CigarKind::Match, 10),
                CigarOp::new(CigarKind::Insert, 2),
                CigarOp::new(CigarKind::Delete, 3),
                CigarOp::new(CigarKind::Equal, 1),
                CigarOp::new(CigarKind::Diff, 4),
                CigarOp::new(CigarKind::HardClip, 3),
            ]
        );
        assert_eq!(ops.iter().map(|op| op.ref_len()).sum::<i64>(), 18);
        assert_eq!(ops.iter().map(|op| op.true_read_len()).sum::<i64>(), 25);
    }

    #[test]
    fn test_parse_invalid_cigar_string() {
        assert!(parse_cigar_string("5Q").is_err());
        assert!(parse_cigar_string("M").is_err());
        assert!(parse_cigar_string("5M3").is_err());
    }
}
